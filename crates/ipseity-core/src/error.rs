//! Error type shared by the ipseity crates.

use thiserror::Error;

/// Result alias used across the workspace.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors surfaced to callers.
///
/// Integrity mismatches are not errors: a stale fingerprint or checksum is
/// reported as a boolean or a probe score, and the caller decides whether
/// tampering is fatal.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// A document or snapshot failed shape validation.
    #[error("schema violation in `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("toml encoding error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IdentityError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        IdentityError::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_message_names_the_field() {
        let err = IdentityError::schema("behavioral_patterns[0].weight", "must be within [0, 1]");
        let msg = err.to_string();
        assert!(msg.contains("behavioral_patterns[0].weight"), "{}", msg);
        assert!(msg.contains("[0, 1]"), "{}", msg);
    }
}
