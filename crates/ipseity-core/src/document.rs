//! Identity document: declared values, behavioral patterns, ethical
//! commitments, knowledge domains and communication style of one agent.
//!
//! ## Lifecycle
//!
//! Documents are built once through [`IdentityDocumentBuilder`], which validates
//! the shape and seals the canonical fingerprint. After that they are treated as
//! immutable values: [`IdentityDocument::bump_version`] and
//! [`IdentityDocument::merge`] return *new* documents with an incremented
//! version and a recomputed fingerprint, leaving the original untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IdentityError, IdentityResult};
use crate::integrity;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// How binding an ethical commitment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Absoluteness {
    /// Never traded off.
    Absolute,
    Strong,
    Contextual,
}

impl fmt::Display for Absoluteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Absoluteness::Absolute => write!(f, "absolute"),
            Absoluteness::Strong => write!(f, "strong"),
            Absoluteness::Contextual => write!(f, "contextual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Novice,
    Intermediate,
    Advanced,
    Expert,
}

/// Preferred response length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Concise,
    #[default]
    Balanced,
    Detailed,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Concise => write!(f, "concise"),
            Verbosity::Balanced => write!(f, "balanced"),
            Verbosity::Detailed => write!(f, "detailed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A recurring behavior with a trigger and a characteristic response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralPattern {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub trigger: Option<String>,
    pub response: String,
    /// Importance in `[0, 1]`.
    pub weight: f64,
}

impl BehavioralPattern {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        response: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            trigger: None,
            response: response.into(),
            weight,
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalCommitment {
    pub principle: String,
    pub description: String,
    pub absoluteness: Absoluteness,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl EthicalCommitment {
    pub fn new(
        principle: impl Into<String>,
        description: impl Into<String>,
        absoluteness: Absoluteness,
    ) -> Self {
        Self {
            principle: principle.into(),
            description: description.into(),
            absoluteness,
            examples: Vec::new(),
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.absoluteness, Absoluteness::Absolute)
    }

    /// Sample-map slug: lower-cased, non-alphanumeric runs collapsed to `-`.
    pub fn slug(&self) -> String {
        slugify(&self.principle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDomain {
    pub domain: String,
    pub proficiency: Proficiency,
    #[serde(default)]
    pub subdomains: BTreeSet<String>,
}

impl KnowledgeDomain {
    pub fn new(domain: impl Into<String>, proficiency: Proficiency) -> Self {
        Self {
            domain: domain.into(),
            proficiency,
            subdomains: BTreeSet::new(),
        }
    }

    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomains.insert(subdomain.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub tone: String,
    pub verbosity: Verbosity,
    pub uses_humor: bool,
    pub uses_emoji: bool,
    #[serde(default)]
    pub preferred_formats: BTreeSet<String>,
    /// Phrases the agent avoids; matched case-insensitively by the style probe.
    #[serde(default)]
    pub avoided_patterns: BTreeSet<String>,
}

impl Default for CommunicationStyle {
    fn default() -> Self {
        Self {
            tone: "neutral".to_string(),
            verbosity: Verbosity::Balanced,
            uses_humor: false,
            uses_emoji: false,
            preferred_formats: BTreeSet::new(),
            avoided_patterns: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity Document
// ---------------------------------------------------------------------------

/// The structured identity record of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDocument {
    /// Opaque identifier, stable for the lifetime of the document.
    pub id: String,
    pub name: String,
    /// Monotonically increasing, starts at 1.
    pub version: u64,
    /// Provenance labels (originating model, migration hops, ...).
    #[serde(default)]
    pub origin_tags: Vec<String>,
    /// Value name -> description. Sorted so the canonical form is stable.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub behavioral_patterns: Vec<BehavioralPattern>,
    #[serde(default)]
    pub ethical_commitments: Vec<EthicalCommitment>,
    #[serde(default)]
    pub knowledge_domains: Vec<KnowledgeDomain>,
    #[serde(default)]
    pub communication_style: CommunicationStyle,
    /// SHA-256 over the canonical fields, 64 lowercase hex chars.
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityDocument {
    pub fn builder(name: impl Into<String>) -> IdentityDocumentBuilder {
        IdentityDocumentBuilder::new(name)
    }

    /// Reject documents whose shape cannot be analyzed.
    pub fn validate(&self) -> IdentityResult<()> {
        if self.id.trim().is_empty() {
            return Err(IdentityError::schema("id", "must not be empty"));
        }
        if self.version == 0 {
            return Err(IdentityError::schema("version", "must be at least 1"));
        }

        let mut seen = HashSet::new();
        for (i, p) in self.behavioral_patterns.iter().enumerate() {
            if p.id.trim().is_empty() {
                return Err(IdentityError::schema(
                    format!("behavioral_patterns[{}].id", i),
                    "must not be empty",
                ));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(IdentityError::schema(
                    format!("behavioral_patterns[{}].id", i),
                    format!("duplicate pattern id '{}'", p.id),
                ));
            }
            check_unit(&format!("behavioral_patterns[{}].weight", i), p.weight)?;
        }

        for (i, c) in self.ethical_commitments.iter().enumerate() {
            if c.principle.trim().is_empty() {
                return Err(IdentityError::schema(
                    format!("ethical_commitments[{}].principle", i),
                    "must not be empty",
                ));
            }
        }

        for (i, d) in self.knowledge_domains.iter().enumerate() {
            if d.domain.trim().is_empty() {
                return Err(IdentityError::schema(
                    format!("knowledge_domains[{}].domain", i),
                    "must not be empty",
                ));
            }
        }

        if let Some(fp) = &self.fingerprint {
            check_digest("fingerprint", fp)?;
        }
        Ok(())
    }

    /// Copy with the fingerprint recomputed over the current canonical fields.
    pub fn sealed(&self) -> IdentityResult<Self> {
        let mut doc = self.clone();
        doc.fingerprint = Some(integrity::compute_fingerprint(&doc)?);
        Ok(doc)
    }

    /// `true` when the stored fingerprint matches the canonical fields.
    pub fn verify_fingerprint(&self) -> bool {
        integrity::verify_fingerprint(self)
    }

    /// New document with version + 1, fresh `updated_at` and fingerprint.
    pub fn bump_version(&self) -> IdentityResult<Self> {
        let mut next = self.clone();
        next.version = self.version.saturating_add(1);
        next.updated_at = Utc::now();
        let next = next.sealed()?;
        debug!(
            target: "ipseity::integrity",
            id = %next.id,
            version = next.version,
            "Document version bumped"
        );
        Ok(next)
    }

    /// New bumped document with `delta` applied on top of this one.
    pub fn merge(&self, delta: IdentityDelta) -> IdentityResult<Self> {
        let mut next = self.clone();

        for key in &delta.remove_values {
            next.values.remove(key);
        }
        next.values.extend(delta.values);

        for pattern in delta.behavioral_patterns {
            match next
                .behavioral_patterns
                .iter()
                .position(|p| p.id == pattern.id)
            {
                Some(i) => next.behavioral_patterns[i] = pattern,
                None => next.behavioral_patterns.push(pattern),
            }
        }

        for commitment in delta.ethical_commitments {
            match next
                .ethical_commitments
                .iter()
                .position(|c| c.principle.eq_ignore_ascii_case(&commitment.principle))
            {
                Some(i) => next.ethical_commitments[i] = commitment,
                None => next.ethical_commitments.push(commitment),
            }
        }

        for domain in delta.knowledge_domains {
            match next
                .knowledge_domains
                .iter()
                .position(|d| d.domain.eq_ignore_ascii_case(&domain.domain))
            {
                Some(i) => next.knowledge_domains[i] = domain,
                None => next.knowledge_domains.push(domain),
            }
        }

        if let Some(style) = delta.communication_style {
            next.communication_style = style;
        }
        next.origin_tags.extend(delta.origin_tags);

        next.validate()?;
        next.bump_version()
    }

    /// Commitments tagged [`Absoluteness::Absolute`].
    pub fn absolute_commitments(&self) -> impl Iterator<Item = &EthicalCommitment> {
        self.ethical_commitments.iter().filter(|c| c.is_absolute())
    }
}

/// Changes applied by [`IdentityDocument::merge`].
///
/// Patterns are matched by id; commitments and domains by case-insensitive name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityDelta {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub remove_values: Vec<String>,
    #[serde(default)]
    pub behavioral_patterns: Vec<BehavioralPattern>,
    #[serde(default)]
    pub ethical_commitments: Vec<EthicalCommitment>,
    #[serde(default)]
    pub knowledge_domains: Vec<KnowledgeDomain>,
    #[serde(default)]
    pub communication_style: Option<CommunicationStyle>,
    #[serde(default)]
    pub origin_tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder with defaulting: missing id becomes a UUID v4, version 1,
/// both timestamps "now", default communication style.
#[derive(Debug, Clone)]
pub struct IdentityDocumentBuilder {
    id: Option<String>,
    name: String,
    version: u64,
    origin_tags: Vec<String>,
    values: BTreeMap<String, String>,
    behavioral_patterns: Vec<BehavioralPattern>,
    ethical_commitments: Vec<EthicalCommitment>,
    knowledge_domains: Vec<KnowledgeDomain>,
    communication_style: CommunicationStyle,
    created_at: Option<DateTime<Utc>>,
}

impl IdentityDocumentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            version: 1,
            origin_tags: Vec::new(),
            values: BTreeMap::new(),
            behavioral_patterns: Vec::new(),
            ethical_commitments: Vec::new(),
            knowledge_domains: Vec::new(),
            communication_style: CommunicationStyle::default(),
            created_at: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn origin(mut self, tag: impl Into<String>) -> Self {
        self.origin_tags.push(tag.into());
        self
    }

    pub fn value(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.values.insert(key.into(), description.into());
        self
    }

    pub fn pattern(mut self, pattern: BehavioralPattern) -> Self {
        self.behavioral_patterns.push(pattern);
        self
    }

    pub fn commitment(mut self, commitment: EthicalCommitment) -> Self {
        self.ethical_commitments.push(commitment);
        self
    }

    pub fn domain(mut self, domain: KnowledgeDomain) -> Self {
        self.knowledge_domains.push(domain);
        self
    }

    pub fn style(mut self, style: CommunicationStyle) -> Self {
        self.communication_style = style;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Validate and seal the fingerprint.
    pub fn build(self) -> IdentityResult<IdentityDocument> {
        let now = Utc::now();
        let created_at = self.created_at.unwrap_or(now);
        let doc = IdentityDocument {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            version: self.version,
            origin_tags: self.origin_tags,
            values: self.values,
            behavioral_patterns: self.behavioral_patterns,
            ethical_commitments: self.ethical_commitments,
            knowledge_domains: self.knowledge_domains,
            communication_style: self.communication_style,
            fingerprint: None,
            created_at,
            updated_at: created_at.max(now),
        };
        doc.validate()?;
        doc.sealed()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn check_unit(field: &str, value: f64) -> IdentityResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(IdentityError::schema(
            field,
            format!("must be within [0, 1], got {}", value),
        ))
    }
}

pub(crate) fn check_digest(field: &str, digest: &str) -> IdentityResult<()> {
    let well_formed = digest.len() == 64
        && digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if well_formed {
        Ok(())
    } else {
        Err(IdentityError::schema(
            field,
            "must be 64 lowercase hex characters",
        ))
    }
}

/// Lower-case, non-alphanumeric runs collapsed to a single `-`, trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IdentityDocument {
        IdentityDocument::builder("Mira")
            .id("mira-001")
            .origin("anthropic/claude")
            .value("honesty", "radical transparency")
            .value("curiosity", "always asks one more question")
            .pattern(BehavioralPattern::new(
                "clarify",
                "Clarify ambiguity",
                "Asks a clarifying question when a request is ambiguous",
                "What do you mean by X?",
                0.8,
            ))
            .commitment(EthicalCommitment::new(
                "Do no harm",
                "Refuse to help with harmful requests",
                Absoluteness::Absolute,
            ))
            .domain(KnowledgeDomain::new("Rust", Proficiency::Expert).with_subdomain("async"))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults_and_seals() {
        let doc = IdentityDocument::builder("Anon").build().unwrap();
        assert!(!doc.id.is_empty());
        assert_eq!(doc.version, 1);
        assert_eq!(doc.communication_style, CommunicationStyle::default());
        assert!(doc.verify_fingerprint());
    }

    #[test]
    fn builder_rejects_out_of_range_weight() {
        let err = IdentityDocument::builder("Bad")
            .pattern(BehavioralPattern::new("p", "n", "d", "r", 1.5))
            .build()
            .unwrap_err();
        assert!(matches!(err, IdentityError::SchemaViolation { .. }));
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn validate_rejects_duplicate_pattern_ids() {
        let err = IdentityDocument::builder("Dup")
            .pattern(BehavioralPattern::new("p", "a", "d", "r", 0.5))
            .pattern(BehavioralPattern::new("p", "b", "d", "r", 0.5))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_zero_version_and_empty_id() {
        let mut doc = sample();
        doc.version = 0;
        assert!(doc.validate().is_err());

        let mut doc = sample();
        doc.id = "  ".to_string();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_fingerprint() {
        let mut doc = sample();
        doc.fingerprint = Some("ABC".to_string());
        assert!(doc.validate().is_err());
        doc.fingerprint = Some("A".repeat(64));
        assert!(doc.validate().is_err());
    }

    #[test]
    fn bump_returns_new_document_and_leaves_original() {
        let doc = sample();
        let bumped = doc.bump_version().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(bumped.version, 2);
        assert_ne!(doc.fingerprint, bumped.fingerprint);
        assert!(doc.verify_fingerprint());
        assert!(bumped.verify_fingerprint());
    }

    #[test]
    fn merge_upserts_by_identity_keys() {
        let doc = sample();
        let delta = IdentityDelta {
            values: BTreeMap::from([("patience".to_string(), "wait for the full question".to_string())]),
            remove_values: vec!["curiosity".to_string()],
            behavioral_patterns: vec![BehavioralPattern::new(
                "clarify",
                "Clarify ambiguity",
                "Asks a clarifying question",
                "Could you say more?",
                0.9,
            )],
            ethical_commitments: vec![EthicalCommitment::new(
                "DO NO HARM",
                "Updated description",
                Absoluteness::Absolute,
            )],
            knowledge_domains: vec![KnowledgeDomain::new("Go", Proficiency::Novice)],
            ..Default::default()
        };

        let merged = doc.merge(delta).unwrap();
        assert_eq!(merged.version, 2);
        assert!(merged.values.contains_key("patience"));
        assert!(!merged.values.contains_key("curiosity"));
        assert_eq!(merged.behavioral_patterns.len(), 1);
        assert_eq!(merged.behavioral_patterns[0].response, "Could you say more?");
        assert_eq!(merged.ethical_commitments.len(), 1);
        assert_eq!(merged.ethical_commitments[0].description, "Updated description");
        assert_eq!(merged.knowledge_domains.len(), 2);
        assert!(merged.verify_fingerprint());
        // original untouched
        assert!(doc.values.contains_key("curiosity"));
        assert_eq!(doc.behavioral_patterns[0].response, "What do you mean by X?");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Do no harm"), "do-no-harm");
        assert_eq!(slugify("  Respect -- Autonomy! "), "respect-autonomy");
        assert_eq!(slugify("Privacy"), "privacy");
    }

    #[test]
    fn serde_uses_snake_case_tiers() {
        let json = serde_json::to_string(&Absoluteness::Absolute).unwrap();
        assert_eq!(json, "\"absolute\"");
        let v: Verbosity = serde_json::from_str("\"detailed\"").unwrap();
        assert_eq!(v, Verbosity::Detailed);
    }
}
