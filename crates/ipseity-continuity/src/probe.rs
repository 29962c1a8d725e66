//! Consistency probe trait and the registry that dispatches to it.
//!
//! A probe inspects one document (plus optional sample texts) and returns a
//! consistency score in `[0, 1]`. Probes are keyed by dimension name;
//! registering a second probe for the same dimension replaces the first.
//!
//! | Sample key | Consumed by |
//! |------------|-------------|
//! | `value:<key>` | values probe |
//! | `behavior:<pattern id>` | behavioral patterns probe |
//! | `ethics:<principle slug>` | ethical commitments probe |
//! | `style:sample` | communication style probe |

use std::collections::BTreeMap;
use std::fmt;

use ipseity_core::{IdentityDocument, IdentityError, IdentityResult};
use tracing::debug;

use crate::builtin;

/// Sample texts keyed as described in the module docs.
pub type SampleMap = BTreeMap<String, String>;

/// Dimension name owned by the verifier's structural checks.
pub const STRUCTURAL_DIMENSION: &str = "structural";

pub fn value_sample_key(key: &str) -> String {
    format!("value:{}", key)
}

pub fn behavior_sample_key(pattern_id: &str) -> String {
    format!("behavior:{}", pattern_id)
}

pub fn ethics_sample_key(slug: &str) -> String {
    format!("ethics:{}", slug)
}

pub const STYLE_SAMPLE_KEY: &str = "style:sample";

// ---------------------------------------------------------------------------
// Probe Trait
// ---------------------------------------------------------------------------

/// A pluggable consistency check for one identity dimension.
///
/// Scoring must be total: missing evidence maps to a documented default score,
/// never a panic. Out-of-range scores are clamped by the verifier.
pub trait BehavioralProbe: Send + Sync {
    /// Registry key and result dimension name (e.g. `"values"`).
    fn dimension(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64;
}

/// Wraps a closure as a [`BehavioralProbe`].
pub struct FnProbe<F> {
    dimension: String,
    func: F,
}

impl<F> FnProbe<F>
where
    F: Fn(&IdentityDocument, Option<&SampleMap>) -> f64 + Send + Sync,
{
    pub fn new(dimension: impl Into<String>, func: F) -> Self {
        Self {
            dimension: dimension.into(),
            func,
        }
    }
}

impl<F> BehavioralProbe for FnProbe<F>
where
    F: Fn(&IdentityDocument, Option<&SampleMap>) -> f64 + Send + Sync,
{
    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn description(&self) -> &str {
        "closure probe"
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64 {
        (self.func)(doc, samples)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Probes keyed by dimension name, iterated in name order.
pub struct ProbeRegistry {
    probes: BTreeMap<String, Box<dyn BehavioralProbe>>,
}

impl ProbeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the five built-in probes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for probe in builtin::all() {
            registry.insert(probe);
        }
        registry
    }

    /// Register a probe, replacing any probe already bound to its dimension.
    ///
    /// The `structural` dimension is reserved for the verifier.
    pub fn register(&mut self, probe: Box<dyn BehavioralProbe>) -> IdentityResult<()> {
        if probe.dimension() == STRUCTURAL_DIMENSION {
            return Err(IdentityError::InvalidConfig(format!(
                "probe dimension '{}' is reserved",
                STRUCTURAL_DIMENSION
            )));
        }
        if probe.dimension().trim().is_empty() {
            return Err(IdentityError::InvalidConfig(
                "probe dimension must not be empty".to_string(),
            ));
        }
        self.insert(probe);
        Ok(())
    }

    fn insert(&mut self, probe: Box<dyn BehavioralProbe>) {
        let dimension = probe.dimension().to_string();
        let description = probe.description().to_string();
        if self.probes.insert(dimension.clone(), probe).is_some() {
            debug!(
                target: "ipseity::probe",
                dimension = %dimension,
                description = %description,
                "Probe replaced"
            );
        } else {
            debug!(
                target: "ipseity::probe",
                dimension = %dimension,
                description = %description,
                "Probe registered"
            );
        }
    }

    /// Get a probe by dimension name.
    pub fn get(&self, dimension: &str) -> Option<&dyn BehavioralProbe> {
        self.probes.get(dimension).map(|b| b.as_ref())
    }

    /// `(dimension, description)` pairs, sorted by dimension.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.probes
            .iter()
            .map(|(k, v)| (k.clone(), v.description().to_string()))
            .collect()
    }

    /// All registered dimension names, sorted.
    pub fn dimensions(&self) -> Vec<String> {
        self.probes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn BehavioralProbe)> {
        self.probes.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("probes", &self.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(dimension: &str, score: f64) -> Box<dyn BehavioralProbe> {
        Box::new(FnProbe::new(dimension, move |_: &IdentityDocument, _: Option<&SampleMap>| score))
    }

    #[test]
    fn builtins_cover_the_five_dimensions() {
        let registry = ProbeRegistry::with_builtins();
        assert_eq!(
            registry.dimensions(),
            vec![
                "behavioral_patterns",
                "communication_style",
                "ethical_commitments",
                "fingerprint",
                "values"
            ]
        );
        assert!(registry.get("values").is_some());
        assert!(registry.get("structural").is_none());
    }

    #[test]
    fn register_replaces_same_dimension() {
        let mut registry = ProbeRegistry::new();
        registry.register(constant("tone_check", 0.1)).unwrap();
        registry.register(constant("tone_check", 0.9)).unwrap();
        assert_eq!(registry.len(), 1);

        let doc = IdentityDocument::builder("a").build().unwrap();
        let probe = registry.get("tone_check").unwrap();
        assert_eq!(probe.score(&doc, None), 0.9);
    }

    #[test]
    fn descriptions_show_in_listing_and_debug() {
        let mut registry = ProbeRegistry::with_builtins();
        registry.register(constant("tone_check", 1.0)).unwrap();
        let described = registry.describe();
        assert!(described.contains(&("tone_check".to_string(), "closure probe".to_string())));
        assert!(described
            .iter()
            .any(|(d, text)| d == "fingerprint" && text.contains("fingerprint")));

        let debug = format!("{:?}", registry);
        assert!(debug.contains("closure probe"), "{}", debug);
    }

    #[test]
    fn structural_and_empty_dimensions_are_rejected() {
        let mut registry = ProbeRegistry::new();
        assert!(registry.register(constant("structural", 1.0)).is_err());
        assert!(registry.register(constant("  ", 1.0)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn sample_keys() {
        assert_eq!(value_sample_key("honesty"), "value:honesty");
        assert_eq!(behavior_sample_key("clarify"), "behavior:clarify");
        assert_eq!(ethics_sample_key("do-no-harm"), "ethics:do-no-harm");
    }
}
