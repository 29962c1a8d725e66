//! Continuity verification: is a restored or migrated document still the
//! same identity as its baseline?
//!
//! Structural checks compare the two documents directly; every registered
//! probe then scores the restored copy. The confidence is a weighted mean of
//! all dimension scores:
//!
//! | Dimension | Weight |
//! |-----------|--------|
//! | structural | 2.0 |
//! | fingerprint | 1.5 |
//! | values | 1.5 |
//! | ethical_commitments | 2.0 |
//! | behavioral_patterns | 1.0 |
//! | communication_style | 0.5 |
//! | any custom dimension | 1.0 |

use std::collections::{BTreeMap, BTreeSet};

use ipseity_core::similarity::clamp_unit;
use ipseity_core::{ContinuityConfig, IdentityDocument, IdentityResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::probe::{ProbeRegistry, SampleMap, STRUCTURAL_DIMENSION};

const ID_MISMATCH_PENALTY: f64 = 0.5;
const VERSION_REGRESSION_PENALTY: f64 = 0.2;
const MISSING_VALUES_PENALTY: f64 = 0.3;
const LOST_COMMITMENTS_PENALTY: f64 = 0.2;

pub fn dimension_weight(dimension: &str) -> f64 {
    match dimension {
        STRUCTURAL_DIMENSION => 2.0,
        "fingerprint" => 1.5,
        "values" => 1.5,
        "ethical_commitments" => 2.0,
        "behavioral_patterns" => 1.0,
        "communication_style" => 0.5,
        _ => 1.0,
    }
}

/// Outcome of one continuity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Baseline identifier.
    pub document_id: String,
    pub is_consistent: bool,
    pub confidence_score: f64,
    /// `structural` first, then registered probes in name order.
    pub tested_dimensions: Vec<String>,
    /// Dimensions scoring below the consistency threshold.
    pub failed_dimensions: Vec<String>,
    pub scores: BTreeMap<String, f64>,
    pub notes: Vec<String>,
}

impl VerificationResult {
    pub fn score(&self, dimension: &str) -> Option<f64> {
        self.scores.get(dimension).copied()
    }

    pub fn failed(&self, dimension: &str) -> bool {
        self.failed_dimensions.iter().any(|d| d == dimension)
    }
}

/// Direct baseline/restored comparison, starting from 1.0 and floored at 0.
fn structural_checks(baseline: &IdentityDocument, restored: &IdentityDocument) -> (f64, Vec<String>) {
    let mut score = 1.0;
    let mut notes = Vec::new();

    if baseline.id != restored.id {
        score -= ID_MISMATCH_PENALTY;
        notes.push(format!(
            "identifier mismatch: baseline '{}', restored '{}'",
            baseline.id, restored.id
        ));
    }

    if restored.version < baseline.version {
        score -= VERSION_REGRESSION_PENALTY;
        notes.push(format!(
            "version regressed from {} to {}",
            baseline.version, restored.version
        ));
    }

    if !baseline.values.is_empty() {
        let restored_keys: BTreeSet<&String> = restored.values.keys().collect();
        let missing: Vec<&str> = baseline
            .values
            .keys()
            .filter(|k| !restored_keys.contains(k))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            let fraction = missing.len() as f64 / baseline.values.len() as f64;
            score -= MISSING_VALUES_PENALTY * fraction;
            notes.push(format!("missing values: {}", missing.join(", ")));
        }
    }

    if restored.ethical_commitments.len() < baseline.ethical_commitments.len() {
        score -= LOST_COMMITMENTS_PENALTY;
        notes.push(format!(
            "ethical commitments dropped from {} to {}",
            baseline.ethical_commitments.len(),
            restored.ethical_commitments.len()
        ));
    }

    (clamp_unit(score), notes)
}

/// Runs structural checks and every registered probe.
#[derive(Debug, Default)]
pub struct ContinuityVerifier {
    config: ContinuityConfig,
    registry: ProbeRegistry,
}

impl ContinuityVerifier {
    pub fn new(config: ContinuityConfig, registry: ProbeRegistry) -> IdentityResult<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ContinuityConfig {
        &self.config
    }

    pub fn verify(
        &self,
        baseline: &IdentityDocument,
        restored: &IdentityDocument,
        samples: Option<&SampleMap>,
    ) -> IdentityResult<VerificationResult> {
        baseline.validate()?;
        restored.validate()?;

        let threshold = self.config.consistency_threshold;
        let (structural, notes) = structural_checks(baseline, restored);

        let mut tested = vec![STRUCTURAL_DIMENSION.to_string()];
        let mut scores = BTreeMap::from([(STRUCTURAL_DIMENSION.to_string(), structural)]);

        for (dimension, probe) in self.registry.iter() {
            let score = clamp_unit(probe.score(restored, samples));
            debug!(target: "ipseity::continuity", dimension, score, "Dimension scored");
            tested.push(dimension.to_string());
            scores.insert(dimension.to_string(), score);
        }

        let (weighted, total) = scores.iter().fold((0.0, 0.0), |(sum, weight), (dim, score)| {
            let w = dimension_weight(dim);
            (sum + w * score, weight + w)
        });
        let confidence_score = if total > 0.0 { clamp_unit(weighted / total) } else { 0.0 };

        let failed: Vec<String> = tested
            .iter()
            .filter(|d| scores.get(d.as_str()).is_some_and(|s| *s < threshold))
            .cloned()
            .collect();
        let is_consistent = confidence_score >= threshold;

        if is_consistent {
            info!(
                target: "ipseity::continuity",
                id = %baseline.id,
                confidence = confidence_score,
                failed = failed.len(),
                "Continuity verified"
            );
        } else {
            warn!(
                target: "ipseity::continuity",
                id = %baseline.id,
                confidence = confidence_score,
                failed = ?failed,
                "Continuity check failed"
            );
        }

        Ok(VerificationResult {
            document_id: baseline.id.clone(),
            is_consistent,
            confidence_score,
            tested_dimensions: tested,
            failed_dimensions: failed,
            scores,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipseity_core::{Absoluteness, EthicalCommitment};

    fn doc() -> IdentityDocument {
        IdentityDocument::builder("Mira")
            .id("mira-001")
            .version(3)
            .value("honesty", "h")
            .value("curiosity", "c")
            .value("patience", "p")
            .value("warmth", "w")
            .commitment(EthicalCommitment::new("Do no harm", "d", Absoluteness::Absolute))
            .build()
            .unwrap()
    }

    #[test]
    fn structural_identical_is_clean() {
        let d = doc();
        let (score, notes) = structural_checks(&d, &d);
        assert_eq!(score, 1.0);
        assert!(notes.is_empty());
    }

    #[test]
    fn structural_penalties_accumulate_with_notes() {
        let d = doc();
        let mut restored = d.clone();
        restored.version = 2;
        restored.values.remove("warmth");
        restored.ethical_commitments.clear();

        let (score, notes) = structural_checks(&d, &restored);
        // 1.0 - 0.2 - 0.3 * 0.25 - 0.2
        assert!((score - 0.525).abs() < 1e-12);
        assert_eq!(notes.len(), 3);
        assert!(notes[1].contains("warmth"));
    }

    #[test]
    fn structural_score_floors_at_zero() {
        let d = doc();
        let mut restored = d.clone();
        restored.id = "other".into();
        restored.version = 1;
        restored.values.clear();
        restored.ethical_commitments.clear();
        let (score, notes) = structural_checks(&d, &restored);
        // 1.0 - 0.5 - 0.2 - 0.3 - 0.2 < 0
        assert_eq!(score, 0.0);
        assert_eq!(notes.len(), 4);
    }

    #[test]
    fn weights() {
        assert_eq!(dimension_weight("structural"), 2.0);
        assert_eq!(dimension_weight("communication_style"), 0.5);
        assert_eq!(dimension_weight("my_custom_probe"), 1.0);
    }

    #[test]
    fn empty_registry_uses_structural_only() {
        let verifier =
            ContinuityVerifier::new(ContinuityConfig::default(), ProbeRegistry::new()).unwrap();
        let d = doc();
        let result = verifier.verify(&d, &d, None).unwrap();
        assert_eq!(result.tested_dimensions, vec!["structural"]);
        assert_eq!(result.confidence_score, 1.0);
        assert!(result.is_consistent);
    }

    #[test]
    fn rejects_invalid_threshold() {
        let cfg = ContinuityConfig {
            consistency_threshold: 1.5,
        };
        assert!(ContinuityVerifier::new(cfg, ProbeRegistry::new()).is_err());
    }
}
