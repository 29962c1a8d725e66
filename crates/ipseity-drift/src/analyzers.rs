//! Field divergence analyzers, one per identity dimension.
//!
//! Each analyzer is a pure function `(baseline, current) -> divergence` in
//! `[0, 1]` built on the similarity primitives of `ipseity-core`.
//! [`analyze_dimension`] pairs that score with the raw before/after payloads
//! used for reporting.

use std::collections::BTreeSet;
use std::fmt;

use ipseity_core::similarity::{
    divergence, jaccard, lowercase_set, mean, set_similarity, string_similarity,
};
use ipseity_core::{IdentityDocument, IdentityResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Principle names at or below this similarity do not count as "retained".
pub const ABSOLUTE_RETENTION_SIMILARITY: f64 = 0.7;

const PRINCIPLE_SET_WEIGHT: f64 = 0.4;
const ABSOLUTE_RETENTION_WEIGHT: f64 = 0.6;

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// A tracked identity dimension and its fixed aggregation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityDimension {
    Values,
    EthicalCommitments,
    CommunicationStyle,
    BehavioralPatterns,
    KnowledgeDomains,
}

impl IdentityDimension {
    pub const ALL: [IdentityDimension; 5] = [
        IdentityDimension::Values,
        IdentityDimension::EthicalCommitments,
        IdentityDimension::CommunicationStyle,
        IdentityDimension::BehavioralPatterns,
        IdentityDimension::KnowledgeDomains,
    ];

    /// Weight in the overall drift score.
    pub fn weight(&self) -> f64 {
        match self {
            IdentityDimension::Values => 2.0,
            IdentityDimension::EthicalCommitments => 2.5,
            IdentityDimension::CommunicationStyle => 1.0,
            IdentityDimension::BehavioralPatterns => 1.5,
            IdentityDimension::KnowledgeDomains => 0.5,
        }
    }

    pub fn total_weight() -> f64 {
        Self::ALL.iter().map(|d| d.weight()).sum()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityDimension::Values => "values",
            IdentityDimension::EthicalCommitments => "ethical_commitments",
            IdentityDimension::CommunicationStyle => "communication_style",
            IdentityDimension::BehavioralPatterns => "behavioral_patterns",
            IdentityDimension::KnowledgeDomains => "knowledge_domains",
        }
    }

    pub fn divergence(&self, baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
        match self {
            IdentityDimension::Values => values_divergence(baseline, current),
            IdentityDimension::EthicalCommitments => ethics_divergence(baseline, current),
            IdentityDimension::CommunicationStyle => style_divergence(baseline, current),
            IdentityDimension::BehavioralPatterns => behavior_divergence(baseline, current),
            IdentityDimension::KnowledgeDomains => knowledge_divergence(baseline, current),
        }
    }

    /// Raw section payload for reports.
    pub fn payload(&self, doc: &IdentityDocument) -> IdentityResult<Value> {
        let value = match self {
            IdentityDimension::Values => serde_json::to_value(&doc.values)?,
            IdentityDimension::EthicalCommitments => serde_json::to_value(&doc.ethical_commitments)?,
            IdentityDimension::CommunicationStyle => serde_json::to_value(&doc.communication_style)?,
            IdentityDimension::BehavioralPatterns => serde_json::to_value(&doc.behavioral_patterns)?,
            IdentityDimension::KnowledgeDomains => serde_json::to_value(&doc.knowledge_domains)?,
        };
        Ok(value)
    }
}

impl fmt::Display for IdentityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Divergence of one dimension with its raw before/after values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDivergence {
    pub dimension: IdentityDimension,
    pub divergence: f64,
    pub before: Value,
    pub after: Value,
}

pub fn analyze_dimension(
    dimension: IdentityDimension,
    baseline: &IdentityDocument,
    current: &IdentityDocument,
) -> IdentityResult<FieldDivergence> {
    Ok(FieldDivergence {
        dimension,
        divergence: dimension.divergence(baseline, current),
        before: dimension.payload(baseline)?,
        after: dimension.payload(current)?,
    })
}

// ---------------------------------------------------------------------------
// Analyzers
// ---------------------------------------------------------------------------

/// Mean of key-set Jaccard and description similarity over shared keys.
///
/// No shared keys with a non-empty baseline counts as total replacement
/// (content 0.0); an empty baseline has nothing to diverge from (content 1.0).
pub fn values_divergence(baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
    let key_similarity = set_similarity(baseline.values.keys(), current.values.keys());

    let shared: Vec<f64> = baseline
        .values
        .iter()
        .filter_map(|(key, before)| {
            current
                .values
                .get(key)
                .map(|after| string_similarity(before, after))
        })
        .collect();

    let content_similarity = if baseline.values.is_empty() {
        1.0
    } else {
        mean(shared).unwrap_or(0.0)
    };

    divergence((key_similarity + content_similarity) / 2.0)
}

/// Five equal components: tone, verbosity, humor, emoji (exact match) and
/// preferred-format Jaccard.
pub fn style_divergence(baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
    let a = &baseline.communication_style;
    let b = &current.communication_style;
    let exact = |same: bool| if same { 1.0 } else { 0.0 };

    let components = [
        exact(a.tone == b.tone),
        exact(a.verbosity == b.verbosity),
        exact(a.uses_humor == b.uses_humor),
        exact(a.uses_emoji == b.uses_emoji),
        jaccard(&a.preferred_formats, &b.preferred_formats),
    ];
    divergence(components.iter().sum::<f64>() / components.len() as f64)
}

/// Mean of pattern-id Jaccard and (description, response) similarity over
/// shared ids; no shared ids leaves the pair term at 1.0.
pub fn behavior_divergence(baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
    let id_similarity = set_similarity(
        baseline.behavioral_patterns.iter().map(|p| p.id.as_str()),
        current.behavioral_patterns.iter().map(|p| p.id.as_str()),
    );

    let pairs = baseline.behavioral_patterns.iter().filter_map(|before| {
        current
            .behavioral_patterns
            .iter()
            .find(|after| after.id == before.id)
            .map(|after| {
                0.5 * string_similarity(&before.description, &after.description)
                    + 0.5 * string_similarity(&before.response, &after.response)
            })
    });
    let pair_similarity = mean(pairs).unwrap_or(1.0);

    divergence((id_similarity + pair_similarity) / 2.0)
}

/// 0.4 × principle-name Jaccard + 0.6 × retention of absolute commitments.
pub fn ethics_divergence(baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
    let before = lowercase_set(baseline.ethical_commitments.iter().map(|c| &c.principle));
    let after = lowercase_set(current.ethical_commitments.iter().map(|c| &c.principle));
    let principle_similarity = jaccard(&before, &after);

    let retention = absolute_retention(baseline, &after);

    divergence(PRINCIPLE_SET_WEIGHT * principle_similarity + ABSOLUTE_RETENTION_WEIGHT * retention)
}

/// Fraction of baseline absolute principles that still have a close match.
fn absolute_retention(baseline: &IdentityDocument, current_principles: &BTreeSet<String>) -> f64 {
    let absolutes: Vec<String> = baseline
        .absolute_commitments()
        .map(|c| c.principle.to_lowercase())
        .collect();
    if absolutes.is_empty() {
        return 1.0;
    }
    let retained = absolutes
        .iter()
        .filter(|principle| {
            current_principles
                .iter()
                .any(|candidate| string_similarity(principle, candidate) > ABSOLUTE_RETENTION_SIMILARITY)
        })
        .count();
    retained as f64 / absolutes.len() as f64
}

/// Jaccard of lower-cased domain names; proficiency and subdomains are ignored.
pub fn knowledge_divergence(baseline: &IdentityDocument, current: &IdentityDocument) -> f64 {
    let before = lowercase_set(baseline.knowledge_domains.iter().map(|d| &d.domain));
    let after = lowercase_set(current.knowledge_domains.iter().map(|d| &d.domain));
    divergence(jaccard(&before, &after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipseity_core::{
        Absoluteness, BehavioralPattern, CommunicationStyle, EthicalCommitment, KnowledgeDomain,
        Proficiency, Verbosity,
    };

    fn base() -> IdentityDocument {
        IdentityDocument::builder("Mira")
            .id("mira-001")
            .value("honesty", "radical transparency")
            .value("loyalty", "fierce, unconditional")
            .pattern(BehavioralPattern::new(
                "clarify",
                "Clarify",
                "Asks when unsure",
                "What do you mean by X?",
                0.9,
            ))
            .pattern(BehavioralPattern::new("greet", "Greet", "Warm hello", "Hi again!", 0.4))
            .commitment(EthicalCommitment::new("Do no harm", "d", Absoluteness::Absolute))
            .commitment(EthicalCommitment::new("Respect privacy", "d", Absoluteness::Strong))
            .domain(KnowledgeDomain::new("Rust", Proficiency::Expert))
            .domain(KnowledgeDomain::new("Databases", Proficiency::Advanced))
            .style(CommunicationStyle {
                tone: "warm".into(),
                verbosity: Verbosity::Balanced,
                uses_humor: true,
                uses_emoji: false,
                preferred_formats: ["markdown".to_string(), "lists".to_string()].into(),
                avoided_patterns: ["as an ai".to_string()].into(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn identical_documents_have_zero_divergence() {
        let d = base();
        for dim in IdentityDimension::ALL {
            assert_eq!(dim.divergence(&d, &d), 0.0, "{}", dim);
        }
    }

    #[test]
    fn weights_sum_to_seven_and_a_half() {
        assert!((IdentityDimension::total_weight() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn values_total_replacement_is_full_divergence() {
        let before = IdentityDocument::builder("a").id("x").value("honesty", "radical transparency").build().unwrap();
        let after = IdentityDocument::builder("a").id("x").build().unwrap();
        assert_eq!(values_divergence(&before, &after), 1.0);

        let renamed = IdentityDocument::builder("a").id("x").value("candor", "radical transparency").build().unwrap();
        assert_eq!(values_divergence(&before, &renamed), 1.0);
    }

    #[test]
    fn values_empty_baseline_only_scores_key_sets() {
        let before = IdentityDocument::builder("a").id("x").build().unwrap();
        let after = IdentityDocument::builder("a").id("x").value("honesty", "h").build().unwrap();
        // keys: 0.0, content: 1.0 -> similarity 0.5
        assert!((values_divergence(&before, &after) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn values_partial_description_change() {
        let d = base();
        let mut changed = d.clone();
        changed.values.insert("loyalty".into(), "".into());
        // keys identical (1.0); content mean = (1.0 + 0.0) / 2 = 0.5 -> similarity 0.75
        assert!((values_divergence(&d, &changed) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn style_components_are_equally_weighted() {
        let d = base();
        let mut changed = d.clone();
        changed.communication_style.tone = "formal".into();
        assert!((style_divergence(&d, &changed) - 0.2).abs() < 1e-12);

        changed.communication_style.preferred_formats = ["markdown".to_string()].into();
        // format jaccard 0.5 -> components sum 3.5 / 5 = 0.7
        assert!((style_divergence(&d, &changed) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn behavior_without_shared_ids_uses_id_score_only() {
        let d = base();
        let mut changed = d.clone();
        changed.behavioral_patterns = vec![BehavioralPattern::new("new", "n", "d", "r", 0.5)];
        // ids 0/3 -> 0.0; no pairs -> 1.0; similarity 0.5
        assert!((behavior_divergence(&d, &changed) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn behavior_response_change_is_half_weighted() {
        let d = base();
        let mut changed = d.clone();
        changed.behavioral_patterns[1].response = String::new();
        // pair 1: 1.0, pair 2: 0.5 * 1.0 + 0.5 * 0.0 = 0.5 -> mean 0.75; ids 1.0
        assert!((behavior_divergence(&d, &changed) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn ethics_retention_tolerates_close_renames() {
        let d = base();
        let mut changed = d.clone();
        changed.ethical_commitments[0].principle = "Do no harms".into();
        // jaccard 1/3, retention 1.0 -> similarity 0.4/3 + 0.6
        let expected = 1.0 - (0.4 / 3.0 + 0.6);
        assert!((ethics_divergence(&d, &changed) - expected).abs() < 1e-12);
    }

    #[test]
    fn ethics_dropping_absolute_commitment_is_heavy() {
        let d = base();
        let mut changed = d.clone();
        changed.ethical_commitments.remove(0);
        // jaccard 1/2, retention 0 -> similarity 0.2
        assert!((ethics_divergence(&d, &changed) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn ethics_names_compare_case_insensitively() {
        let d = base();
        let mut changed = d.clone();
        changed.ethical_commitments[1].principle = "RESPECT PRIVACY".into();
        assert_eq!(ethics_divergence(&d, &changed), 0.0);
    }

    #[test]
    fn knowledge_ignores_proficiency_and_case() {
        let d = base();
        let mut changed = d.clone();
        changed.knowledge_domains[0].domain = "rust".into();
        changed.knowledge_domains[0].proficiency = Proficiency::Novice;
        changed.knowledge_domains[1].subdomains.insert("sql".into());
        assert_eq!(knowledge_divergence(&d, &changed), 0.0);

        changed.knowledge_domains.pop();
        assert!((knowledge_divergence(&d, &changed) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn analyze_dimension_carries_payloads() {
        let d = base();
        let mut changed = d.clone();
        changed.values.clear();
        let field = analyze_dimension(IdentityDimension::Values, &d, &changed).unwrap();
        assert_eq!(field.before["honesty"], "radical transparency");
        assert_eq!(field.after, serde_json::json!({}));
        assert_eq!(field.divergence, 1.0);
    }
}
