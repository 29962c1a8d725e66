//! Built-in consistency probes.
//!
//! | Probe | No evidence | Evidence |
//! |-------|-------------|----------|
//! | fingerprint | 0.5 (absent) | 1.0 match, 0.0 mismatch |
//! | values | 1.0 | mean token overlap of description vs `value:<key>` |
//! | behavioral_patterns | 1.0 | same, description + response, weight ≥ 0.7 only |
//! | ethical_commitments | 1.0 | absolute commitments: principle word present in sample |
//! | communication_style | 0.5 | 1.0 minus 0.3 per verbosity / avoided-pattern violation |

use std::collections::BTreeSet;

use ipseity_core::similarity::{clamp_unit, mean, token_overlap, tokenize};
use ipseity_core::{IdentityDocument, Verbosity};
use tracing::debug;

use crate::probe::{
    behavior_sample_key, ethics_sample_key, value_sample_key, BehavioralProbe, SampleMap,
    STYLE_SAMPLE_KEY,
};

/// Words must be longer than this to count towards token overlap.
const OVERLAP_MIN_WORD_LEN: usize = 4;
/// Principle words this short ("do", "no") are too common to be evidence.
const PRINCIPLE_MIN_WORD_LEN: usize = 2;
const STRONG_PATTERN_WEIGHT: f64 = 0.7;
const STYLE_PENALTY: f64 = 0.3;
const NO_STYLE_SAMPLE: f64 = 0.5;

pub(crate) fn all() -> Vec<Box<dyn BehavioralProbe>> {
    vec![
        Box::new(FingerprintProbe),
        Box::new(ValuesProbe),
        Box::new(BehavioralPatternsProbe),
        Box::new(EthicalCommitmentsProbe),
        Box::new(CommunicationStyleProbe),
    ]
}

fn sample<'a>(samples: Option<&'a SampleMap>, key: &str) -> Option<&'a str> {
    samples.and_then(|s| s.get(key)).map(String::as_str)
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintProbe;

impl BehavioralProbe for FingerprintProbe {
    fn dimension(&self) -> &str {
        "fingerprint"
    }

    fn description(&self) -> &str {
        "stored fingerprint matches the canonical fields"
    }

    fn score(&self, doc: &IdentityDocument, _samples: Option<&SampleMap>) -> f64 {
        match doc.fingerprint {
            None => 0.5,
            Some(_) if doc.verify_fingerprint() => 1.0,
            Some(_) => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ValuesProbe;

impl BehavioralProbe for ValuesProbe {
    fn dimension(&self) -> &str {
        "values"
    }

    fn description(&self) -> &str {
        "value descriptions are echoed by sampled responses"
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64 {
        let overlaps = doc.values.iter().filter_map(|(key, description)| {
            let text = sample(samples, &value_sample_key(key))?;
            token_overlap(description, text, OVERLAP_MIN_WORD_LEN)
        });
        let score = mean(overlaps).unwrap_or(1.0);
        debug!(target: "ipseity::probe", dimension = "values", score, "Probe scored");
        score
    }
}

// ---------------------------------------------------------------------------
// Behavioral Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BehavioralPatternsProbe;

impl BehavioralProbe for BehavioralPatternsProbe {
    fn dimension(&self) -> &str {
        "behavioral_patterns"
    }

    fn description(&self) -> &str {
        "strong patterns show up in sampled responses"
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64 {
        let overlaps = doc
            .behavioral_patterns
            .iter()
            .filter(|p| p.weight >= STRONG_PATTERN_WEIGHT)
            .filter_map(|p| {
                let text = sample(samples, &behavior_sample_key(&p.id))?;
                let reference = format!("{} {}", p.description, p.response);
                token_overlap(&reference, text, OVERLAP_MIN_WORD_LEN)
            });
        let score = mean(overlaps).unwrap_or(1.0);
        debug!(target: "ipseity::probe", dimension = "behavioral_patterns", score, "Probe scored");
        score
    }
}

// ---------------------------------------------------------------------------
// Ethical Commitments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct EthicalCommitmentsProbe;

/// Principle words used as evidence; short words are dropped unless the
/// principle has nothing else.
fn principle_words(principle: &str) -> BTreeSet<String> {
    let words = tokenize(principle);
    let long: BTreeSet<String> = words
        .iter()
        .filter(|w| w.chars().count() > PRINCIPLE_MIN_WORD_LEN)
        .cloned()
        .collect();
    if long.is_empty() {
        words.into_iter().collect()
    } else {
        long
    }
}

impl BehavioralProbe for EthicalCommitmentsProbe {
    fn dimension(&self) -> &str {
        "ethical_commitments"
    }

    fn description(&self) -> &str {
        "absolute principles are referenced by sampled responses"
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64 {
        let hits = doc.absolute_commitments().filter_map(|c| {
            let text = sample(samples, &ethics_sample_key(&c.slug()))?;
            let present: BTreeSet<String> = tokenize(text).into_iter().collect();
            let found = principle_words(&c.principle)
                .iter()
                .any(|w| present.contains(w));
            Some(if found { 1.0 } else { 0.0 })
        });
        let score = mean(hits).unwrap_or(1.0);
        debug!(target: "ipseity::probe", dimension = "ethical_commitments", score, "Probe scored");
        score
    }
}

// ---------------------------------------------------------------------------
// Communication Style
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct CommunicationStyleProbe;

fn verbosity_matches(verbosity: Verbosity, words: usize) -> bool {
    match verbosity {
        Verbosity::Concise => words <= 120,
        Verbosity::Detailed => words >= 40,
        Verbosity::Balanced => (10..=300).contains(&words),
    }
}

impl BehavioralProbe for CommunicationStyleProbe {
    fn dimension(&self) -> &str {
        "communication_style"
    }

    fn description(&self) -> &str {
        "sampled response length and phrasing fit the declared style"
    }

    fn score(&self, doc: &IdentityDocument, samples: Option<&SampleMap>) -> f64 {
        let Some(text) = sample(samples, STYLE_SAMPLE_KEY) else {
            return NO_STYLE_SAMPLE;
        };
        let style = &doc.communication_style;
        let mut score = 1.0;

        let words = text.split_whitespace().count();
        if !verbosity_matches(style.verbosity, words) {
            score -= STYLE_PENALTY;
        }

        let lowered = text.to_lowercase();
        if style
            .avoided_patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .any(|p| lowered.contains(&p.to_lowercase()))
        {
            score -= STYLE_PENALTY;
        }

        let score = clamp_unit(score);
        debug!(
            target: "ipseity::probe",
            dimension = "communication_style",
            words,
            score,
            "Probe scored"
        );
        score
    }
}
