//! ipseity-continuity: did a restored or migrated agent come back as itself?
//!
//! - [`BehavioralProbe`] / [`ProbeRegistry`]: pluggable per-dimension
//!   consistency checks, with five built-ins and [`FnProbe`] for closures.
//! - [`ContinuityVerifier`]: structural checks plus every registered probe,
//!   folded into a weighted confidence and a pass/fail verdict.

pub mod builtin;
mod probe;
mod verifier;

pub use probe::{
    behavior_sample_key, ethics_sample_key, value_sample_key, BehavioralProbe, FnProbe,
    ProbeRegistry, SampleMap, STRUCTURAL_DIMENSION, STYLE_SAMPLE_KEY,
};
pub use verifier::{dimension_weight, ContinuityVerifier, VerificationResult};
