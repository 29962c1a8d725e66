//! ipseity-drift: how far has an identity document moved from its baseline?
//!
//! [`analyzers`] scores each of the five identity dimensions independently;
//! [`DriftDetector`] drops noise, weights the rest into an overall score and
//! maps it to a [`DriftRecommendation`].

pub mod analyzers;
mod detector;

pub use analyzers::{FieldDivergence, IdentityDimension};
pub use detector::{DriftDetector, DriftEvent, DriftRecommendation, DriftReport, DriftSeverity};
