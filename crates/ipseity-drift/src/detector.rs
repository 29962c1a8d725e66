//! Drift aggregation: per-field severities, the weighted overall score and
//! the recommended action.
//!
//! | Overall score | Recommendation |
//! |---------------|----------------|
//! | `< 0.05` | `stable` |
//! | `< alert_threshold` (0.25) | `monitor` |
//! | `< 0.5` | `alert` |
//! | otherwise | `restore` |

use std::fmt;

use chrono::{DateTime, Utc};
use ipseity_core::{DriftConfig, IdentityDocument, IdentityResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analyzers::{analyze_dimension, IdentityDimension};

const STABLE_CEILING: f64 = 0.05;
const RESTORE_FLOOR: f64 = 0.5;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Severity of a single field's divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    Negligible,
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl DriftSeverity {
    pub fn from_score(score: f64) -> Self {
        if score < 0.05 {
            DriftSeverity::Negligible
        } else if score < 0.15 {
            DriftSeverity::Minor
        } else if score < 0.35 {
            DriftSeverity::Moderate
        } else if score < 0.6 {
            DriftSeverity::Severe
        } else {
            DriftSeverity::Critical
        }
    }

    /// Severe and critical fields are called out in `alert` summaries.
    pub fn is_serious(&self) -> bool {
        matches!(self, DriftSeverity::Severe | DriftSeverity::Critical)
    }
}

impl fmt::Display for DriftSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftSeverity::Negligible => write!(f, "negligible"),
            DriftSeverity::Minor => write!(f, "minor"),
            DriftSeverity::Moderate => write!(f, "moderate"),
            DriftSeverity::Severe => write!(f, "severe"),
            DriftSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Action recommended for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftRecommendation {
    Stable,
    Monitor,
    Alert,
    /// Roll back to the baseline document.
    Restore,
}

impl DriftRecommendation {
    pub fn from_score(score: f64, alert_threshold: f64) -> Self {
        if score < STABLE_CEILING {
            DriftRecommendation::Stable
        } else if score < alert_threshold {
            DriftRecommendation::Monitor
        } else if score < RESTORE_FLOOR {
            DriftRecommendation::Alert
        } else {
            DriftRecommendation::Restore
        }
    }

    pub fn requires_action(&self) -> bool {
        matches!(self, DriftRecommendation::Alert | DriftRecommendation::Restore)
    }
}

impl fmt::Display for DriftRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftRecommendation::Stable => write!(f, "stable"),
            DriftRecommendation::Monitor => write!(f, "monitor"),
            DriftRecommendation::Alert => write!(f, "alert"),
            DriftRecommendation::Restore => write!(f, "restore"),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One retained field divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    pub field: IdentityDimension,
    pub before: Value,
    pub after: Value,
    pub divergence: f64,
    pub severity: DriftSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub document_id: String,
    pub baseline_version: u64,
    pub current_version: u64,
    /// Weighted mean over all five dimensions, in `[0, 1]`.
    pub overall_score: f64,
    /// Only fields whose divergence exceeds the noise floor.
    pub events: Vec<DriftEvent>,
    pub recommendation: DriftRecommendation,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl DriftReport {
    pub fn event(&self, dimension: IdentityDimension) -> Option<&DriftEvent> {
        self.events.iter().find(|e| e.field == dimension)
    }

    /// Highest retained severity, `None` when nothing passed the noise floor.
    pub fn max_severity(&self) -> Option<DriftSeverity> {
        self.events.iter().map(|e| e.severity).max()
    }

    pub fn requires_action(&self) -> bool {
        self.recommendation.requires_action()
    }
}

fn summarize(recommendation: DriftRecommendation, score: f64, events: &[DriftEvent]) -> String {
    match recommendation {
        DriftRecommendation::Stable => {
            format!("Identity is stable (drift {:.3}); no meaningful change detected.", score)
        }
        DriftRecommendation::Monitor => format!(
            "Minor drift detected (drift {:.3}) across {} field(s); continue monitoring.",
            score,
            events.len()
        ),
        DriftRecommendation::Alert => {
            let serious: Vec<String> = events
                .iter()
                .filter(|e| e.severity.is_serious())
                .map(|e| format!("{} ({})", e.field, e.severity))
                .collect();
            if serious.is_empty() {
                format!(
                    "Significant drift detected (drift {:.3}); review recent changes.",
                    score
                )
            } else {
                format!(
                    "Significant drift detected (drift {:.3}); review: {}.",
                    score,
                    serious.join(", ")
                )
            }
        }
        DriftRecommendation::Restore => format!(
            "Critical drift detected (drift {:.3}); restore from the baseline document.",
            score
        ),
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Compares identity documents and produces [`DriftReport`]s.
#[derive(Debug, Clone, Default)]
pub struct DriftDetector {
    config: DriftConfig,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> IdentityResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Compare `current` against `baseline`.
    ///
    /// Both documents are validated first; a schema violation is returned
    /// before any analysis runs.
    pub fn analyze(
        &self,
        baseline: &IdentityDocument,
        current: &IdentityDocument,
    ) -> IdentityResult<DriftReport> {
        baseline.validate()?;
        current.validate()?;

        let mut events = Vec::new();
        let mut weighted = 0.0;

        for dimension in IdentityDimension::ALL {
            let field = analyze_dimension(dimension, baseline, current)?;
            debug!(
                target: "ipseity::drift",
                field = %dimension,
                divergence = field.divergence,
                "Field analyzed"
            );
            if field.divergence <= self.config.noise_floor {
                continue;
            }
            weighted += dimension.weight() * field.divergence;
            events.push(DriftEvent {
                field: dimension,
                severity: DriftSeverity::from_score(field.divergence),
                divergence: field.divergence,
                before: field.before,
                after: field.after,
            });
        }

        let overall_score = (weighted / IdentityDimension::total_weight()).clamp(0.0, 1.0);
        let recommendation =
            DriftRecommendation::from_score(overall_score, self.config.alert_threshold);
        let summary = summarize(recommendation, overall_score, &events);

        if recommendation.requires_action() {
            warn!(
                target: "ipseity::drift",
                id = %current.id,
                baseline_version = baseline.version,
                current_version = current.version,
                overall_score,
                recommendation = %recommendation,
                "Identity drift requires action"
            );
        } else {
            info!(
                target: "ipseity::drift",
                id = %current.id,
                baseline_version = baseline.version,
                current_version = current.version,
                overall_score,
                recommendation = %recommendation,
                "Drift report generated"
            );
        }

        Ok(DriftReport {
            document_id: current.id.clone(),
            baseline_version: baseline.version,
            current_version: current.version,
            overall_score,
            events,
            recommendation,
            summary,
            generated_at: Utc::now(),
        })
    }

    /// Compare every later document against the first one.
    ///
    /// The baseline stays fixed, so slow cumulative drift shows up as a rising
    /// score instead of a series of small steps. Fewer than two documents
    /// produce no reports.
    pub fn track_time_series(&self, documents: &[IdentityDocument]) -> IdentityResult<Vec<DriftReport>> {
        let Some((baseline, rest)) = documents.split_first() else {
            return Ok(Vec::new());
        };
        rest.iter()
            .map(|current| self.analyze(baseline, current))
            .collect()
    }
}
