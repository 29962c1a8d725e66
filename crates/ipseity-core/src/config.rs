//! Threshold configuration for drift detection and continuity verification.
//!
//! Loaded with the `config` crate. Precedence (lowest to highest):
//!
//! | Source | Notes |
//! |--------|-------|
//! | built-in defaults | see the table below |
//! | TOML file | path from `IPSEITY_CONFIG`, else `config/ipseity.toml` when it exists |
//! | environment | prefix `IPSEITY`, nested keys separated by `__` (e.g. `IPSEITY__DRIFT__ALERT_THRESHOLD`) |
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | drift.alert_threshold | 0.25 | Overall drift score at which `monitor` becomes `alert`. |
//! | drift.noise_floor | 0.02 | Field divergence at or below this is measurement noise. |
//! | continuity.consistency_threshold | 0.7 | Confidence needed for a passing verdict; per-dimension failure line. |
//!
//! Dimension weights are fixed and intentionally not configurable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{IdentityError, IdentityResult};

const ENV_CONFIG_PATH: &str = "IPSEITY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/ipseity.toml";

fn default_alert_threshold() -> f64 {
    0.25
}

fn default_noise_floor() -> f64 {
    0.02
}

fn default_consistency_threshold() -> f64 {
    0.7
}

/// Drift detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            alert_threshold: default_alert_threshold(),
            noise_floor: default_noise_floor(),
        }
    }
}

/// Continuity verifier thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuityConfig {
    #[serde(default = "default_consistency_threshold")]
    pub consistency_threshold: f64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            consistency_threshold: default_consistency_threshold(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IpseityConfig {
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub continuity: ContinuityConfig,
}

impl IpseityConfig {
    /// Load defaults, the optional config file and environment overrides.
    pub fn load() -> IdentityResult<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = if path.exists() { Some(path.as_path()) } else { None };
        Self::build(file)
    }

    /// Load from an explicit TOML file (required), still honoring environment overrides.
    pub fn load_from_path(path: &Path) -> IdentityResult<Self> {
        if !path.exists() {
            return Err(IdentityError::InvalidConfig(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::build(Some(path))
    }

    fn build(file: Option<&Path>) -> IdentityResult<Self> {
        let builder = config::Config::builder()
            .set_default("drift.alert_threshold", default_alert_threshold())?
            .set_default("drift.noise_floor", default_noise_floor())?
            .set_default(
                "continuity.consistency_threshold",
                default_consistency_threshold(),
            )?;

        let builder = match file {
            Some(path) => {
                debug!(target: "ipseity::config", path = %path.display(), "Reading config file");
                builder.add_source(
                    config::File::from(path)
                        .format(config::FileFormat::Toml)
                        .required(true),
                )
            }
            None => builder,
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("IPSEITY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: IpseityConfig = built.try_deserialize()?;
        cfg.validate()?;
        info!(
            target: "ipseity::config",
            alert_threshold = cfg.drift.alert_threshold,
            noise_floor = cfg.drift.noise_floor,
            consistency_threshold = cfg.continuity.consistency_threshold,
            "Configuration loaded"
        );
        Ok(cfg)
    }

    /// Write this configuration as pretty TOML, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> IdentityResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject thresholds that would make the tier ladders non-monotonic.
    pub fn validate(&self) -> IdentityResult<()> {
        self.drift.validate()?;
        self.continuity.validate()
    }
}

impl DriftConfig {
    pub fn validate(&self) -> IdentityResult<()> {
        if !(0.0..0.05).contains(&self.noise_floor) {
            return Err(IdentityError::InvalidConfig(format!(
                "drift.noise_floor must be in [0, 0.05), got {}",
                self.noise_floor
            )));
        }
        if !(self.alert_threshold > 0.05 && self.alert_threshold <= 0.5) {
            return Err(IdentityError::InvalidConfig(format!(
                "drift.alert_threshold must be in (0.05, 0.5], got {}",
                self.alert_threshold
            )));
        }
        Ok(())
    }
}

impl ContinuityConfig {
    pub fn validate(&self) -> IdentityResult<()> {
        let c = self.consistency_threshold;
        if !(c > 0.0 && c <= 1.0) {
            return Err(IdentityError::InvalidConfig(format!(
                "continuity.consistency_threshold must be in (0, 1], got {}",
                c
            )));
        }
        Ok(())
    }
}
