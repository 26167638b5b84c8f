use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DispositionError, Result};

/// Adjusted sample sizes above this are trusted on volume alone.
pub const HIGH_VOLUME_THRESHOLD: f64 = 500.0;
/// Adjusted sample sizes below this are never trusted.
pub const LOW_VOLUME_THRESHOLD: f64 = 50.0;
/// Confidence-interval half-widths separating tier 1 from 2 and 2 from 3.
pub const DEVIATION_THRESHOLDS: [f64; 2] = [0.03, 0.06];
/// One threshold per tier below the fall-through tier 3.
pub const MAX_DEVIATION_THRESHOLDS: usize = 2;
/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;
/// Weight given to projected passengers/trips of already committed hours.
pub const COMMITMENT_WEIGHT: f64 = 0.5;

/// Tunables of the disposition engine.
///
/// Stored as JSON on disk; absent fields fall back to the defaults:
/// ```json
/// {
///   "shuffle_equal_priorities": false,
///   "deviation_thresholds": [0.02, 0.05]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Randomly permute candidate routes before scoring so exact ties do not
    /// always go to the same route.
    pub shuffle_equal_priorities: bool,
    /// Rank every route by complaint rate and load, skipping the quality tier.
    pub ignore_data_quality: bool,
    pub high_volume_threshold: f64,
    pub low_volume_threshold: f64,
    pub deviation_thresholds: Vec<f64>,
    pub z_score: f64,
    pub commitment_weight: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shuffle_equal_priorities: true,
            ignore_data_quality: false,
            high_volume_threshold: HIGH_VOLUME_THRESHOLD,
            low_volume_threshold: LOW_VOLUME_THRESHOLD,
            deviation_thresholds: DEVIATION_THRESHOLDS.to_vec(),
            z_score: Z_95,
            commitment_weight: COMMITMENT_WEIGHT,
        }
    }
}

impl EngineConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();

        let content =
            std::fs::read_to_string(path).map_err(|e| DispositionError::unreadable(&source_id, e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DispositionError::InvalidConfig(format!("{source_id}: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.deviation_thresholds.is_empty() {
            return Err(DispositionError::InvalidConfig(
                "deviation_thresholds must not be empty".into(),
            ));
        }
        if self.deviation_thresholds.len() > MAX_DEVIATION_THRESHOLDS {
            return Err(DispositionError::InvalidConfig(format!(
                "at most {MAX_DEVIATION_THRESHOLDS} deviation_thresholds are supported, got {}",
                self.deviation_thresholds.len()
            )));
        }
        if self
            .deviation_thresholds
            .iter()
            .any(|t| !t.is_finite() || *t <= 0.0)
        {
            return Err(DispositionError::InvalidConfig(
                "deviation_thresholds must be finite and positive".into(),
            ));
        }
        if self.deviation_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DispositionError::InvalidConfig(
                "deviation_thresholds must be strictly ascending".into(),
            ));
        }
        if self.low_volume_threshold > self.high_volume_threshold {
            return Err(DispositionError::InvalidConfig(format!(
                "low_volume_threshold {} exceeds high_volume_threshold {}",
                self.low_volume_threshold, self.high_volume_threshold
            )));
        }
        if self.z_score <= 0.0 {
            return Err(DispositionError::InvalidConfig("z_score must be positive".into()));
        }
        if self.commitment_weight < 0.0 {
            return Err(DispositionError::InvalidConfig(
                "commitment_weight must not be negative".into(),
            ));
        }
        Ok(())
    }
}
