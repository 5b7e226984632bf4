use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_MAX_CONCURRENCY;
use crate::decision::Mode;
use crate::edges::EdgeConfig;
use crate::error::{MeteorError, Result};
use crate::lines::LineConfig;
use crate::scoring::{ScorerConfig, SensitivityLevel};
use crate::verify::{AnthropicSettings, VerifierSettings};

/// Everything one run needs to know, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub level: SensitivityLevel,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Local pre-filter settings. None of them depend on the sensitivity level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub edges: EdgeConfig,
    #[serde(default)]
    pub lines: LineConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

/// Remote verification settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Escalations in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub limits: VerifierSettings,
    #[serde(default)]
    pub anthropic: AnthropicSettings,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            limits: VerifierSettings::default(),
            anthropic: AnthropicSettings::default(),
        }
    }
}

impl RunConfig {
    /// Reject settings no run can work with. Called before any image is touched.
    pub fn validate(&self) -> Result<()> {
        let edges = &self.detector.edges;
        if !non_negative(edges.blur_sigma as f64) {
            return invalid(format!("edges.blur_sigma must be >= 0, got {}", edges.blur_sigma));
        }
        if !positive(edges.threshold as f64) {
            return invalid(format!("edges.threshold must be > 0, got {}", edges.threshold));
        }

        let lines = &self.detector.lines;
        if lines.min_votes == 0 {
            return invalid("lines.min_votes must be at least 1".into());
        }
        if lines.max_peaks == 0 || lines.max_segments == 0 {
            return invalid("lines.max_peaks and lines.max_segments must be at least 1".into());
        }
        if !positive(lines.min_segment_length as f64) {
            return invalid(format!(
                "lines.min_segment_length must be > 0, got {}",
                lines.min_segment_length
            ));
        }

        let scorer = &self.detector.scorer;
        if !positive(scorer.min_contrast as f64) {
            return invalid(format!("scorer.min_contrast must be > 0, got {}", scorer.min_contrast));
        }
        if scorer.star_trail_family < 2 {
            return invalid("scorer.star_trail_family must be at least 2".into());
        }
        if !(0.0..45.0).contains(&scorer.axis_exclusion_deg) {
            return invalid(format!(
                "scorer.axis_exclusion_deg must be in [0, 45), got {}",
                scorer.axis_exclusion_deg
            ));
        }

        let remote = &self.remote;
        if remote.max_concurrency == 0 {
            return invalid("remote.max_concurrency must be at least 1".into());
        }
        if remote.limits.fallback_after == 0 {
            return invalid("remote.limits.fallback_after must be at least 1".into());
        }
        if !non_negative(remote.limits.cost_per_call_usd) {
            return invalid("remote.limits.cost_per_call_usd must be >= 0".into());
        }
        if remote.anthropic.timeout_secs == 0 {
            return invalid("remote.anthropic.timeout_secs must be at least 1".into());
        }
        let upload = &remote.anthropic.upload;
        if upload.max_bytes == 0 || !non_negative(upload.crop_padding as f64) {
            return invalid("remote.anthropic.upload needs max_bytes > 0 and crop_padding >= 0".into());
        }

        Ok(())
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn invalid(msg: String) -> Result<()> {
    Err(MeteorError::Configuration(msg))
}
