pub mod families;
pub mod features;
pub mod sensitivity;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{
    CURVATURE_SCALE, DASHED_LINE_PIECES, DEFAULT_CLUTTER_LIMIT, DEFAULT_EVIDENCE_MIN_LENGTH,
    DEFAULT_MAX_PARALLEL_COMPANIONS, DEFAULT_MIN_CONTRAST, DEFAULT_STAR_TRAIL_FAMILY,
    REFERENCE_CONTRAST, REFERENCE_STREAK_LENGTH,
};
use crate::lines::{angle_difference, LineSegment};
use crate::raster::Raster;

pub use families::{group_lines, LineFamilies, LineGroup};
pub use features::{measure_segment, SegmentFeatures};
pub use sensitivity::{SensitivityLevel, Thresholds};

/// Minimum dark fraction along the ridge for a dotted profile.
const DOTTED_MIN_DROPOUT: f32 = 0.2;
/// Minimum lit runs for a dotted profile.
const DOTTED_MIN_RUNS: usize = 3;
/// Red-light samples that mark a segment as navigation lights.
const RED_LIGHT_MIN_HITS: usize = 2;

/// Level-independent scorer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Ridge-over-background contrast a streak must reach.
    #[serde(default = "default_min_contrast")]
    pub min_contrast: f32,
    /// Length (px at full resolution) for a segment to count as line evidence.
    #[serde(default = "default_evidence_min_length")]
    pub evidence_min_length: f32,
    /// Parallel lines that make a star-trail field.
    #[serde(default = "default_star_trail_family")]
    pub star_trail_family: usize,
    /// Distinct lines above which the frame is too cluttered to judge.
    #[serde(default = "default_clutter_limit")]
    pub clutter_limit: usize,
    /// Parallel companion lines at which a segment counts as aircraft lights.
    #[serde(default = "default_max_parallel_companions")]
    pub max_parallel_companions: usize,
    /// Reject segments within this many degrees of horizontal or vertical.
    /// Zero disables the check.
    #[serde(default)]
    pub axis_exclusion_deg: f32,
    #[serde(default = "default_true")]
    pub reject_dotted: bool,
    #[serde(default = "default_true")]
    pub reject_red_lights: bool,
}

fn default_min_contrast() -> f32 {
    DEFAULT_MIN_CONTRAST
}
fn default_evidence_min_length() -> f32 {
    DEFAULT_EVIDENCE_MIN_LENGTH
}
fn default_star_trail_family() -> usize {
    DEFAULT_STAR_TRAIL_FAMILY
}
fn default_clutter_limit() -> usize {
    DEFAULT_CLUTTER_LIMIT
}
fn default_max_parallel_companions() -> usize {
    DEFAULT_MAX_PARALLEL_COMPANIONS
}
fn default_true() -> bool {
    true
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            min_contrast: DEFAULT_MIN_CONTRAST,
            evidence_min_length: DEFAULT_EVIDENCE_MIN_LENGTH,
            star_trail_family: DEFAULT_STAR_TRAIL_FAMILY,
            clutter_limit: DEFAULT_CLUTTER_LIMIT,
            max_parallel_companions: DEFAULT_MAX_PARALLEL_COMPANIONS,
            axis_exclusion_deg: 0.0,
            reject_dotted: true,
            reject_red_lights: true,
        }
    }
}

/// Why a segment did not qualify.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    StarTrailField { family: usize },
    ClutteredFrame { lines: usize },
    LowContrast,
    Dotted,
    Dashed,
    RedLights,
    ParallelLights { companions: usize },
    AxisAligned,
    TooShort,
    TooDim,
    TooCurved,
    LowScore,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StarTrailField { family } => {
                write!(f, "star-trail field ({family} parallel lines)")
            }
            Self::ClutteredFrame { lines } => write!(f, "cluttered frame ({lines} lines)"),
            Self::LowContrast => write!(f, "too little contrast"),
            Self::Dotted => write!(f, "dotted (blinking lights)"),
            Self::Dashed => write!(f, "dashed line"),
            Self::RedLights => write!(f, "red navigation lights"),
            Self::ParallelLights { companions } => {
                write!(f, "parallel light trails ({companions} companions)")
            }
            Self::AxisAligned => write!(f, "axis-aligned"),
            Self::TooShort => write!(f, "too short"),
            Self::TooDim => write!(f, "too dim"),
            Self::TooCurved => write!(f, "too curved"),
            Self::LowScore => write!(f, "score below threshold"),
        }
    }
}

/// Verdict on one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SegmentOutcome {
    Qualified { score: f32 },
    Rejected(RejectReason),
}

/// One segment with everything the scorer found out about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssessment {
    pub segment: LineSegment,
    pub features: SegmentFeatures,
    pub parallel_companions: usize,
    /// Score ignoring level-dependent rejection; `None` when a level-independent
    /// check already failed.
    pub score: Option<f32>,
    pub outcome: SegmentOutcome,
}

/// Best qualifying streak of an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub segment: LineSegment,
    pub score: f32,
    pub level: SensitivityLevel,
    pub features: SegmentFeatures,
}

/// Scalar meteor-likeness score in [0, 1].
///
/// `isolation * (0.35 * length + 0.40 * contrast + 0.25 * straightness)`,
/// each term normalized to [0, 1].
pub fn streak_score(features: &SegmentFeatures, parallel_companions: usize, scale: f32) -> f32 {
    let length_term = (features.length / (REFERENCE_STREAK_LENGTH * scale)).min(1.0);
    let contrast_term = (features.contrast / REFERENCE_CONTRAST).clamp(0.0, 1.0);
    let straightness_term = (1.0 - features.curvature / CURVATURE_SCALE).max(0.0);
    let isolation = 1.0 / (1.0 + parallel_companions as f32);
    (isolation * (0.35 * length_term + 0.40 * contrast_term + 0.25 * straightness_term))
        .clamp(0.0, 1.0)
}

/// Measure every segment and decide, at `level`, which ones qualify.
///
/// Segments keep their input order. Image-level evidence (star-trail
/// families, clutter) rejects every segment of the image.
pub fn assess_segments(
    segments: &[LineSegment],
    raster: &Raster,
    level: SensitivityLevel,
    config: &ScorerConfig,
) -> Vec<SegmentAssessment> {
    let scale = raster.scale;
    let thresholds = level.thresholds();
    let features: Vec<SegmentFeatures> = segments
        .iter()
        .map(|s| measure_segment(raster, s))
        .collect();

    let evidence: Vec<bool> = features
        .iter()
        .map(|f| f.length >= config.evidence_min_length * scale && f.contrast >= config.min_contrast)
        .collect();
    let families = group_lines(segments, &evidence);

    let image_reason = if families.largest_family >= config.star_trail_family {
        Some(RejectReason::StarTrailField {
            family: families.largest_family,
        })
    } else if families.line_count() > config.clutter_limit {
        Some(RejectReason::ClutteredFrame {
            lines: families.line_count(),
        })
    } else {
        None
    };

    segments
        .iter()
        .zip(features)
        .enumerate()
        .map(|(i, (segment, features))| {
            let (companions, dashed) = match families.group_for(i) {
                Some(line) => (line.parallel_companions, line.pieces >= DASHED_LINE_PIECES),
                None => (
                    families::parallel_lines_to(segment, segments, &families),
                    false,
                ),
            };

            let independent = image_reason
                .clone()
                .or_else(|| independent_reason(segment, &features, companions, dashed, config));
            let (score, outcome) = match independent {
                Some(reason) => (None, SegmentOutcome::Rejected(reason)),
                None => {
                    let score = streak_score(&features, companions, scale);
                    let outcome = match level_reason(&features, score, &thresholds, scale) {
                        Some(reason) => SegmentOutcome::Rejected(reason),
                        None => SegmentOutcome::Qualified { score },
                    };
                    (Some(score), outcome)
                }
            };

            SegmentAssessment {
                segment: segment.clone(),
                features,
                parallel_companions: companions,
                score,
                outcome,
            }
        })
        .collect()
}

fn independent_reason(
    segment: &LineSegment,
    features: &SegmentFeatures,
    companions: usize,
    dashed: bool,
    config: &ScorerConfig,
) -> Option<RejectReason> {
    if features.contrast < config.min_contrast {
        return Some(RejectReason::LowContrast);
    }
    if config.reject_dotted && features.is_dotted(DOTTED_MIN_DROPOUT, DOTTED_MIN_RUNS) {
        return Some(RejectReason::Dotted);
    }
    if config.reject_dotted && dashed {
        return Some(RejectReason::Dashed);
    }
    if config.reject_red_lights && features.red_hits >= RED_LIGHT_MIN_HITS {
        return Some(RejectReason::RedLights);
    }
    if companions >= config.max_parallel_companions {
        return Some(RejectReason::ParallelLights { companions });
    }
    if config.axis_exclusion_deg > 0.0 {
        let off_axis = angle_difference(segment.angle, 0.0).min(angle_difference(segment.angle, 90.0));
        if off_axis <= config.axis_exclusion_deg {
            return Some(RejectReason::AxisAligned);
        }
    }
    None
}

fn level_reason(
    features: &SegmentFeatures,
    score: f32,
    thresholds: &Thresholds,
    scale: f32,
) -> Option<RejectReason> {
    if features.length < thresholds.min_length * scale {
        Some(RejectReason::TooShort)
    } else if features.brightness < thresholds.min_brightness {
        Some(RejectReason::TooDim)
    } else if features.curvature > thresholds.max_curvature {
        Some(RejectReason::TooCurved)
    } else if score < thresholds.min_score {
        Some(RejectReason::LowScore)
    } else {
        None
    }
}

/// Best qualifying segment of an image at `level`, if any.
///
/// Pure: identical inputs give identical output. Ties on score go to the
/// longer segment.
pub fn score_candidate(
    path: &Path,
    segments: &[LineSegment],
    raster: &Raster,
    level: SensitivityLevel,
    config: &ScorerConfig,
) -> Option<Candidate> {
    best_candidate(path, assess_segments(segments, raster, level, config), level)
}

/// Pick the best qualifying segment out of an assessment.
pub fn best_candidate(
    path: &Path,
    assessments: Vec<SegmentAssessment>,
    level: SensitivityLevel,
) -> Option<Candidate> {
    assessments
        .into_iter()
        .filter_map(|a| match a.outcome {
            SegmentOutcome::Qualified { score } => Some((score, a)),
            SegmentOutcome::Rejected(_) => None,
        })
        .max_by(|(sa, a), (sb, b)| {
            sa.total_cmp(sb)
                .then(a.segment.length.total_cmp(&b.segment.length))
        })
        .map(|(score, a)| Candidate {
            path: path.to_path_buf(),
            segment: a.segment,
            score,
            level,
            features: a.features,
        })
}
