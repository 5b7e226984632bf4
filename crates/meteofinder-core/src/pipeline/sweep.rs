use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scoring::SensitivityLevel;

use super::analyze::{analyze_segments, detect_segments};
use super::config::DetectorConfig;
use super::types::{CancelToken, PipelineStage, ProgressReporter};

/// Detections of the local pre-filter at one level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: SensitivityLevel,
    pub detected: usize,
    /// Detected images among those analysed, in [0, 1].
    pub rate: f64,
}

/// Local pre-filter results at every sensitivity level over one image set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub analysed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub levels: Vec<LevelCount>,
}

/// Run the local pre-filter over `paths` once and score it at every level.
///
/// Edges and segments are level-independent, so each image is decoded and
/// searched once.
pub fn sweep_levels(
    paths: &[PathBuf],
    config: &DetectorConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancelToken,
) -> SweepReport {
    let levels: Vec<SensitivityLevel> = SensitivityLevel::all().collect();
    reporter.begin_stage(PipelineStage::Scoring, Some(paths.len()));

    // Per image: None when skipped, Some(None) when unreadable.
    let hits: Vec<Option<Option<Vec<bool>>>> = paths
        .par_iter()
        .map(|path| {
            if cancel.is_cancelled() {
                return None;
            }
            let row = match detect_segments(path, config) {
                Ok((raster, segments, _)) => Some(
                    levels
                        .iter()
                        .map(|&level| {
                            analyze_segments(path, &raster, &segments, config, level)
                                .candidate
                                .is_some()
                        })
                        .collect(),
                ),
                Err(failure) => {
                    warn!(path = %path.display(), cause = %failure.cause, "Skipping image in sweep");
                    None
                }
            };
            reporter.advance(1);
            Some(row)
        })
        .collect();
    reporter.finish_stage();

    let skipped = hits.iter().filter(|h| h.is_none()).count();
    let rows: Vec<&Vec<bool>> = hits.iter().flatten().flatten().collect();
    let analysed = rows.len();
    let failed = paths.len() - skipped - analysed;

    let levels = levels
        .iter()
        .enumerate()
        .map(|(i, &level)| {
            let detected = rows.iter().filter(|r| r[i]).count();
            LevelCount {
                level,
                detected,
                rate: if analysed == 0 {
                    0.0
                } else {
                    detected as f64 / analysed as f64
                },
            }
        })
        .collect();

    info!(analysed, failed, skipped, "Sensitivity sweep complete");
    SweepReport {
        analysed,
        failed,
        skipped,
        levels,
    }
}
