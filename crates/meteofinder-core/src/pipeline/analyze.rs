use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edges::extract_edges;
use crate::io::load_raster;
use crate::lines::{detect_lines, LineSegment};
use crate::raster::Raster;
use crate::report::StageFailure;
use crate::scoring::{assess_segments, best_candidate, Candidate, SegmentAssessment, SensitivityLevel};

use super::config::DetectorConfig;
use super::types::PipelineStage;

/// Local pre-filter result for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalAnalysis {
    pub candidate: Option<Candidate>,
    pub segment_count: usize,
    pub analysis_scale: f32,
}

/// Everything the pre-filter saw in one image, for the diagnose tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub width: usize,
    pub height: usize,
    pub scale: f32,
    pub edge_pixels: usize,
    pub assessments: Vec<SegmentAssessment>,
}

fn fail(stage: PipelineStage, cause: impl ToString) -> StageFailure {
    StageFailure {
        stage,
        cause: cause.to_string(),
    }
}

/// Load, extract edges and detect segments. Level-independent.
pub fn detect_segments(
    path: &Path,
    config: &DetectorConfig,
) -> Result<(Raster, Vec<LineSegment>, usize), StageFailure> {
    let raster = load_raster(path).map_err(|e| fail(PipelineStage::Loading, e))?;
    let edges =
        extract_edges(&raster, &config.edges).map_err(|e| fail(PipelineStage::EdgeExtraction, e))?;
    let segments = detect_lines(&edges, &config.lines);
    Ok((raster, segments, edges.edge_count()))
}

/// Run the whole local pre-filter on one image file.
pub fn analyze_image(
    path: &Path,
    config: &DetectorConfig,
    level: SensitivityLevel,
) -> Result<LocalAnalysis, StageFailure> {
    let (raster, segments, _) = detect_segments(path, config)?;
    Ok(analyze_segments(path, &raster, &segments, config, level))
}

/// Score already-detected segments at `level`.
pub fn analyze_segments(
    path: &Path,
    raster: &Raster,
    segments: &[LineSegment],
    config: &DetectorConfig,
    level: SensitivityLevel,
) -> LocalAnalysis {
    let assessments = assess_segments(segments, raster, level, &config.scorer);
    let candidate = best_candidate(path, assessments, level);
    debug!(
        path = %path.display(),
        segments = segments.len(),
        score = candidate.as_ref().map(|c| c.score),
        "Local analysis"
    );
    LocalAnalysis {
        candidate,
        segment_count: segments.len(),
        analysis_scale: raster.scale,
    }
}

/// Per-segment features and outcomes for one image at `level`.
pub fn diagnose_image(
    path: &Path,
    config: &DetectorConfig,
    level: SensitivityLevel,
) -> Result<Diagnosis, StageFailure> {
    let (raster, segments, edge_pixels) = detect_segments(path, config)?;
    Ok(Diagnosis {
        width: raster.width(),
        height: raster.height(),
        scale: raster.scale,
        edge_pixels,
        assessments: assess_segments(&segments, &raster, level, &config.scorer),
    })
}
