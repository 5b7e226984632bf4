use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::decision::{Mode, Verdict};
use crate::pipeline::PipelineStage;
use crate::scoring::SensitivityLevel;
use crate::verify::RunBudget;

/// A local stage that failed for one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: PipelineStage,
    pub cause: String,
}

/// Final outcome for one input image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageVerdict {
    /// Position in the input list.
    pub index: usize,
    pub path: PathBuf,
    pub verdict: Verdict,
    /// Local score of the best candidate, when there was one.
    pub score: Option<f32>,
    pub detail: Option<String>,
    pub failure: Option<StageFailure>,
}

impl ImageVerdict {
    pub fn new(index: usize, path: PathBuf, verdict: Verdict) -> Self {
        Self {
            index,
            path,
            verdict,
            score: None,
            detail: None,
            failure: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_failure(mut self, stage: PipelineStage, cause: impl Into<String>) -> Self {
        self.failure = Some(StageFailure {
            stage,
            cause: cause.into(),
        });
        self
    }
}

/// One entry of the accepted set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcceptedImage {
    pub path: PathBuf,
    pub verdict: Verdict,
    pub score: Option<f32>,
}

/// Per-verdict counts and escalation totals of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub rejected: usize,
    pub accepted_local: usize,
    pub accepted_remote: usize,
    pub escalation_failed: usize,
    pub skipped: usize,
    pub escalations: usize,
    pub estimated_cost_usd: f64,
}

impl RunSummary {
    pub fn accepted(&self) -> usize {
        self.accepted_local + self.accepted_remote
    }
}

/// Everything a run produced, in input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: Mode,
    pub level: SensitivityLevel,
    pub verdicts: Vec<ImageVerdict>,
    /// Inputs never finished because the run was cancelled.
    pub skipped: Vec<PathBuf>,
    pub summary: RunSummary,
    pub budget: RunBudget,
    /// The run switched to local-only after repeated remote failures.
    pub degraded: bool,
}

impl RunReport {
    /// Accepted images as `(path, verdict, score)`, in input order.
    pub fn accepted_set(&self) -> Vec<AcceptedImage> {
        self.verdicts
            .iter()
            .filter(|v| v.verdict.is_accepted())
            .map(|v| AcceptedImage {
                path: v.path.clone(),
                verdict: v.verdict,
                score: v.score,
            })
            .collect()
    }
}

/// Collects verdicts in any order and hands them back sorted by input index.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    verdicts: Vec<ImageVerdict>,
    skipped: Vec<(usize, PathBuf)>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: ImageVerdict) {
        self.verdicts.push(verdict);
    }

    pub fn skip(&mut self, index: usize, path: PathBuf) {
        self.skipped.push((index, path));
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Build the report. The same verdicts give the same report whatever order
    /// they were pushed in.
    pub fn finish(
        mut self,
        mode: Mode,
        level: SensitivityLevel,
        budget: RunBudget,
        degraded: bool,
    ) -> RunReport {
        self.verdicts.sort_by_key(|v| v.index);
        self.skipped.sort_by_key(|(i, _)| *i);

        let mut summary = RunSummary {
            total: self.verdicts.len() + self.skipped.len(),
            skipped: self.skipped.len(),
            escalations: budget.escalations,
            estimated_cost_usd: budget.estimated_cost(),
            ..Default::default()
        };
        for v in &self.verdicts {
            match v.verdict {
                Verdict::Rejected => summary.rejected += 1,
                Verdict::AcceptedLocal => summary.accepted_local += 1,
                Verdict::AcceptedRemote => summary.accepted_remote += 1,
                Verdict::EscalationFailed => summary.escalation_failed += 1,
            }
        }

        RunReport {
            mode,
            level,
            verdicts: self.verdicts,
            skipped: self.skipped.into_iter().map(|(_, p)| p).collect(),
            summary,
            budget,
            degraded,
        }
    }
}
