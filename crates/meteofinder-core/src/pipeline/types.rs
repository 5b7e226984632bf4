use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Pipeline processing stage, used for progress reporting and failure records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Loading,
    EdgeExtraction,
    LineDetection,
    Scoring,
    Verifying,
    Aggregating,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading images"),
            Self::EdgeExtraction => write!(f, "Extracting edges"),
            Self::LineDetection => write!(f, "Detecting lines"),
            Self::Scoring => write!(f, "Scoring candidates"),
            Self::Verifying => write!(f, "Verifying candidates"),
            Self::Aggregating => write!(f, "Collecting results"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., image count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` more work items within the current stage have completed.
    /// May be called from several worker threads.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Shared stop flag for a run.
///
/// Cancelling stops new images and new escalations from starting; work
/// already in flight finishes and keeps its verdict.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
