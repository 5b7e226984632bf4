pub mod analyze;
pub mod config;
mod orchestrator;
mod sweep;
mod types;

pub use analyze::{analyze_image, diagnose_image, Diagnosis, LocalAnalysis};
pub use config::{DetectorConfig, RemoteConfig, RunConfig};
pub use orchestrator::MeteorPipeline;
pub use sweep::{sweep_levels, LevelCount, SweepReport};
pub use types::{CancelToken, NoOpReporter, PipelineStage, ProgressReporter};
