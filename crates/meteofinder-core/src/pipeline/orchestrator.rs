use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::decision::{decide, ImageState, Mode, Verdict};
use crate::error::{MeteorError, Result};
use crate::report::{ImageVerdict, ResultAggregator, RunReport, StageFailure};
use crate::scoring::Candidate;
use crate::verify::{MeteorClassifier, RemoteVerifier, RunBudget, VerificationRequest};

use super::analyze::{analyze_image, LocalAnalysis};
use super::config::RunConfig;
use super::types::{CancelToken, PipelineStage, ProgressReporter};

enum LocalOutcome {
    Skipped,
    Failed(StageFailure),
    Done(LocalAnalysis),
}

struct Escalation {
    index: usize,
    path: PathBuf,
    candidate: Candidate,
    analysis_scale: f32,
}

/// Scans a list of images and decides, per image, whether it shows a meteor.
///
/// Every call to [`MeteorPipeline::run`] starts from a fresh budget and
/// failure streak.
pub struct MeteorPipeline {
    config: RunConfig,
    classifier: Option<Arc<dyn MeteorClassifier>>,
}

impl MeteorPipeline {
    /// Validates the configuration up front.
    pub fn new(config: RunConfig, classifier: Option<Arc<dyn MeteorClassifier>>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The mode the run will actually use: hybrid needs a classifier.
    pub fn effective_mode(&self) -> Mode {
        match (self.config.mode, &self.classifier) {
            (Mode::Hybrid, None) => Mode::LocalOnly,
            (mode, _) => mode,
        }
    }

    pub fn run(
        &self,
        paths: &[PathBuf],
        reporter: Arc<dyn ProgressReporter>,
        cancel: &CancelToken,
    ) -> Result<RunReport> {
        let mode = self.effective_mode();
        let level = self.config.level;
        if mode != self.config.mode {
            info!(requested = %self.config.mode, effective = %mode, "No classifier configured");
        }
        info!(images = paths.len(), %mode, %level, "Starting meteor scan");

        reporter.begin_stage(PipelineStage::Scoring, Some(paths.len()));
        let detector = &self.config.detector;
        let local: Vec<(usize, LocalOutcome)> = paths
            .par_iter()
            .enumerate()
            .map(|(index, path)| {
                let outcome = if cancel.is_cancelled() {
                    LocalOutcome::Skipped
                } else {
                    match analyze_image(path, detector, level) {
                        Ok(analysis) => LocalOutcome::Done(analysis),
                        Err(failure) => {
                            warn!(path = %path.display(), stage = %failure.stage, cause = %failure.cause, "Image analysis failed");
                            LocalOutcome::Failed(failure)
                        }
                    }
                };
                reporter.advance(1);
                (index, outcome)
            })
            .collect();
        reporter.finish_stage();

        let mut aggregator = ResultAggregator::new();
        let mut escalations = Vec::new();
        for (index, outcome) in local {
            let path = paths[index].clone();
            match outcome {
                LocalOutcome::Skipped => aggregator.skip(index, path),
                LocalOutcome::Failed(failure) => {
                    let detail = match failure.stage {
                        PipelineStage::Loading => "unreadable",
                        _ => "analysis failed",
                    };
                    aggregator.push(
                        ImageVerdict::new(index, path, Verdict::Rejected)
                            .with_detail(detail)
                            .with_failure(failure.stage, failure.cause),
                    );
                }
                LocalOutcome::Done(analysis) => {
                    let state = decide(analysis.candidate.as_ref(), mode);
                    match (state, analysis.candidate) {
                        (ImageState::Pending, Some(candidate)) => escalations.push(Escalation {
                            index,
                            path,
                            candidate,
                            analysis_scale: analysis.analysis_scale,
                        }),
                        (state, candidate) => {
                            let verdict = ImageVerdict::new(
                                index,
                                path,
                                state.verdict().unwrap_or(Verdict::Rejected),
                            );
                            aggregator.push(match candidate {
                                Some(c) => {
                                    let length = c.segment.length / analysis.analysis_scale;
                                    verdict
                                        .with_score(c.score)
                                        .with_detail(format!("streak {length:.0} px"))
                                }
                                None => verdict.with_detail("no qualifying streak"),
                            });
                        }
                    }
                }
            }
        }

        let verifier = match (&self.classifier, mode) {
            (Some(classifier), Mode::Hybrid) => Some(RemoteVerifier::new(
                Arc::clone(classifier),
                self.config.remote.limits.clone(),
            )),
            _ => None,
        };

        match &verifier {
            Some(verifier) if !escalations.is_empty() => {
                self.escalate(verifier, escalations, &mut aggregator, &reporter, cancel)?;
            }
            Some(_) => {}
            None => {
                for job in escalations {
                    aggregator.push(refused(&job));
                }
            }
        }

        reporter.begin_stage(PipelineStage::Aggregating, None);
        let (budget, degraded) = match &verifier {
            Some(v) => (v.budget(), v.is_degraded()),
            None => (
                RunBudget::new(
                    self.config.remote.limits.max_escalations,
                    self.config.remote.limits.cost_per_call_usd,
                ),
                false,
            ),
        };
        let report = aggregator.finish(mode, level, budget, degraded);
        reporter.finish_stage();

        info!(
            accepted = report.summary.accepted(),
            rejected = report.summary.rejected,
            failed = report.summary.escalation_failed,
            skipped = report.summary.skipped,
            escalations = report.summary.escalations,
            degraded,
            "Scan complete"
        );
        Ok(report)
    }

    fn escalate(
        &self,
        verifier: &RemoteVerifier,
        escalations: Vec<Escalation>,
        aggregator: &mut ResultAggregator,
        reporter: &Arc<dyn ProgressReporter>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.remote.max_concurrency)
            .build()
            .map_err(|e| MeteorError::Pipeline(format!("cannot start escalation pool: {e}")))?;

        info!(
            candidates = escalations.len(),
            classifier = verifier.classifier_name(),
            concurrency = self.config.remote.max_concurrency,
            "Verifying candidates"
        );
        reporter.begin_stage(PipelineStage::Verifying, Some(escalations.len()));

        let results: Vec<(Escalation, Option<ImageVerdict>)> = pool.install(|| {
            escalations
                .into_par_iter()
                .map(|job| {
                    if cancel.is_cancelled() {
                        return (job, None);
                    }
                    let verdict = verify_one(verifier, &job);
                    reporter.advance(1);
                    (job, Some(verdict))
                })
                .collect()
        });
        reporter.finish_stage();

        for (job, verdict) in results {
            match verdict {
                Some(v) => aggregator.push(v),
                None => aggregator.skip(job.index, job.path),
            }
        }
        Ok(())
    }
}

fn base_verdict(job: &Escalation, state: ImageState) -> ImageVerdict {
    ImageVerdict::new(
        job.index,
        job.path.clone(),
        state.verdict().unwrap_or(Verdict::EscalationFailed),
    )
    .with_score(job.candidate.score)
}

/// A hybrid candidate the verifier would not take keeps its local acceptance.
fn refused(job: &Escalation) -> ImageVerdict {
    base_verdict(job, ImageState::Pending.with_remote_permit(false))
        .with_detail("accepted locally (verification unavailable)")
}

fn verify_one(verifier: &RemoteVerifier, job: &Escalation) -> ImageVerdict {
    let state = ImageState::Pending.with_remote_permit(verifier.try_begin());
    if state != ImageState::Escalated {
        debug!(path = %job.path.display(), "Verification refused, keeping local decision");
        return refused(job);
    }

    let request = VerificationRequest {
        path: job.path.clone(),
        segment: Some(job.candidate.segment.clone()),
        analysis_scale: job.analysis_scale,
        local_score: job.candidate.score,
    };
    let outcome = verifier.call(&request);
    let verdict = base_verdict(job, state.after_verification(&outcome));
    match outcome {
        Ok(c) => {
            debug!(path = %job.path.display(), is_meteor = c.is_meteor, confidence = %c.confidence, "Verified");
            verdict.with_detail(format!("{} confidence: {}", c.confidence, c.description))
        }
        Err(e) => {
            warn!(path = %job.path.display(), error = %e, "Verification failed");
            verdict
                .with_detail(e.to_string())
                .with_failure(PipelineStage::Verifying, e.to_string())
        }
    }
}
