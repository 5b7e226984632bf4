use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{DEFAULT_COST_PER_CALL_USD, DEFAULT_FALLBACK_AFTER, DEFAULT_MIN_CALL_INTERVAL_MS};
use crate::error::RemoteError;

use super::budget::{RateLimiter, RunBudget};
use super::{Classification, MeteorClassifier, VerificationRequest};

/// Limits applied to remote verification during one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifierSettings {
    /// Minimum spacing between calls, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Escalations allowed per run; unlimited when absent.
    #[serde(default)]
    pub max_escalations: Option<usize>,
    /// Consecutive failures after which the run continues local-only.
    #[serde(default = "default_fallback_after")]
    pub fallback_after: usize,
    /// Extra attempts after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_cost_per_call")]
    pub cost_per_call_usd: f64,
}

fn default_min_interval_ms() -> u64 {
    DEFAULT_MIN_CALL_INTERVAL_MS
}
fn default_fallback_after() -> usize {
    DEFAULT_FALLBACK_AFTER
}
fn default_max_retries() -> usize {
    1
}
fn default_cost_per_call() -> f64 {
    DEFAULT_COST_PER_CALL_USD
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_CALL_INTERVAL_MS,
            max_escalations: None,
            fallback_after: DEFAULT_FALLBACK_AFTER,
            max_retries: default_max_retries(),
            cost_per_call_usd: DEFAULT_COST_PER_CALL_USD,
        }
    }
}

struct VerifierState {
    budget: RunBudget,
    limiter: RateLimiter,
    failure_streak: usize,
    degraded: bool,
}

/// Gatekeeper in front of a [`MeteorClassifier`].
///
/// Owns the run's budget, spacing between calls and the failure streak that
/// switches the run to local-only. One verifier serves exactly one run.
pub struct RemoteVerifier {
    classifier: Arc<dyn MeteorClassifier>,
    settings: VerifierSettings,
    state: Mutex<VerifierState>,
}

impl RemoteVerifier {
    pub fn new(classifier: Arc<dyn MeteorClassifier>, settings: VerifierSettings) -> Self {
        let state = VerifierState {
            budget: RunBudget::new(settings.max_escalations, settings.cost_per_call_usd),
            limiter: RateLimiter::new(Duration::from_millis(settings.min_interval_ms)),
            failure_streak: 0,
            degraded: false,
        };
        Self {
            classifier,
            settings,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, VerifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Claim one escalation. Counts it in the budget before any call is made;
    /// `false` once the cap is reached or the run has degraded.
    pub fn try_begin(&self) -> bool {
        let mut state = self.state();
        if state.degraded || state.budget.is_exhausted() {
            return false;
        }
        state.budget.escalations += 1;
        true
    }

    /// Claim and run one escalation.
    ///
    /// `None` means the verifier refused the call and the caller keeps its
    /// local decision.
    pub fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Option<Result<Classification, RemoteError>> {
        if !self.try_begin() {
            return None;
        }
        Some(self.call(request))
    }

    /// Run an escalation already claimed with [`RemoteVerifier::try_begin`].
    ///
    /// Transient failures are retried up to `max_retries` times; any other
    /// failure is final.
    pub fn call(&self, request: &VerificationRequest) -> Result<Classification, RemoteError> {
        let mut attempt = 0;
        let outcome = loop {
            let wait = {
                let mut state = self.state();
                state.budget.attempts += 1;
                state.limiter.reserve()
            };
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            match self.classifier.classify(request) {
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    debug!(path = %request.path.display(), attempt, error = %e, "Retrying verification");
                }
                other => break other,
            }
        };

        self.record(&outcome);
        outcome
    }

    fn record(&self, outcome: &Result<Classification, RemoteError>) {
        let mut state = self.state();
        match outcome {
            Ok(c) => {
                state.failure_streak = 0;
                if c.is_meteor {
                    state.budget.confirmed += 1;
                } else {
                    state.budget.refuted += 1;
                }
            }
            Err(e) => {
                state.budget.failed += 1;
                state.failure_streak += 1;
                if !state.degraded && state.failure_streak >= self.settings.fallback_after {
                    state.degraded = true;
                    warn!(
                        failures = state.failure_streak,
                        last_error = %e,
                        "Verification keeps failing, continuing local-only"
                    );
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.state().degraded
    }

    /// Snapshot of the budget so far.
    pub fn budget(&self) -> RunBudget {
        self.state().budget.clone()
    }
}
