use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Escalation accounting for one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunBudget {
    /// Escalations started; counted before the call goes out.
    pub escalations: usize,
    /// Calls sent, retries included.
    pub attempts: usize,
    pub confirmed: usize,
    pub refuted: usize,
    pub failed: usize,
    /// Escalations allowed per run, unlimited when `None`.
    pub max_escalations: Option<usize>,
    /// Estimated cost of one call, in USD.
    pub cost_per_call: f64,
}

impl RunBudget {
    pub fn new(max_escalations: Option<usize>, cost_per_call: f64) -> Self {
        Self {
            max_escalations,
            cost_per_call,
            ..Default::default()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_escalations
            .is_some_and(|cap| self.escalations >= cap)
    }

    pub fn estimated_cost(&self) -> f64 {
        self.attempts as f64 * self.cost_per_call
    }
}

/// Spaces calls at least `min_interval` apart.
///
/// `reserve` hands out the next free slot and returns how long the caller has
/// to wait for it, so the wait itself can happen outside any lock.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: None,
        }
    }

    pub fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + self.min_interval);
        slot - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_spaces_reservations() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100));
        let now = Instant::now();
        assert_eq!(limiter.reserve_at(now), Duration::ZERO);
        assert_eq!(limiter.reserve_at(now), Duration::from_millis(100));
        assert_eq!(limiter.reserve_at(now), Duration::from_millis(200));
        let later = now + Duration::from_secs(1);
        assert_eq!(limiter.reserve_at(later), Duration::ZERO);
    }

    #[test]
    fn test_budget_cap() {
        let mut budget = RunBudget::new(Some(2), 0.005);
        assert!(!budget.is_exhausted());
        budget.escalations = 2;
        assert!(budget.is_exhausted());
        budget.attempts = 3;
        assert!((budget.estimated_cost() - 0.015).abs() < 1e-12);
    }
}
