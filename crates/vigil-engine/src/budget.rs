//! Cooperative stopping conditions for exploration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::explore::{CheckOptions, ExhaustionReason};

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

pub(crate) fn deadline_from_timeout_secs(timeout_secs: u64) -> Option<Instant> {
    if timeout_secs == 0 {
        None
    } else {
        Instant::now().checked_add(Duration::from_secs(timeout_secs))
    }
}

/// Node budget, deadline and stop flag, checked between expansions.
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    max_states: usize,
    timeout_secs: u64,
    deadline: Option<Instant>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl Budget {
    pub(crate) fn start(options: &CheckOptions) -> Self {
        Self {
            max_states: options.max_states,
            timeout_secs: options.timeout_secs,
            deadline: deadline_from_timeout_secs(options.timeout_secs),
            stop_flag: options.stop_flag.clone(),
        }
    }

    /// Why exploration must stop with `discovered` states recorded, if it must.
    pub(crate) fn exceeded(&self, discovered: usize) -> Option<ExhaustionReason> {
        if self.max_states > 0 && discovered > self.max_states {
            return Some(ExhaustionReason::NodeBudget {
                limit: self.max_states,
            });
        }
        if deadline_exceeded(self.deadline) {
            return Some(ExhaustionReason::Deadline {
                timeout_secs: self.timeout_secs,
            });
        }
        if self
            .stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(ExhaustionReason::Cancelled);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_exceeded_none_returns_false() {
        assert!(!deadline_exceeded(None));
    }

    #[test]
    fn deadline_exceeded_past_returns_true() {
        let past = Instant::now() - Duration::from_secs(1);
        assert!(deadline_exceeded(Some(past)));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        assert!(deadline_from_timeout_secs(0).is_none());
        assert!(deadline_from_timeout_secs(5).is_some());
    }

    #[test]
    fn node_budget_allows_exactly_the_limit() {
        let budget = Budget::start(&CheckOptions {
            max_states: 4,
            ..CheckOptions::default()
        });
        assert_eq!(budget.exceeded(4), None);
        assert_eq!(
            budget.exceeded(5),
            Some(ExhaustionReason::NodeBudget { limit: 4 })
        );
    }

    #[test]
    fn raised_stop_flag_cancels() {
        let flag = Arc::new(AtomicBool::new(false));
        let budget = Budget::start(&CheckOptions {
            stop_flag: Some(flag.clone()),
            ..CheckOptions::default()
        });
        assert_eq!(budget.exceeded(1), None);
        flag.store(true, Ordering::Relaxed);
        assert_eq!(budget.exceeded(1), Some(ExhaustionReason::Cancelled));
    }
}
