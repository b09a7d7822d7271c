use std::fmt;

use serde::Serialize;
use vigil_ir::state::{GlobalState, Trace};

use crate::explore::ExhaustionReason;

/// Outcome of checking one safety property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The property holds in every reachable state.
    Verified,
    /// A reachable state violates the property; the trace is a shortest
    /// path to it.
    Violated { trace: Trace },
    /// The property holds everywhere explored, but a reachable state has no
    /// legal successor.
    Deadlocked { state: GlobalState, trace: Trace },
    /// Exploration stopped early, so nothing was proven.
    StateSpaceExhausted {
        explored: usize,
        reason: ExhaustionReason,
    },
}

impl VerificationResult {
    /// Machine-readable verdict class.
    ///
    /// Depends only on the variant, not on trace content, so two runs on
    /// the same model and options can be compared by it.
    pub fn verdict_class(&self) -> &'static str {
        match self {
            VerificationResult::Verified => "verified",
            VerificationResult::Violated { .. } => "violated",
            VerificationResult::Deadlocked { .. } => "deadlocked",
            VerificationResult::StateSpaceExhausted { .. } => "state_space_exhausted",
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        match self {
            VerificationResult::Violated { trace } | VerificationResult::Deadlocked { trace, .. } => {
                Some(trace)
            }
            _ => None,
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Verified => write!(f, "VERIFIED"),
            VerificationResult::Violated { trace } => {
                write!(f, "VIOLATED (counterexample of {} steps)", trace.steps())
            }
            VerificationResult::Deadlocked { trace, .. } => {
                write!(f, "DEADLOCKED (after {} steps)", trace.steps())
            }
            VerificationResult::StateSpaceExhausted { explored, reason } => {
                write!(f, "STATE SPACE EXHAUSTED ({explored} states, {reason})")
            }
        }
    }
}

/// Verdict for a single named property.
#[derive(Debug, Clone)]
pub struct PropertyVerdict {
    /// The property name from the model.
    pub name: String,
    /// The formula `G` is applied to, as written.
    pub formula: String,
    pub result: VerificationResult,
}

/// Exploration statistics of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub states: usize,
    pub initial_states: usize,
    pub edges: usize,
    pub max_depth: usize,
    pub deadlocks: usize,
    pub workers: usize,
    pub elapsed_ms: u64,
}

/// Combined result of verifying every property of a model.
#[derive(Debug, Clone)]
pub struct MultiPropertyResult {
    /// Per-property verdicts in declaration order.
    pub verdicts: Vec<PropertyVerdict>,
    /// Shortest trace to a deadlock, when deadlock checking found one.
    pub deadlock: Option<Trace>,
    pub stats: RunStats,
}

impl MultiPropertyResult {
    /// True if every property was verified and no deadlock was reported.
    pub fn all_verified(&self) -> bool {
        self.deadlock.is_none()
            && self
                .verdicts
                .iter()
                .all(|v| v.result == VerificationResult::Verified)
    }

    pub fn any_violated(&self) -> bool {
        self.verdicts
            .iter()
            .any(|v| matches!(v.result, VerificationResult::Violated { .. }))
    }

    /// Single verdict class for the whole run; violations dominate.
    pub fn overall_verdict(&self) -> &'static str {
        let has = |class: &str| self.verdicts.iter().any(|v| v.result.verdict_class() == class);
        if self.any_violated() {
            "violated"
        } else if has("state_space_exhausted") {
            "state_space_exhausted"
        } else if self.deadlock.is_some() || has("deadlocked") {
            "deadlocked"
        } else {
            "verified"
        }
    }
}
