//! JSON-ready verification reports.

use serde::Serialize;
use vigil_ir::CompositeModel;

use crate::counterexample::{trace_report, TraceReport, TraceSnapshot};
use crate::explore::ExhaustionReason;
use crate::result::{MultiPropertyResult, RunStats, VerificationResult};

/// JSON schema version of [`VerificationReport`].
pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct PropertyReport {
    pub name: String,
    pub formula: String,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadlock_state: Option<TraceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhaustion: Option<ExhaustionReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_fingerprint: Option<String>,
    pub overall: &'static str,
    pub properties: Vec<PropertyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadlock: Option<TraceReport>,
    pub stats: RunStats,
}

impl VerificationReport {
    pub fn new(
        model: &CompositeModel,
        result: &MultiPropertyResult,
        model_fingerprint: Option<String>,
    ) -> Self {
        let properties = result
            .verdicts
            .iter()
            .map(|verdict| {
                let (deadlock_state, exhaustion) = match &verdict.result {
                    VerificationResult::Deadlocked { state, .. } => {
                        (Some(model.decode(state)), None)
                    }
                    VerificationResult::StateSpaceExhausted { reason, .. } => (None, Some(*reason)),
                    _ => (None, None),
                };
                PropertyReport {
                    name: verdict.name.clone(),
                    formula: verdict.formula.clone(),
                    verdict: verdict.result.verdict_class(),
                    trace: verdict.result.trace().map(|t| trace_report(model, t)),
                    deadlock_state,
                    exhaustion,
                }
            })
            .collect();
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            model_fingerprint,
            overall: result.overall_verdict(),
            properties,
            deadlock: result.deadlock.as_ref().map(|t| trace_report(model, t)),
            stats: result.stats.clone(),
        }
    }
}
