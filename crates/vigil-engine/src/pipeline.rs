//! End-to-end verification: build, explore, check.

use std::time::Instant;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use vigil_ir::module::Model;
use vigil_ir::{BuildError, CompositeModel};

use crate::check::PropertyChecker;
use crate::explore::{CheckOptions, ExploreError, ReachabilityEngine};
use crate::result::{MultiPropertyResult, PropertyVerdict, RunStats, VerificationResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Build `model` and verify all of its properties.
pub fn verify(model: &Model, options: &CheckOptions) -> Result<MultiPropertyResult, PipelineError> {
    info!(root = %model.root.name, "Building composite model...");
    let composite = vigil_ir::build(model)?;
    Ok(verify_composite(&composite, options))
}

/// Explore `composite` and check every property against the reachable set.
///
/// Exhaustion is not an error here: every property is reported as
/// `StateSpaceExhausted` so the caller can retry with a larger budget.
pub fn verify_composite(composite: &CompositeModel, options: &CheckOptions) -> MultiPropertyResult {
    let started = Instant::now();
    let engine = ReachabilityEngine::new(composite, options.clone());
    let workers = if options.workers == 0 {
        rayon::current_num_threads()
    } else {
        options.workers
    };

    match engine.explore() {
        Ok(graph) => {
            let checker = PropertyChecker::new(composite, &graph);
            let verdicts = checker.check_all(options.check_deadlock);
            let deadlock = if options.check_deadlock {
                checker.first_deadlock().map(|id| graph.trace_to(id))
            } else {
                None
            };
            let stats = RunStats {
                states: graph.len(),
                initial_states: graph.initial().len(),
                edges: graph.edge_count(),
                max_depth: graph.max_depth(),
                deadlocks: graph.deadlocks().len(),
                workers,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            for verdict in &verdicts {
                info!(property = %verdict.name, verdict = verdict.result.verdict_class(), "Property checked");
            }
            MultiPropertyResult {
                verdicts,
                deadlock,
                stats,
            }
        }
        Err(ExploreError::StateSpaceExhausted { explored, reason }) => {
            warn!(explored, %reason, "No property can be decided");
            let verdicts = composite
                .properties()
                .iter()
                .map(|property| PropertyVerdict {
                    name: property.name.clone(),
                    formula: property.text.clone(),
                    result: VerificationResult::StateSpaceExhausted { explored, reason },
                })
                .collect();
            MultiPropertyResult {
                verdicts,
                deadlock: None,
                stats: RunStats {
                    states: explored,
                    workers,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    ..RunStats::default()
                },
            }
        }
    }
}

pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// SHA-256 of the model's canonical JSON encoding.
pub fn model_fingerprint(model: &Model) -> Result<String, PipelineError> {
    let bytes = serde_json::to_vec(model)?;
    Ok(sha256_hex_bytes(&bytes))
}
