#![doc = include_str!("../README.md")]

//! Vigil explicit-state engine.
//!
//! This crate computes initial states and constrained successors of a
//! composite model, explores the reachable state space breadth-first
//! (sequentially or on a rayon pool), checks safety properties with
//! shortest counterexamples, and renders results as text or JSON.

mod budget;
pub mod check;
pub mod counterexample;
pub mod explore;
pub mod initial;
pub mod pipeline;
pub mod product;
pub mod report;
pub mod result;
pub mod simulate;
pub mod transition;

pub use explore::{CheckOptions, ExhaustionReason, ExploreError, ReachabilityEngine, StateGraph};
pub use pipeline::{verify, verify_composite, PipelineError};
pub use result::{MultiPropertyResult, PropertyVerdict, VerificationResult};
