#![doc = include_str!("../README.md")]

//! Vigil model description and composite builder.
//!
//! This crate defines the module/instance description language, the
//! Composite Builder that flattens an instance tree into a single product
//! automaton, and the state representation shared with the engine.

pub mod compiled;
pub mod composite;
pub mod domain;
pub mod error;
pub mod expr;
pub mod library;
pub mod module;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod state;

pub use composite::{build, CompositeModel};
pub use error::BuildError;
