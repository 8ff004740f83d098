//! Test module for end-to-end behaviour of the tactical core.
//!
//! - **Integration tests**: movement, interception, sieges and events through
//!   the full `Simulation`
//! - **Determinism tests**: identical inputs give identical event streams
//! - **Property tests**: path correctness, conservation and combat invariants
//!
//! # Test Structure
//!
//! - `integration.rs`: scenario tests of the simulation
//! - `determinism.rs`: replay comparisons
//! - `properties.rs`: proptest suites
//! - `helpers.rs`: setup utilities and factory functions

mod determinism;
mod helpers;
mod properties;

// Re-export for convenience
pub use helpers::*;
