//! anno-core — domain logic for the anno annotation-review tracker.
//!
//! This crate owns the tracking store and state machine, item locking,
//! role-based visibility, the two-tier approval chain, completion metrics,
//! and payment accounting.

pub mod config;
pub mod core;
pub mod store;
pub mod syllable;
