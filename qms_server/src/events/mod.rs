//! Domain events emitted on state transitions.
//!
//! Events are published to the structured log; the database row stays the
//! source of truth.

pub mod management_review;
pub mod nonconformance;
