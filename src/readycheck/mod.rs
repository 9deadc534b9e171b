//! Ready-check lifecycle for proposed matches
//!
//! This module owns the core state machine: a proposed match moves from
//! `open` through accept/decline/timeout to exactly one terminal state,
//! reconciling the queue on every transition.

pub mod machine;
pub mod timers;

// Re-export commonly used types
pub use machine::{AcceptOutcome, MachineStats, ReadyCheckMachine};
pub use timers::ExpiryScheduler;
