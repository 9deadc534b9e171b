//! Ready Room - Match lifecycle coordination for ranked in-house queues
//!
//! This crate watches pending-match and match-history document collections,
//! drives ready checks through accept/decline/timeout, reconciles the
//! waiting queue, promotes confirmed matches into permanent history, and
//! applies ladder updates exactly once per resolved result.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod history;
pub mod ladder;
pub mod metrics;
pub mod readycheck;
pub mod results;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LifecycleError, Result};
pub use types::*;

// Re-export key components
pub use dispatch::AnnouncementSink;
pub use readycheck::{AcceptOutcome, ReadyCheckMachine};
pub use results::ResultResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
