//! Outbound announcement dispatch for the match lifecycle service
//!
//! The chat platform is an external sink: the lifecycle produces render
//! requests and deletion requests, and rendering/formatting detail lives on
//! the other side of the trait.

pub mod sink;

// Re-export commonly used types
pub use sink::{AnnouncementSink, DispatchedMessage, LoggingSink, RecordingSink};
