//! Change-feed intake for the watched collections
//!
//! Inbound work arrives as per-document change events with at-least-once
//! delivery and no cross-document ordering. Raw payloads are normalized
//! into canonical documents exactly once here, at the boundary; everything
//! past this module works with typed structs.

pub mod listener;
pub mod normalize;

// Re-export commonly used types
pub use listener::FeedListener;
pub use normalize::{history_match_from_doc, pending_match_from_doc};
