//! Utility functions for the match lifecycle service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique match id
pub fn generate_match_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new unique message handle
pub fn generate_message_handle() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Normalize a team or player name for comparison.
///
/// Winner strings and roster names are compared case-insensitively with
/// surrounding and internal runs of whitespace collapsed, since reporters
/// type them by hand.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
