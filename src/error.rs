//! Error types for the match lifecycle service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific lifecycle scenarios
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Match already decided: {match_id}")]
    MatchAlreadyDecided { match_id: String },

    #[error("Player {player_id} is not a participant of match {match_id}")]
    NotAParticipant {
        match_id: String,
        player_id: String,
    },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Winner '{winner}' does not match any roster of match {match_id}")]
    WinnerMismatch { match_id: String, winner: String },

    #[error("Store operation failed: {message}")]
    StoreUnavailable { message: String },

    #[error("Announcement dispatch failed: {message}")]
    DispatchFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl LifecycleError {
    /// The reply shown to the player who pressed the button.
    ///
    /// Every player action resolves to exactly one visible response; internal
    /// failures collapse to the generic message rather than silence.
    pub fn user_message(&self) -> &'static str {
        match self {
            LifecycleError::MatchNotFound { .. } | LifecycleError::MatchAlreadyDecided { .. } => {
                "This match no longer exists or has already expired."
            }
            LifecycleError::NotAParticipant { .. } => "This ready check is not yours to answer.",
            _ => "Something went wrong, please try again.",
        }
    }
}
