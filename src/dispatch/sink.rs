//! Announcement sink trait and test implementations
//!
//! Every method is best effort from the lifecycle's point of view: the
//! document store is the source of truth, so callers log dispatch failures
//! and carry on with the state transition.

use crate::error::Result;
use crate::types::{MatchId, MessageHandle, ReadyCheckView, ResultSummary, WinnerView};
use crate::utils::generate_message_handle;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for sending, editing and deleting outward announcements
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Post the shared-channel ready-check announcement
    async fn post_ready_check(&self, match_id: &MatchId, view: ReadyCheckView)
        -> Result<MessageHandle>;

    /// Re-render an existing ready-check announcement (updated check marks)
    async fn update_ready_check(&self, handle: &MessageHandle, view: ReadyCheckView) -> Result<()>;

    /// Send a direct notification to a linked player
    async fn notify_player(&self, chat_user_id: &str, text: String) -> Result<MessageHandle>;

    /// Delete a previously sent message
    async fn delete_message(&self, handle: &MessageHandle) -> Result<()>;

    /// Post the winner announcement to the shared channel
    async fn post_winner(&self, view: WinnerView) -> Result<MessageHandle>;

    /// Send a per-player direct result summary
    async fn send_result_summary(&self, chat_user_id: &str, summary: ResultSummary) -> Result<()>;
}

/// Sink that logs every dispatch instead of reaching a chat platform.
///
/// Stands in when no chat adapter is wired up (local runs, the scenario
/// tester); handles are fresh ids so deletion requests stay well-formed.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl LoggingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnnouncementSink for LoggingSink {
    async fn post_ready_check(
        &self,
        match_id: &MatchId,
        view: ReadyCheckView,
    ) -> Result<MessageHandle> {
        info!(
            "[announce] ready check for match {} ({}s):\n{}",
            match_id,
            view.seconds_remaining,
            view.player_lines.join("\n")
        );
        Ok(generate_message_handle())
    }

    async fn update_ready_check(&self, handle: &MessageHandle, view: ReadyCheckView) -> Result<()> {
        info!(
            "[announce] update {}:\n{}",
            handle,
            view.player_lines.join("\n")
        );
        Ok(())
    }

    async fn notify_player(&self, chat_user_id: &str, text: String) -> Result<MessageHandle> {
        info!("[dm] to {}: {}", chat_user_id, text);
        Ok(generate_message_handle())
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()> {
        info!("[announce] delete {}", handle);
        Ok(())
    }

    async fn post_winner(&self, view: WinnerView) -> Result<MessageHandle> {
        info!(
            "[announce] winner {} | Time 1: {} | Time 2: {}",
            view.winner,
            view.team_one.join(", "),
            view.team_two.join(", ")
        );
        Ok(generate_message_handle())
    }

    async fn send_result_summary(&self, chat_user_id: &str, summary: ResultSummary) -> Result<()> {
        info!(
            "[dm] result to {}: {:?}, {} -> {} XP, now {} {}{}",
            chat_user_id,
            summary.outcome,
            summary.xp_before,
            summary.xp_after,
            summary.tier,
            summary.division,
            if summary.is_mvp { " (MVP)" } else { "" }
        );
        Ok(())
    }
}

/// What a sink was asked to do, captured for assertions
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchedMessage {
    ReadyCheckPosted { match_id: MatchId },
    ReadyCheckUpdated { handle: MessageHandle },
    PlayerNotified { chat_user_id: String },
    MessageDeleted { handle: MessageHandle },
    WinnerPosted { winner: String },
    ResultSummarySent { chat_user_id: String, is_mvp: bool },
}

/// Recording sink that captures dispatch calls for testing
#[derive(Debug, Default)]
pub struct RecordingSink {
    dispatched: Mutex<Vec<DispatchedMessage>>,
    counter: Mutex<u64>,
    /// When set, every call fails; exercises the swallow-and-log paths.
    pub fail_all: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Get all dispatched messages (for testing)
    pub fn get_dispatched(&self) -> Vec<DispatchedMessage> {
        self.dispatched
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Count dispatches matching a predicate
    pub fn count_matching(&self, predicate: impl Fn(&DispatchedMessage) -> bool) -> usize {
        self.get_dispatched().iter().filter(|m| predicate(m)).count()
    }

    fn record(&self, message: DispatchedMessage) -> Result<()> {
        if self.fail_all {
            anyhow::bail!("sink configured to fail");
        }
        if let Ok(mut messages) = self.dispatched.lock() {
            messages.push(message);
        }
        Ok(())
    }

    fn next_handle(&self, prefix: &str) -> MessageHandle {
        let mut counter = self.counter.lock().expect("counter lock");
        *counter += 1;
        format!("{}-{}", prefix, counter)
    }
}

#[async_trait]
impl AnnouncementSink for RecordingSink {
    async fn post_ready_check(
        &self,
        match_id: &MatchId,
        _view: ReadyCheckView,
    ) -> Result<MessageHandle> {
        self.record(DispatchedMessage::ReadyCheckPosted {
            match_id: match_id.clone(),
        })?;
        Ok(self.next_handle("ready"))
    }

    async fn update_ready_check(&self, handle: &MessageHandle, _view: ReadyCheckView) -> Result<()> {
        self.record(DispatchedMessage::ReadyCheckUpdated {
            handle: handle.clone(),
        })
    }

    async fn notify_player(&self, chat_user_id: &str, _text: String) -> Result<MessageHandle> {
        self.record(DispatchedMessage::PlayerNotified {
            chat_user_id: chat_user_id.to_string(),
        })?;
        Ok(self.next_handle("dm"))
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()> {
        self.record(DispatchedMessage::MessageDeleted {
            handle: handle.clone(),
        })
    }

    async fn post_winner(&self, view: WinnerView) -> Result<MessageHandle> {
        self.record(DispatchedMessage::WinnerPosted {
            winner: view.winner,
        })?;
        Ok(self.next_handle("winner"))
    }

    async fn send_result_summary(&self, chat_user_id: &str, summary: ResultSummary) -> Result<()> {
        self.record(DispatchedMessage::ResultSummarySent {
            chat_user_id: chat_user_id.to_string(),
            is_mvp: summary.is_mvp,
        })
    }
}
