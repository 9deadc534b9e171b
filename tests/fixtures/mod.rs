//! Test fixtures for integration testing

use ready_room::config::AppConfig;
use ready_room::dispatch::RecordingSink;
use ready_room::ladder::{Division, Tier};
use ready_room::service::AppState;
use ready_room::types::{ChangeEvent, ChangeKind, PlayerProfile, QueueEntry};
use ready_room::utils::current_timestamp;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A fully wired service with a recording sink
pub struct TestSystem {
    pub state: Arc<AppState>,
    pub sink: Arc<RecordingSink>,
}

impl TestSystem {
    pub async fn start(config: AppConfig) -> Self {
        let sink = Arc::new(RecordingSink::new());
        let state = Arc::new(
            AppState::with_sink(config, sink.clone())
                .await
                .expect("service assembly"),
        );
        state.start().await.expect("service start");
        Self { state, sink }
    }

    pub async fn start_default() -> Self {
        Self::start(AppConfig::default()).await
    }

    /// Seed a profile for each id, with a linked chat account.
    pub fn seed_profiles(&self, ids: &[&str]) {
        for id in ids {
            self.state
                .profile_store()
                .put(test_profile(id))
                .expect("profile seed");
        }
    }

    /// Put each player into the waiting queue.
    pub fn seed_queue(&self, ids: &[&str]) {
        for id in ids {
            let profile = self
                .state
                .profile_store()
                .get(id)
                .expect("profile read")
                .expect("profile missing");
            self.state
                .queue_store()
                .put(QueueEntry::from_profile(&profile, current_timestamp()))
                .expect("queue seed");
        }
    }

    /// Deliver a pending-collection change event and let the listener
    /// drain it.
    pub async fn send_pending(&self, event: ChangeEvent) {
        self.state.pending_feed().send(event).expect("pending feed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    /// Deliver a history-collection change event and let the listener
    /// drain it.
    pub async fn send_history(&self, event: ChangeEvent) {
        self.state.history_feed().send(event).expect("history feed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Default test profile: Ouro III at 80 XP, all notifications on.
pub fn test_profile(player_id: &str) -> PlayerProfile {
    PlayerProfile {
        player_id: player_id.to_string(),
        name: player_id.to_uppercase(),
        tag: format!("#{}", player_id),
        tier: Tier::Ouro,
        division: Division::III,
        xp: 80,
        wins: 0,
        losses: 0,
        mvp_awards: 0,
        primary_role: Some("Mid".to_string()),
        chat_user_id: Some(format!("chat-{}", player_id)),
        notify_ready_check: true,
        notify_result: true,
        cooldown_until: None,
    }
}

/// Pending-match document in the canonical wire shape.
pub fn pending_doc(team_one: &[&str], team_two: &[&str]) -> serde_json::Value {
    let slots = |ids: &[&str]| -> Vec<serde_json::Value> {
        ids.iter()
            .map(|id| {
                json!({
                    "player_id": id,
                    "name": id.to_uppercase(),
                    "role": "Mid",
                })
            })
            .collect()
    };
    json!({
        "status": "readyCheck",
        "teams": [
            {"name": "Time 1", "players": slots(team_one)},
            {"name": "Time 2", "players": slots(team_two)},
        ],
        "created_at": current_timestamp().to_rfc3339(),
    })
}

pub fn added(doc_id: &str, data: serde_json::Value) -> ChangeEvent {
    ChangeEvent {
        doc_id: doc_id.to_string(),
        kind: ChangeKind::Added,
        data: Some(data),
    }
}

pub fn modified(doc_id: &str, data: serde_json::Value) -> ChangeEvent {
    ChangeEvent {
        doc_id: doc_id.to_string(),
        kind: ChangeKind::Modified,
        data: Some(data),
    }
}
