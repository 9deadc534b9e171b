//! Match history promotion
//!
//! `promote` turns a fully accepted pending match into a permanent history
//! record. The three sides are ordered so a crashed attempt is always
//! retriable: the history put-if-absent first (cheap to detect and redo),
//! the queue drain second (redoable), and the pending-status flip — the
//! exactly-once guard — last.

use crate::error::{LifecycleError, Result};
use crate::store::history::HistoryStore;
use crate::store::pending::PendingMatchStore;
use crate::store::queue::QueueStore;
use crate::types::{HistoryMatch, MatchId, PendingMatch, ReadyCheckStatus, UNRESOLVED_WINNER};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a promotion attempt
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    /// Id of the history record (equal to the pending match id)
    pub history_id: MatchId,
    /// Whether this call performed the `open → confirmed` transition.
    /// False means another path already confirmed the match and the caller
    /// must not repeat confirmation side effects.
    pub newly_promoted: bool,
}

/// Promotes confirmed matches into the history collection
pub struct HistoryPromoter {
    history: Arc<dyn HistoryStore>,
    queue: Arc<dyn QueueStore>,
    pending: Arc<dyn PendingMatchStore>,
}

impl HistoryPromoter {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        queue: Arc<dyn QueueStore>,
        pending: Arc<dyn PendingMatchStore>,
    ) -> Self {
        Self {
            history,
            queue,
            pending,
        }
    }

    /// Promote a fully accepted pending match.
    pub fn promote(&self, pending: &PendingMatch) -> Result<PromotionOutcome> {
        if !pending.all_accepted() {
            return Err(LifecycleError::InternalError {
                message: format!(
                    "promotion requested for match {} before full acceptance",
                    pending.id
                ),
            }
            .into());
        }

        let record = HistoryMatch {
            id: pending.id.clone(),
            teams: pending.teams.clone(),
            winner: UNRESOLVED_WINNER.to_string(),
            team_mvps: [None, None],
            proof_url: None,
            created_at: current_timestamp(),
        };

        let created = self.history.create_if_absent(record)?;
        if !created {
            debug!(
                "History record for match {} already exists, continuing promotion",
                pending.id
            );
        }

        let drained = self.queue.remove_many(&pending.participants)?;
        if drained > 0 {
            debug!(
                "Drained {} queue entries while promoting match {}",
                drained, pending.id
            );
        }

        let newly_promoted = self.pending.transition(
            &pending.id,
            ReadyCheckStatus::Open,
            ReadyCheckStatus::Confirmed,
            Some(pending.id.clone()),
        )?;

        if newly_promoted {
            info!("Match {} confirmed and promoted to history", pending.id);
        } else {
            debug!(
                "Match {} was already confirmed by a concurrent signal",
                pending.id
            );
        }

        Ok(PromotionOutcome {
            history_id: pending.id.clone(),
            newly_promoted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{Division, Tier};
    use crate::store::history::InMemoryHistoryStore;
    use crate::store::pending::InMemoryPendingMatchStore;
    use crate::store::queue::InMemoryQueueStore;
    use crate::types::{Acceptance, QueueEntry, RosterSlot, TeamRoster};
    use chrono::Duration;
    use std::collections::HashMap;

    fn accepted_match(id: &str) -> PendingMatch {
        let now = current_timestamp();
        let mut acceptance = HashMap::new();
        acceptance.insert("a".to_string(), Acceptance::Accepted);
        acceptance.insert("b".to_string(), Acceptance::Accepted);

        PendingMatch {
            id: id.to_string(),
            status: ReadyCheckStatus::Open,
            teams: [
                TeamRoster {
                    name: "Time 1".to_string(),
                    players: vec![RosterSlot {
                        player_id: Some("a".to_string()),
                        name: "Alice".to_string(),
                        role: None,
                    }],
                },
                TeamRoster {
                    name: "Time 2".to_string(),
                    players: vec![RosterSlot {
                        player_id: Some("b".to_string()),
                        name: "Bruno".to_string(),
                        role: None,
                    }],
                },
            ],
            participants: vec!["a".to_string(), "b".to_string()],
            acceptance,
            notice_handles: HashMap::new(),
            channel_handle: None,
            created_at: now,
            expires_at: now + Duration::seconds(60),
            history_ref: None,
        }
    }

    fn queue_entry(player_id: &str) -> QueueEntry {
        QueueEntry {
            player_id: player_id.to_string(),
            name: player_id.to_uppercase(),
            tag: String::new(),
            tier: Tier::Ouro,
            division: Division::III,
            primary_role: None,
            chat_user_id: None,
            joined_at: current_timestamp(),
        }
    }

    struct Fixture {
        history: Arc<InMemoryHistoryStore>,
        queue: Arc<InMemoryQueueStore>,
        pending: Arc<InMemoryPendingMatchStore>,
        promoter: HistoryPromoter,
    }

    fn fixture() -> Fixture {
        let history = Arc::new(InMemoryHistoryStore::new());
        let queue = Arc::new(InMemoryQueueStore::new());
        let pending = Arc::new(InMemoryPendingMatchStore::new());
        let promoter = HistoryPromoter::new(history.clone(), queue.clone(), pending.clone());
        Fixture {
            history,
            queue,
            pending,
            promoter,
        }
    }

    #[test]
    fn test_promote_creates_history_and_drains_queue() {
        let fx = fixture();
        let pending = accepted_match("m1");
        fx.pending.create_if_absent(pending.clone()).unwrap();
        fx.queue.put(queue_entry("a")).unwrap();
        fx.queue.put(queue_entry("b")).unwrap();

        let outcome = fx.promoter.promote(&pending).unwrap();
        assert!(outcome.newly_promoted);
        assert_eq!(outcome.history_id, "m1");

        let record = fx.history.get("m1").unwrap().unwrap();
        assert_eq!(record.winner, UNRESOLVED_WINNER);
        assert_eq!(record.teams[0].name, "Time 1");

        assert_eq!(fx.queue.len().unwrap(), 0);

        let stored = fx.pending.get("m1").unwrap().unwrap();
        assert_eq!(stored.status, ReadyCheckStatus::Confirmed);
        assert_eq!(stored.history_ref.as_deref(), Some("m1"));
    }

    #[test]
    fn test_promote_twice_is_exactly_once() {
        let fx = fixture();
        let pending = accepted_match("m1");
        fx.pending.create_if_absent(pending.clone()).unwrap();

        let first = fx.promoter.promote(&pending).unwrap();
        let second = fx.promoter.promote(&pending).unwrap();

        assert!(first.newly_promoted);
        assert!(!second.newly_promoted);
        assert!(fx.history.get("m1").unwrap().is_some());
    }

    #[test]
    fn test_promote_retries_after_partial_failure() {
        let fx = fixture();
        let pending = accepted_match("m1");
        fx.pending.create_if_absent(pending.clone()).unwrap();

        // Simulate a crash after the history write: the record exists but
        // the status flip never happened.
        fx.history
            .create_if_absent(HistoryMatch {
                id: "m1".to_string(),
                teams: pending.teams.clone(),
                winner: UNRESOLVED_WINNER.to_string(),
                team_mvps: [None, None],
                proof_url: None,
                created_at: current_timestamp(),
            })
            .unwrap();

        let outcome = fx.promoter.promote(&pending).unwrap();
        assert!(outcome.newly_promoted);
        assert_eq!(
            fx.pending.get("m1").unwrap().unwrap().status,
            ReadyCheckStatus::Confirmed
        );
    }

    #[test]
    fn test_promote_rejects_incomplete_acceptance() {
        let fx = fixture();
        let mut pending = accepted_match("m1");
        pending.acceptance.remove("b");

        assert!(fx.promoter.promote(&pending).is_err());
    }
}
