//! Result resolution and rating updates
//!
//! Fires when a history record's winner field is observed to hold a real
//! team name. The notification ledger makes the whole pass single-shot:
//! the entry is checked first and recorded last, and all store operations
//! between them are synchronous in-process calls, so same-process handlers
//! cannot interleave inside the pass. A crash between the profile writes
//! and the ledger record re-applies counters on retry; that window is the
//! documented weak point of the sequential design.

use crate::dispatch::AnnouncementSink;
use crate::error::{LifecycleError, Result};
use crate::ladder::{apply_delta, LadderRank};
use crate::metrics::MetricsCollector;
use crate::store::ledger::{LedgerKind, NotificationLedger};
use crate::store::profile::ProfileStore;
use crate::store::queue::QueueStore;
use crate::types::{
    ChangeEvent, ChangeKind, HistoryMatch, MatchOutcome, PlayerProfile, ResultSummary, RosterSlot,
    WinnerView,
};
use crate::utils::normalize_name;
use crate::feed::normalize::history_match_from_doc;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about result resolution
#[derive(Debug, Clone, Default)]
pub struct ResolverStats {
    /// Results applied
    pub results_resolved: u64,
    /// Redelivered results skipped by the ledger guard
    pub duplicates_skipped: u64,
    /// Profiles updated across all results
    pub profiles_updated: u64,
    /// Roster slots resolved through the name fallback
    pub name_fallback_lookups: u64,
    /// MVP awards granted
    pub mvp_awards: u64,
}

/// Applies resolved winners to profiles, queue and announcements
pub struct ResultResolver {
    profiles: Arc<dyn ProfileStore>,
    queue: Arc<dyn QueueStore>,
    ledger: Arc<dyn NotificationLedger>,
    sink: Arc<dyn AnnouncementSink>,
    stats: RwLock<ResolverStats>,
    metrics: Arc<MetricsCollector>,
}

impl ResultResolver {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        queue: Arc<dyn QueueStore>,
        ledger: Arc<dyn NotificationLedger>,
        sink: Arc<dyn AnnouncementSink>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            profiles,
            queue,
            ledger,
            sink,
            stats: RwLock::new(ResolverStats::default()),
            metrics,
        }
    }

    /// Apply one change-feed event for the history collection.
    pub async fn apply_history_event(&self, event: ChangeEvent) -> Result<()> {
        if event.kind == ChangeKind::Removed {
            return Ok(());
        }
        let Some(data) = event.data.as_ref() else {
            warn!(
                "History event for {} carried no document, ignoring",
                event.doc_id
            );
            return Ok(());
        };
        let record = history_match_from_doc(&event.doc_id, data)?;
        if !record.winner_is_resolved() {
            debug!("History record {} has no winner yet", record.id);
            return Ok(());
        }
        self.resolve(&record).await
    }

    /// Apply a resolved winner exactly once.
    pub async fn resolve(&self, record: &HistoryMatch) -> Result<()> {
        if self.ledger.contains(LedgerKind::Result, &record.id)? {
            debug!("Result for match {} already applied", record.id);
            {
                let mut stats = self.stats_mut()?;
                stats.duplicates_skipped += 1;
            }
            self.metrics.results().duplicate_results_skipped_total.inc();
            return Ok(());
        }

        let Some(winner_idx) = self.winning_team(record) else {
            // Left unrecorded on purpose: a corrective write to the
            // document retriggers resolution.
            warn!(
                "{}",
                LifecycleError::WinnerMismatch {
                    match_id: record.id.clone(),
                    winner: record.winner.clone(),
                }
            );
            return Ok(());
        };

        info!(
            "Resolving match {}: winner '{}'",
            record.id, record.winner
        );

        let mvp_names: Vec<String> = record
            .team_mvps
            .iter()
            .flatten()
            .map(|name| normalize_name(name))
            .collect();

        let mut summaries: Vec<(String, ResultSummary)> = Vec::new();
        for (team_idx, team) in record.teams.iter().enumerate() {
            let won = team_idx == winner_idx;
            for slot in &team.players {
                let Some(mut profile) = self.resolve_profile(slot)? else {
                    warn!(
                        "No profile for roster entry '{}' of match {}, skipping",
                        slot.name, record.id
                    );
                    continue;
                };

                let before = profile.rank();
                let after = apply_delta(before, won);
                let is_mvp = mvp_names.contains(&normalize_name(&slot.name))
                    || mvp_names.contains(&normalize_name(&profile.name));

                profile.set_rank(after);
                if won {
                    profile.wins += 1;
                } else {
                    profile.losses += 1;
                }
                if is_mvp {
                    profile.mvp_awards += 1;
                }
                self.profiles.put(profile.clone())?;

                self.record_rank_change(&before, &after);
                if is_mvp {
                    self.metrics.results().mvp_awards_total.inc();
                }
                {
                    let mut stats = self.stats_mut()?;
                    stats.profiles_updated += 1;
                    if is_mvp {
                        stats.mvp_awards += 1;
                    }
                }

                if profile.notify_result {
                    if let Some(chat_id) = &profile.chat_user_id {
                        summaries.push((
                            chat_id.clone(),
                            ResultSummary {
                                outcome: if won {
                                    MatchOutcome::Victory
                                } else {
                                    MatchOutcome::Defeat
                                },
                                xp_before: before.xp,
                                xp_after: after.xp,
                                tier: after.tier,
                                division: after.division,
                                is_mvp,
                            },
                        ));
                    }
                }
            }
        }

        // A finished match means nobody on it is still waiting.
        let participants = record.participant_ids();
        self.queue.remove_many(&participants)?;

        self.announce(record, &summaries).await;

        // Last step on purpose: a crash before this line retries the whole
        // pass instead of silently skipping it.
        self.ledger.record(LedgerKind::Result, &record.id)?;
        {
            let mut stats = self.stats_mut()?;
            stats.results_resolved += 1;
        }
        self.metrics.results().results_resolved_total.inc();
        Ok(())
    }

    fn winning_team(&self, record: &HistoryMatch) -> Option<usize> {
        record
            .teams
            .iter()
            .position(|team| team.matches_winner(&record.winner))
    }

    /// Resolve a roster slot to a profile.
    ///
    /// The stable id is authoritative; the case-insensitive name lookup is
    /// a lower-trust fallback for legacy rosters and is always logged.
    fn resolve_profile(&self, slot: &RosterSlot) -> Result<Option<PlayerProfile>> {
        if let Some(player_id) = &slot.player_id {
            if let Some(profile) = self.profiles.get(player_id)? {
                return Ok(Some(profile));
            }
            warn!(
                "Roster id {} has no profile, falling back to name lookup",
                player_id
            );
        }
        if let Some(profile) = self.profiles.find_by_name(&slot.name)? {
            warn!(
                "Resolved roster entry '{}' by name fallback to {}",
                slot.name, profile.player_id
            );
            let mut stats = self.stats_mut()?;
            stats.name_fallback_lookups += 1;
            return Ok(Some(profile));
        }
        Ok(None)
    }

    /// Best-effort winner announcement and per-player summaries.
    async fn announce(&self, record: &HistoryMatch, summaries: &[(String, ResultSummary)]) {
        let view = WinnerView {
            winner: record.winner.clone(),
            team_one: record.teams[0].player_lines(),
            team_two: record.teams[1].player_lines(),
        };
        if let Err(e) = self.sink.post_winner(view).await {
            warn!(
                "Failed to post winner announcement for match {}: {}",
                record.id, e
            );
        }
        for (chat_id, summary) in summaries {
            if let Err(e) = self.sink.send_result_summary(chat_id, summary.clone()).await {
                warn!(
                    "Failed to send result summary to {} for match {}: {}",
                    chat_id, record.id, e
                );
            }
        }
    }

    fn record_rank_change(&self, before: &LadderRank, after: &LadderRank) {
        let direction = match after.position().cmp(&before.position()) {
            std::cmp::Ordering::Greater => "promotion",
            std::cmp::Ordering::Less => "demotion",
            std::cmp::Ordering::Equal => return,
        };
        self.metrics
            .results()
            .rank_changes_total
            .with_label_values(&[direction])
            .inc();
    }

    fn stats_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, ResolverStats>> {
        self.stats
            .write()
            .map_err(|_| {
                LifecycleError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                }
                .into()
            })
    }

    /// Get current resolver statistics
    pub fn get_stats(&self) -> Result<ResolverStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| LifecycleError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
        Ok(stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchedMessage, RecordingSink};
    use crate::ladder::{Division, Tier};
    use crate::store::ledger::InMemoryNotificationLedger;
    use crate::store::profile::InMemoryProfileStore;
    use crate::store::queue::InMemoryQueueStore;
    use crate::types::{QueueEntry, TeamRoster, UNRESOLVED_WINNER};
    use crate::utils::current_timestamp;
    use serde_json::json;

    struct Fixture {
        profiles: Arc<InMemoryProfileStore>,
        queue: Arc<InMemoryQueueStore>,
        ledger: Arc<InMemoryNotificationLedger>,
        sink: Arc<RecordingSink>,
        resolver: ResultResolver,
    }

    fn fixture() -> Fixture {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let queue = Arc::new(InMemoryQueueStore::new());
        let ledger = Arc::new(InMemoryNotificationLedger::new());
        let sink = Arc::new(RecordingSink::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());

        let resolver = ResultResolver::new(
            profiles.clone(),
            queue.clone(),
            ledger.clone(),
            sink.clone(),
            metrics,
        );
        Fixture {
            profiles,
            queue,
            ledger,
            sink,
            resolver,
        }
    }

    fn profile(player_id: &str, name: &str, tier: Tier, division: Division, xp: u8) -> PlayerProfile {
        PlayerProfile {
            player_id: player_id.to_string(),
            name: name.to_string(),
            tag: String::new(),
            tier,
            division,
            xp,
            wins: 0,
            losses: 0,
            mvp_awards: 0,
            primary_role: None,
            chat_user_id: Some(format!("chat-{}", player_id)),
            notify_ready_check: true,
            notify_result: true,
            cooldown_until: None,
        }
    }

    fn slot(id: &str, name: &str) -> RosterSlot {
        RosterSlot {
            player_id: Some(id.to_string()),
            name: name.to_string(),
            role: None,
        }
    }

    fn record(winner: &str, mvps: [Option<String>; 2]) -> HistoryMatch {
        HistoryMatch {
            id: "m1".to_string(),
            teams: [
                TeamRoster {
                    name: "Time 1".to_string(),
                    players: vec![slot("a", "Alice")],
                },
                TeamRoster {
                    name: "Time 2".to_string(),
                    players: vec![slot("b", "Bruno")],
                },
            ],
            winner: winner.to_string(),
            team_mvps: mvps,
            proof_url: None,
            created_at: current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_resolve_applies_ratings_and_counters() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 80))
            .unwrap();
        fx.profiles
            .put(profile("b", "Bruno", Tier::Ouro, Division::III, 20))
            .unwrap();

        fx.resolver
            .resolve(&record("Time 1", [Some("Alice".to_string()), None]))
            .await
            .unwrap();

        let alice = fx.profiles.get("a").unwrap().unwrap();
        // 80 + 30 wraps into a division promotion.
        assert_eq!(alice.division, Division::II);
        assert_eq!(alice.xp, 10);
        assert_eq!(alice.wins, 1);
        assert_eq!(alice.mvp_awards, 1);

        let bruno = fx.profiles.get("b").unwrap().unwrap();
        // 20 - 30 wraps into a division demotion.
        assert_eq!(bruno.division, Division::IV);
        assert_eq!(bruno.xp, 90);
        assert_eq!(bruno.losses, 1);
        assert_eq!(bruno.mvp_awards, 0);
    }

    #[tokio::test]
    async fn test_resolve_is_single_shot() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 10))
            .unwrap();
        fx.profiles
            .put(profile("b", "Bruno", Tier::Ouro, Division::III, 10))
            .unwrap();

        let rec = record("Time 2", [None, None]);
        fx.resolver.resolve(&rec).await.unwrap();
        fx.resolver.resolve(&rec).await.unwrap();

        let bruno = fx.profiles.get("b").unwrap().unwrap();
        assert_eq!(bruno.wins, 1);

        let stats = fx.resolver.get_stats().unwrap();
        assert_eq!(stats.results_resolved, 1);
        assert_eq!(stats.duplicates_skipped, 1);

        let winner_posts = fx
            .sink
            .count_matching(|m| matches!(m, DispatchedMessage::WinnerPosted { .. }));
        assert_eq!(winner_posts, 1);
    }

    #[tokio::test]
    async fn test_resolve_drains_queue() {
        let fx = fixture();
        for (id, name) in [("a", "Alice"), ("b", "Bruno")] {
            let p = profile(id, name, Tier::Prata, Division::I, 50);
            fx.queue
                .put(QueueEntry::from_profile(&p, current_timestamp()))
                .unwrap();
            fx.profiles.put(p).unwrap();
        }

        fx.resolver
            .resolve(&record("Time 1", [None, None]))
            .await
            .unwrap();

        assert_eq!(fx.queue.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_winner_is_left_unrecorded() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 50))
            .unwrap();

        fx.resolver
            .resolve(&record("Time Azul", [None, None]))
            .await
            .unwrap();

        // No ledger entry: a corrective write can retrigger resolution.
        assert!(!fx.ledger.contains(LedgerKind::Result, "m1").unwrap());
        let alice = fx.profiles.get("a").unwrap().unwrap();
        assert_eq!(alice.wins, 0);
        assert_eq!(alice.losses, 0);
    }

    #[tokio::test]
    async fn test_name_fallback_resolution() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 50))
            .unwrap();
        fx.profiles
            .put(profile("b", "Bruno", Tier::Ouro, Division::III, 50))
            .unwrap();

        let mut rec = record("Time 1", [None, None]);
        // Legacy roster entry without a stable id.
        rec.teams[0].players[0] = RosterSlot {
            player_id: None,
            name: "ALICE".to_string(),
            role: None,
        };

        fx.resolver.resolve(&rec).await.unwrap();

        let alice = fx.profiles.get("a").unwrap().unwrap();
        assert_eq!(alice.wins, 1);
        assert_eq!(fx.resolver.get_stats().unwrap().name_fallback_lookups, 1);
    }

    #[tokio::test]
    async fn test_summaries_respect_notify_preference() {
        let fx = fixture();
        let mut muted = profile("a", "Alice", Tier::Ouro, Division::III, 50);
        muted.notify_result = false;
        fx.profiles.put(muted).unwrap();
        fx.profiles
            .put(profile("b", "Bruno", Tier::Ouro, Division::III, 50))
            .unwrap();

        fx.resolver
            .resolve(&record("Time 1", [None, None]))
            .await
            .unwrap();

        let recipients: Vec<_> = fx
            .sink
            .get_dispatched()
            .into_iter()
            .filter_map(|m| match m {
                DispatchedMessage::ResultSummarySent { chat_user_id, .. } => Some(chat_user_id),
                _ => None,
            })
            .collect();
        assert_eq!(recipients, vec!["chat-b".to_string()]);
    }

    #[tokio::test]
    async fn test_history_event_ignores_unresolved_winner() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 50))
            .unwrap();

        let event = ChangeEvent {
            doc_id: "m1".to_string(),
            kind: ChangeKind::Added,
            data: Some(json!({
                "winner": UNRESOLVED_WINNER,
                "teams": [
                    {"name": "Time 1", "players": [{"player_id": "a", "name": "Alice"}]},
                    {"name": "Time 2", "players": []},
                ],
            })),
        };
        fx.resolver.apply_history_event(event).await.unwrap();

        let alice = fx.profiles.get("a").unwrap().unwrap();
        assert_eq!(alice.wins, 0);
        assert!(!fx.ledger.contains(LedgerKind::Result, "m1").unwrap());
    }

    #[tokio::test]
    async fn test_history_event_with_resolved_winner_applies_once() {
        let fx = fixture();
        fx.profiles
            .put(profile("a", "Alice", Tier::Ouro, Division::III, 50))
            .unwrap();
        fx.profiles
            .put(profile("b", "Bruno", Tier::Ouro, Division::III, 50))
            .unwrap();

        let event = ChangeEvent {
            doc_id: "m1".to_string(),
            kind: ChangeKind::Modified,
            data: Some(json!({
                "vencedor": "Time 2",
                "time1": {"nome": "Time 1", "jogadores": [{"uid": "a", "nome": "Alice"}]},
                "time2": {"nome": "Time 2", "jogadores": [{"uid": "b", "nome": "Bruno"}]},
            })),
        };
        fx.resolver.apply_history_event(event.clone()).await.unwrap();
        fx.resolver.apply_history_event(event).await.unwrap();

        let bruno = fx.profiles.get("b").unwrap().unwrap();
        assert_eq!(bruno.wins, 1);
        assert_eq!(fx.profiles.get("a").unwrap().unwrap().losses, 1);
    }
}
