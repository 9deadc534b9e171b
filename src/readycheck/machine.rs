//! Ready-check state machine
//!
//! Drives a proposed match from `open` through accept/decline/timeout to
//! exactly one terminal state, reconciling the queue on every transition.
//!
//! Signals arrive from the change feed, from player buttons, and from
//! expiry timers, with at-least-once delivery and no ordering guarantees.
//! Every entry point therefore re-reads the current document and guards
//! its transition with a compare-and-set; redelivered or racing signals
//! collapse to no-ops. Chat-platform failures never block a transition:
//! the document store is the source of truth, announcements are best
//! effort.

use crate::config::ReadyCheckSettings;
use crate::dispatch::AnnouncementSink;
use crate::error::{LifecycleError, Result};
use crate::feed::normalize::pending_match_from_doc;
use crate::history::{HistoryPromoter, PromotionOutcome};
use crate::metrics::MetricsCollector;
use crate::store::cache::ProfileCache;
use crate::store::ledger::{LedgerKind, NotificationLedger};
use crate::store::pending::PendingMatchStore;
use crate::store::profile::ProfileStore;
use crate::store::queue::QueueStore;
use crate::readycheck::timers::ExpiryScheduler;
use crate::store::history::HistoryStore;
use crate::types::{
    Acceptance, ChangeEvent, ChangeKind, PendingMatch, QueueEntry, ReadyAction, ReadyCheckView,
};
use crate::utils::current_timestamp;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Outcome of an accept action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The acceptance was recorded; others are still undecided
    Recorded,
    /// The player had already accepted; nothing changed
    AlreadyAccepted,
    /// This acceptance completed the set and the match was confirmed
    Confirmed,
}

/// Statistics about state machine operations
#[derive(Debug, Clone, Default)]
pub struct MachineStats {
    /// Ready checks announced
    pub ready_checks_announced: u64,
    /// Matches confirmed and promoted
    pub confirmed: u64,
    /// Matches cancelled by a decline
    pub cancelled: u64,
    /// Matches that timed out
    pub expired: u64,
    /// Accept actions recorded
    pub accepts_recorded: u64,
    /// Decline actions recorded
    pub declines_recorded: u64,
    /// Players returned to the queue by reconciliation
    pub players_requeued: u64,
}

/// The ready-check lifecycle state machine
pub struct ReadyCheckMachine {
    pending: Arc<dyn PendingMatchStore>,
    queue: Arc<dyn QueueStore>,
    profiles: Arc<dyn ProfileStore>,
    profile_cache: ProfileCache,
    ledger: Arc<dyn NotificationLedger>,
    sink: Arc<dyn AnnouncementSink>,
    promoter: HistoryPromoter,
    scheduler: ExpiryScheduler,
    settings: ReadyCheckSettings,
    stats: RwLock<MachineStats>,
    metrics: Arc<MetricsCollector>,
}

impl ReadyCheckMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pending: Arc<dyn PendingMatchStore>,
        history: Arc<dyn HistoryStore>,
        queue: Arc<dyn QueueStore>,
        profiles: Arc<dyn ProfileStore>,
        ledger: Arc<dyn NotificationLedger>,
        sink: Arc<dyn AnnouncementSink>,
        settings: ReadyCheckSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let promoter = HistoryPromoter::new(history, queue.clone(), pending.clone());
        let profile_cache = ProfileCache::with_default_ttl(profiles.clone());

        Self {
            pending,
            queue,
            profiles,
            profile_cache,
            ledger,
            sink,
            promoter,
            scheduler: ExpiryScheduler::new(),
            settings,
            stats: RwLock::new(MachineStats::default()),
            metrics,
        }
    }

    fn accept_timeout(&self) -> Duration {
        Duration::seconds(self.settings.accept_timeout_seconds as i64)
    }

    fn decline_cooldown(&self) -> Duration {
        Duration::seconds(self.settings.decline_cooldown_seconds as i64)
    }

    fn recent_window(&self) -> Duration {
        Duration::hours(self.settings.recent_window_hours as i64)
    }

    /// Handle a player's accept button press.
    pub async fn accept(&self, match_id: &str, player_id: &str) -> Result<AcceptOutcome> {
        let result = self.accept_inner(match_id, player_id).await;
        match &result {
            Ok(_) => self.metrics.record_player_action("accept", "success"),
            Err(_) => self.metrics.record_player_action("accept", "rejected"),
        }
        result
    }

    async fn accept_inner(&self, match_id: &str, player_id: &str) -> Result<AcceptOutcome> {
        let pending = self.load_open(match_id)?;
        if !pending.is_participant(player_id) {
            return Err(LifecycleError::NotAParticipant {
                match_id: match_id.to_string(),
                player_id: player_id.to_string(),
            }
            .into());
        }

        // Re-accepting is a success no-op; no mutation, no side effects.
        if pending.acceptance_of(player_id) == Some(Acceptance::Accepted) {
            debug!("Player {} re-accepted match {}", player_id, match_id);
            return Ok(AcceptOutcome::AlreadyAccepted);
        }

        let updated = self
            .pending
            .set_acceptance(match_id, player_id, Acceptance::Accepted)?;
        info!(
            "Player {} accepted match {} ({}/{} answered)",
            player_id,
            match_id,
            updated.acceptance.len(),
            updated.participants.len()
        );
        {
            let mut stats = self.stats_mut()?;
            stats.accepts_recorded += 1;
        }

        self.rerender(&updated).await;

        if updated.all_accepted() && self.confirm(&updated).await? {
            return Ok(AcceptOutcome::Confirmed);
        }
        Ok(AcceptOutcome::Recorded)
    }

    /// Handle a player's decline button press.
    ///
    /// One decline unwinds the whole proposal: the match is cancelled, the
    /// decliner leaves the queue with a cooldown, and every other
    /// participant is returned to it. The downstream matchmaker rebuilds
    /// teams from scratch.
    pub async fn decline(&self, match_id: &str, player_id: &str) -> Result<()> {
        let result = self.decline_inner(match_id, player_id).await;
        match &result {
            Ok(_) => self.metrics.record_player_action("decline", "success"),
            Err(_) => self.metrics.record_player_action("decline", "rejected"),
        }
        result
    }

    async fn decline_inner(&self, match_id: &str, player_id: &str) -> Result<()> {
        let pending = self.load_open(match_id)?;
        if !pending.is_participant(player_id) {
            return Err(LifecycleError::NotAParticipant {
                match_id: match_id.to_string(),
                player_id: player_id.to_string(),
            }
            .into());
        }

        let updated = self
            .pending
            .set_acceptance(match_id, player_id, Acceptance::Declined)?;

        let flipped = self.pending.transition(
            match_id,
            crate::types::ReadyCheckStatus::Open,
            crate::types::ReadyCheckStatus::Cancelled,
            None,
        )?;
        if !flipped {
            // A concurrent confirm or expiry won; the decline arrives too
            // late to unwind anything.
            return Err(LifecycleError::MatchAlreadyDecided {
                match_id: match_id.to_string(),
            }
            .into());
        }

        info!(
            "Player {} declined match {}, cancelling the proposal",
            player_id, match_id
        );
        self.scheduler.cancel(match_id);
        self.delete_announcements(&updated).await;

        // The decliner leaves the queue and sits out a cooldown window.
        self.queue.remove(player_id)?;
        let until = current_timestamp() + self.decline_cooldown();
        if let Err(e) = self.profiles.set_cooldown(player_id, until) {
            warn!("Failed to stamp decline cooldown on {}: {}", player_id, e);
        }
        self.profile_cache.invalidate(player_id);

        // Everyone else goes back to waiting.
        for participant in updated.participants.iter().filter(|p| *p != player_id) {
            self.requeue_from_profile(participant, "decline_compensation")?;
        }

        {
            let mut stats = self.stats_mut()?;
            stats.declines_recorded += 1;
            stats.cancelled += 1;
        }
        self.metrics.ready_check().cancelled_total.inc();
        self.refresh_gauges();
        Ok(())
    }

    /// Fire the expiry for a match whose answer window has closed.
    ///
    /// Runs the same status guard as every other signal: a match that was
    /// confirmed or cancelled in the meantime is left alone.
    pub async fn handle_expiry(&self, match_id: &str) -> Result<()> {
        self.scheduler.discard(match_id);

        let Some(doc) = self.pending.get(match_id)? else {
            debug!("Expiry fired for unknown match {}", match_id);
            return Ok(());
        };
        if doc.status.is_terminal() {
            return Ok(());
        }

        let flipped = self.pending.transition(
            match_id,
            crate::types::ReadyCheckStatus::Open,
            crate::types::ReadyCheckStatus::Expired,
            None,
        )?;
        if !flipped {
            return Ok(());
        }

        info!(
            "Match {} expired with {}/{} acceptances",
            match_id,
            doc.accepted_players().len(),
            doc.participants.len()
        );
        self.delete_announcements(&doc).await;

        // Players who committed go back to waiting; the undecided neither
        // committed nor declined, so they are dropped.
        for player_id in doc.accepted_players() {
            self.requeue_from_profile(&player_id, "timeout_accepted")?;
        }

        {
            let mut stats = self.stats_mut()?;
            stats.expired += 1;
        }
        self.metrics.ready_check().expired_total.inc();
        self.refresh_gauges();
        Ok(())
    }

    /// Apply one change-feed event for the pending-match collection.
    ///
    /// The payload is treated as "at least one state-advancing signal has
    /// occurred", never as a diff: the document is adopted if unseen, and
    /// all decisions are re-derived from current store state.
    pub async fn apply_pending_event(self: Arc<Self>, event: ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Removed => {
                self.scheduler.cancel(&event.doc_id);
                Ok(())
            }
            ChangeKind::Added | ChangeKind::Modified => {
                let Some(data) = event.data.as_ref() else {
                    warn!(
                        "Pending event for {} carried no document, ignoring",
                        event.doc_id
                    );
                    return Ok(());
                };
                let normalized =
                    pending_match_from_doc(&event.doc_id, data, self.accept_timeout())?;

                let now = current_timestamp();
                if normalized.created_at < now - self.recent_window() {
                    debug!("Ignoring stale pending document {}", event.doc_id);
                    return Ok(());
                }

                self.pending.create_if_absent(normalized)?;
                let Some(doc) = self.pending.get(&event.doc_id)? else {
                    return Err(LifecycleError::InternalError {
                        message: format!("pending match {} vanished after adoption", event.doc_id),
                    }
                    .into());
                };

                if doc.status.is_terminal() {
                    self.scheduler.cancel(&doc.id);
                    return Ok(());
                }

                Self::schedule_expiry(&self, &doc);
                self.announce(&doc).await?;

                // Redelivery safety: the feed may replay acceptance writes
                // this process never saw as button presses.
                if doc.all_accepted() {
                    self.confirm(&doc).await?;
                }
                self.refresh_gauges();
                Ok(())
            }
        }
    }

    /// Promote a fully accepted match. Returns whether this call won the
    /// confirmation; losers skip all side effects.
    async fn confirm(&self, pending: &PendingMatch) -> Result<bool> {
        let PromotionOutcome {
            history_id,
            newly_promoted,
        } = self.promoter.promote(pending)?;
        if !newly_promoted {
            return Ok(false);
        }

        self.scheduler.cancel(&pending.id);

        // Re-read for the freshest message handles before deleting.
        let doc = self
            .pending
            .get(&pending.id)?
            .unwrap_or_else(|| pending.clone());
        self.delete_announcements(&doc).await;

        {
            let mut stats = self.stats_mut()?;
            stats.confirmed += 1;
        }
        self.metrics.ready_check().confirmed_total.inc();
        info!(
            "Match {} fully accepted, history record {} created",
            pending.id, history_id
        );
        self.refresh_gauges();
        Ok(true)
    }

    /// Announce a newly observed ready check, at most once per match.
    async fn announce(&self, doc: &PendingMatch) -> Result<()> {
        if !self.ledger.record(LedgerKind::ReadyCheck, &doc.id)? {
            return Ok(());
        }

        info!(
            "Announcing ready check for match {} with {} participants",
            doc.id,
            doc.participants.len()
        );

        let view = self.build_view(doc);
        let channel_handle = match self.sink.post_ready_check(&doc.id, view).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to post ready check for match {}: {}", doc.id, e);
                None
            }
        };

        let mut player_handles = HashMap::new();
        let profiles = self.profile_cache.get_many(&doc.participants)?;
        let seconds = doc.seconds_remaining(current_timestamp());
        for player_id in &doc.participants {
            let Some(profile) = profiles.get(player_id) else {
                debug!("No profile for participant {}, channel only", player_id);
                continue;
            };
            if !profile.notify_ready_check {
                continue;
            }
            // Players without a linked chat id are covered by the channel
            // announcement alone.
            let Some(chat_id) = &profile.chat_user_id else {
                continue;
            };
            let text = format!("Ready check open! You have {}s to answer.", seconds);
            match self.sink.notify_player(chat_id, text).await {
                Ok(handle) => {
                    player_handles.insert(player_id.clone(), handle);
                }
                Err(e) => {
                    warn!("Failed to notify {} for match {}: {}", player_id, doc.id, e);
                }
            }
        }

        if channel_handle.is_some() || !player_handles.is_empty() {
            self.pending
                .set_notice_handles(&doc.id, channel_handle, player_handles)?;
        }

        {
            let mut stats = self.stats_mut()?;
            stats.ready_checks_announced += 1;
        }
        self.metrics.ready_check().opened_total.inc();
        Ok(())
    }

    fn schedule_expiry(machine: &Arc<Self>, doc: &PendingMatch) {
        let this = Arc::clone(machine);
        let match_id = doc.id.clone();
        machine.scheduler.schedule(&doc.id, doc.expires_at, async move {
            if let Err(e) = this.handle_expiry(&match_id).await {
                error!("Expiry handling failed for match {}: {}", match_id, e);
            }
        });
    }

    /// Re-render the channel announcement with updated check marks.
    async fn rerender(&self, doc: &PendingMatch) {
        let Some(handle) = &doc.channel_handle else {
            return;
        };
        let view = self.build_view(doc);
        if let Err(e) = self.sink.update_ready_check(handle, view).await {
            warn!("Failed to re-render ready check for match {}: {}", doc.id, e);
        }
    }

    fn build_view(&self, doc: &PendingMatch) -> ReadyCheckView {
        let mut player_lines = Vec::new();
        for team in &doc.teams {
            for slot in &team.players {
                let mark = match slot
                    .player_id
                    .as_deref()
                    .and_then(|id| doc.acceptance_of(id))
                {
                    Some(Acceptance::Accepted) => "✅",
                    Some(Acceptance::Declined) => "❌",
                    None => "⏳",
                };
                let role = slot.role.as_deref().unwrap_or("Fill");
                player_lines.push(format!("{} • {} ({})", mark, slot.name, role));
            }
        }

        ReadyCheckView {
            title: "Ready Check".to_string(),
            player_lines,
            seconds_remaining: doc.seconds_remaining(current_timestamp()),
            actions: vec![ReadyAction::Accept, ReadyAction::Decline],
        }
    }

    /// Best-effort deletion of every outward announcement for a match.
    async fn delete_announcements(&self, doc: &PendingMatch) {
        if let Some(handle) = &doc.channel_handle {
            if let Err(e) = self.sink.delete_message(handle).await {
                warn!(
                    "Failed to delete channel announcement for match {}: {}",
                    doc.id, e
                );
            }
        }
        for (player_id, handle) in &doc.notice_handles {
            if let Err(e) = self.sink.delete_message(handle).await {
                warn!(
                    "Failed to delete notification of {} for match {}: {}",
                    player_id, doc.id, e
                );
            }
        }
    }

    /// Return a player to the queue, rebuilding the entry from the profile.
    ///
    /// Skipped when the player is already waiting, has no profile, or is
    /// under a decline cooldown.
    fn requeue_from_profile(&self, player_id: &str, reason: &str) -> Result<bool> {
        if self.queue.contains(player_id)? {
            return Ok(false);
        }
        let Some(profile) = self.profiles.get(player_id)? else {
            warn!("Cannot requeue {}: no profile on record", player_id);
            return Ok(false);
        };
        let now = current_timestamp();
        if profile.on_cooldown(now) {
            debug!("Not requeueing {}: decline cooldown active", player_id);
            return Ok(false);
        }

        self.queue.put(QueueEntry::from_profile(&profile, now))?;
        {
            let mut stats = self.stats_mut()?;
            stats.players_requeued += 1;
        }
        self.metrics
            .queue()
            .requeues_total
            .with_label_values(&[reason])
            .inc();
        debug!("Returned {} to the queue ({})", player_id, reason);
        Ok(true)
    }

    fn load_open(&self, match_id: &str) -> Result<PendingMatch> {
        let Some(doc) = self.pending.get(match_id)? else {
            return Err(LifecycleError::MatchNotFound {
                match_id: match_id.to_string(),
            }
            .into());
        };
        if doc.status.is_terminal() {
            return Err(LifecycleError::MatchAlreadyDecided {
                match_id: match_id.to_string(),
            }
            .into());
        }
        Ok(doc)
    }

    fn stats_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, MachineStats>> {
        self.stats
            .write()
            .map_err(|_| {
                LifecycleError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                }
                .into()
            })
    }

    fn refresh_gauges(&self) {
        if let Ok(open) = self.pending.list_open() {
            self.metrics
                .ready_check()
                .active_ready_checks
                .set(open.len() as i64);
        }
        if let Ok(waiting) = self.queue.len() {
            self.metrics.queue().players_waiting.set(waiting as i64);
        }
    }

    /// Get current state machine statistics
    pub fn get_stats(&self) -> Result<MachineStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| LifecycleError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
        Ok(stats.clone())
    }

    /// Number of matches with a live expiry timer
    pub fn active_timers(&self) -> usize {
        self.scheduler.active_count()
    }
}
