//! Pending-match store interface and in-memory implementation
//!
//! Pending matches are mutated with single-field updates plus one
//! compare-and-set status transition. The CAS is the only guard the
//! lifecycle needs: whichever path flips the status first wins, and every
//! other concurrent signal collapses to a no-op.

use crate::error::{LifecycleError, Result};
use crate::types::{Acceptance, MatchId, MessageHandle, PendingMatch, ReadyCheckStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for pending-match store operations
pub trait PendingMatchStore: Send + Sync {
    /// Get a pending match by id
    fn get(&self, match_id: &str) -> Result<Option<PendingMatch>>;

    /// Create the document unless one with the same id already exists.
    /// Returns whether it was created.
    fn create_if_absent(&self, pending: PendingMatch) -> Result<bool>;

    /// Record one player's answer (single-field update).
    /// Returns the updated document.
    fn set_acceptance(
        &self,
        match_id: &str,
        player_id: &str,
        acceptance: Acceptance,
    ) -> Result<PendingMatch>;

    /// Attach announcement message handles for later deletion.
    fn set_notice_handles(
        &self,
        match_id: &str,
        channel_handle: Option<MessageHandle>,
        player_handles: HashMap<String, MessageHandle>,
    ) -> Result<()>;

    /// Compare-and-set status transition; optionally records the history
    /// back-reference. Returns whether this call performed the transition.
    fn transition(
        &self,
        match_id: &str,
        expected: ReadyCheckStatus,
        next: ReadyCheckStatus,
        history_ref: Option<MatchId>,
    ) -> Result<bool>;

    /// All currently open documents
    fn list_open(&self) -> Result<Vec<PendingMatch>>;
}

/// In-memory pending-match store implementation
#[derive(Debug, Default)]
pub struct InMemoryPendingMatchStore {
    matches: RwLock<HashMap<MatchId, PendingMatch>>,
}

impl InMemoryPendingMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingMatchStore for InMemoryPendingMatchStore {
    fn get(&self, match_id: &str) -> Result<Option<PendingMatch>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match read lock".to_string(),
            })?;

        Ok(matches.get(match_id).cloned())
    }

    fn create_if_absent(&self, pending: PendingMatch) -> Result<bool> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match write lock".to_string(),
            })?;

        if matches.contains_key(&pending.id) {
            return Ok(false);
        }
        matches.insert(pending.id.clone(), pending);
        Ok(true)
    }

    fn set_acceptance(
        &self,
        match_id: &str,
        player_id: &str,
        acceptance: Acceptance,
    ) -> Result<PendingMatch> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match write lock".to_string(),
            })?;

        let pending =
            matches
                .get_mut(match_id)
                .ok_or_else(|| LifecycleError::MatchNotFound {
                    match_id: match_id.to_string(),
                })?;
        pending
            .acceptance
            .insert(player_id.to_string(), acceptance);
        Ok(pending.clone())
    }

    fn set_notice_handles(
        &self,
        match_id: &str,
        channel_handle: Option<MessageHandle>,
        player_handles: HashMap<String, MessageHandle>,
    ) -> Result<()> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match write lock".to_string(),
            })?;

        let pending =
            matches
                .get_mut(match_id)
                .ok_or_else(|| LifecycleError::MatchNotFound {
                    match_id: match_id.to_string(),
                })?;
        if channel_handle.is_some() {
            pending.channel_handle = channel_handle;
        }
        pending.notice_handles.extend(player_handles);
        Ok(())
    }

    fn transition(
        &self,
        match_id: &str,
        expected: ReadyCheckStatus,
        next: ReadyCheckStatus,
        history_ref: Option<MatchId>,
    ) -> Result<bool> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match write lock".to_string(),
            })?;

        let pending =
            matches
                .get_mut(match_id)
                .ok_or_else(|| LifecycleError::MatchNotFound {
                    match_id: match_id.to_string(),
                })?;

        if pending.status != expected {
            return Ok(false);
        }
        pending.status = next;
        if history_ref.is_some() {
            pending.history_ref = history_ref;
        }
        Ok(true)
    }

    fn list_open(&self) -> Result<Vec<PendingMatch>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire pending-match read lock".to_string(),
            })?;

        Ok(matches
            .values()
            .filter(|m| m.status == ReadyCheckStatus::Open)
            .cloned()
            .collect())
    }
}
