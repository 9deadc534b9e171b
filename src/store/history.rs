//! Match-history store interface and in-memory implementation

use crate::error::{LifecycleError, Result};
use crate::types::{HistoryMatch, MatchId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for match-history store operations
pub trait HistoryStore: Send + Sync {
    /// Get a history record by id
    fn get(&self, match_id: &str) -> Result<Option<HistoryMatch>>;

    /// Create the record unless one with the same id already exists.
    ///
    /// Put-if-absent is the promotion idempotency guard: a retried
    /// confirmation finds the record in place and moves on.
    fn create_if_absent(&self, record: HistoryMatch) -> Result<bool>;

    /// Resolve the winner field. The transition happens at most once;
    /// returns whether this call performed it.
    fn set_winner(
        &self,
        match_id: &str,
        winner: &str,
        team_mvps: [Option<String>; 2],
    ) -> Result<bool>;

    /// Most recent records, newest first
    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryMatch>>;
}

/// In-memory match-history store implementation
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<HashMap<MatchId, HistoryMatch>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn get(&self, match_id: &str) -> Result<Option<HistoryMatch>> {
        let records = self
            .records
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire history read lock".to_string(),
            })?;

        Ok(records.get(match_id).cloned())
    }

    fn create_if_absent(&self, record: HistoryMatch) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire history write lock".to_string(),
            })?;

        if records.contains_key(&record.id) {
            return Ok(false);
        }
        records.insert(record.id.clone(), record);
        Ok(true)
    }

    fn set_winner(
        &self,
        match_id: &str,
        winner: &str,
        team_mvps: [Option<String>; 2],
    ) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire history write lock".to_string(),
            })?;

        let record = records
            .get_mut(match_id)
            .ok_or_else(|| LifecycleError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        if record.winner_is_resolved() {
            return Ok(false);
        }
        record.winner = winner.to_string();
        record.team_mvps = team_mvps;
        Ok(true)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryMatch>> {
        let records = self
            .records
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire history read lock".to_string(),
            })?;

        let mut recent: Vec<HistoryMatch> = records.values().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }
}
