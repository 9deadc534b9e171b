//! Queue store interface and in-memory implementation
//!
//! The queue is the authoritative set of players currently waiting for a
//! match. A player has at most one active entry; every lifecycle transition
//! maintains that invariant with explicit inserts and deletes.

use crate::error::{LifecycleError, Result};
use crate::types::{PlayerId, QueueEntry};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for queue store operations
pub trait QueueStore: Send + Sync {
    /// Insert or replace a player's queue entry
    fn put(&self, entry: QueueEntry) -> Result<()>;

    /// Get a player's queue entry
    fn get(&self, player_id: &str) -> Result<Option<QueueEntry>>;

    /// Whether the player currently has a queue entry
    fn contains(&self, player_id: &str) -> Result<bool>;

    /// Remove a player's entry; returns whether one existed
    fn remove(&self, player_id: &str) -> Result<bool>;

    /// Remove several players at once; returns how many entries existed
    fn remove_many(&self, player_ids: &[PlayerId]) -> Result<usize>;

    /// All entries ordered by join time, oldest first
    fn list_ordered(&self, limit: Option<usize>) -> Result<Vec<QueueEntry>>;

    /// Number of waiting players
    fn len(&self) -> Result<usize>;
}

/// In-memory queue store implementation
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    entries: RwLock<HashMap<PlayerId, QueueEntry>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for InMemoryQueueStore {
    fn put(&self, entry: QueueEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue write lock".to_string(),
            })?;

        entries.insert(entry.player_id.clone(), entry);
        Ok(())
    }

    fn get(&self, player_id: &str) -> Result<Option<QueueEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue read lock".to_string(),
            })?;

        Ok(entries.get(player_id).cloned())
    }

    fn contains(&self, player_id: &str) -> Result<bool> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue read lock".to_string(),
            })?;

        Ok(entries.contains_key(player_id))
    }

    fn remove(&self, player_id: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue write lock".to_string(),
            })?;

        Ok(entries.remove(player_id).is_some())
    }

    fn remove_many(&self, player_ids: &[PlayerId]) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue write lock".to_string(),
            })?;

        let mut removed = 0;
        for player_id in player_ids {
            if entries.remove(player_id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn list_ordered(&self, limit: Option<usize>) -> Result<Vec<QueueEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue read lock".to_string(),
            })?;

        let mut ordered: Vec<QueueEntry> = entries.values().cloned().collect();
        ordered.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));

        if let Some(limit) = limit {
            ordered.truncate(limit);
        }
        Ok(ordered)
    }

    fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire queue read lock".to_string(),
            })?;

        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{Division, Tier};
    use crate::utils::current_timestamp;
    use chrono::Duration;

    fn entry(player_id: &str, joined_offset_secs: i64) -> QueueEntry {
        QueueEntry {
            player_id: player_id.to_string(),
            name: player_id.to_uppercase(),
            tag: format!("#{}", player_id),
            tier: Tier::Ouro,
            division: Division::II,
            primary_role: Some("Mid".to_string()),
            chat_user_id: None,
            joined_at: current_timestamp() + Duration::seconds(joined_offset_secs),
        }
    }

    #[test]
    fn test_put_get_remove() {
        let store = InMemoryQueueStore::new();

        assert!(store.get("a").unwrap().is_none());
        store.put(entry("a", 0)).unwrap();
        assert!(store.contains("a").unwrap());
        assert_eq!(store.get("a").unwrap().unwrap().player_id, "a");

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_single_entry_per_player() {
        let store = InMemoryQueueStore::new();
        store.put(entry("a", 0)).unwrap();
        store.put(entry("a", 10)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_list_ordered_by_join_time() {
        let store = InMemoryQueueStore::new();
        store.put(entry("late", 30)).unwrap();
        store.put(entry("first", -30)).unwrap();
        store.put(entry("middle", 0)).unwrap();

        let ordered = store.list_ordered(None).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "middle", "late"]);

        let limited = store.list_ordered(Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_remove_many_counts_existing_only() {
        let store = InMemoryQueueStore::new();
        store.put(entry("a", 0)).unwrap();
        store.put(entry("b", 0)).unwrap();

        let removed = store
            .remove_many(&["a".to_string(), "b".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().unwrap(), 0);
    }
}
