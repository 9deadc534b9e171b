//! TTL read-through cache in front of the profile store
//!
//! Announcement paths look the same handful of profiles up repeatedly
//! (notification preferences, chat links). The cache keeps entries for a
//! short TTL; lifecycle mutations always go straight to the store, so the
//! cache is only used where slightly stale preference data is acceptable.

use crate::error::Result;
use crate::store::profile::ProfileStore;
use crate::types::{PlayerId, PlayerProfile};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct CachedProfile {
    profile: PlayerProfile,
    fetched_at: DateTime<Utc>,
}

/// Read-through profile cache with a fixed TTL
pub struct ProfileCache {
    store: Arc<dyn ProfileStore>,
    ttl: Duration,
    entries: RwLock<HashMap<PlayerId, CachedProfile>>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn ProfileStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Five minutes, matching how long preference data may lag.
    pub fn with_default_ttl(store: Arc<dyn ProfileStore>) -> Self {
        Self::new(store, Duration::minutes(5))
    }

    /// Get a profile, hitting the store only on miss or expiry.
    pub fn get(&self, player_id: &str) -> Result<Option<PlayerProfile>> {
        let now = Utc::now();

        if let Ok(entries) = self.entries.read() {
            if let Some(cached) = entries.get(player_id) {
                if now - cached.fetched_at <= self.ttl {
                    return Ok(Some(cached.profile.clone()));
                }
            }
        }

        let profile = self.store.get(player_id)?;
        if let Some(profile) = &profile {
            if let Ok(mut entries) = self.entries.write() {
                entries.insert(
                    player_id.to_string(),
                    CachedProfile {
                        profile: profile.clone(),
                        fetched_at: now,
                    },
                );
            }
        }
        Ok(profile)
    }

    /// Batch lookup preserving the read-through behavior per id.
    pub fn get_many(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerProfile>> {
        let mut result = HashMap::new();
        for player_id in player_ids {
            if let Some(profile) = self.get(player_id)? {
                result.insert(player_id.clone(), profile);
            }
        }
        Ok(result)
    }

    /// Drop a cached entry (used after profile mutations).
    pub fn invalidate(&self, player_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{Division, Tier};
    use crate::store::profile::InMemoryProfileStore;

    fn profile(player_id: &str, name: &str) -> PlayerProfile {
        PlayerProfile {
            player_id: player_id.to_string(),
            name: name.to_string(),
            tag: String::new(),
            tier: Tier::Ouro,
            division: Division::I,
            xp: 0,
            wins: 0,
            losses: 0,
            mvp_awards: 0,
            primary_role: None,
            chat_user_id: None,
            notify_ready_check: true,
            notify_result: false,
            cooldown_until: None,
        }
    }

    #[test]
    fn test_read_through_and_hit() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.put(profile("a", "Alice")).unwrap();

        let cache = ProfileCache::with_default_ttl(store.clone());
        assert_eq!(cache.get("a").unwrap().unwrap().name, "Alice");

        // Store mutation is invisible until the entry expires or is
        // invalidated.
        store.put(profile("a", "Alicia")).unwrap();
        assert_eq!(cache.get("a").unwrap().unwrap().name, "Alice");

        cache.invalidate("a");
        assert_eq!(cache.get("a").unwrap().unwrap().name, "Alicia");
    }

    #[test]
    fn test_expired_entries_refetch() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.put(profile("a", "Alice")).unwrap();

        let cache = ProfileCache::new(store.clone(), Duration::seconds(-1));
        assert_eq!(cache.get("a").unwrap().unwrap().name, "Alice");

        store.put(profile("a", "Alicia")).unwrap();
        // TTL already negative, so every read goes to the store.
        assert_eq!(cache.get("a").unwrap().unwrap().name, "Alicia");
    }

    #[test]
    fn test_misses_are_not_cached() {
        let store = Arc::new(InMemoryProfileStore::new());
        let cache = ProfileCache::with_default_ttl(store.clone());

        assert!(cache.get("ghost").unwrap().is_none());
        store.put(profile("ghost", "Ghost")).unwrap();
        assert!(cache.get("ghost").unwrap().is_some());
    }
}
