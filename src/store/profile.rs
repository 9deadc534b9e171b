//! Player profile store interface and in-memory implementation

use crate::error::{LifecycleError, Result};
use crate::types::{PlayerId, PlayerProfile};
use crate::utils::normalize_name;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for profile store operations
pub trait ProfileStore: Send + Sync {
    /// Get a player's profile
    fn get(&self, player_id: &str) -> Result<Option<PlayerProfile>>;

    /// Get profiles for multiple players
    fn get_many(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerProfile>>;

    /// Store or replace a player's profile
    fn put(&self, profile: PlayerProfile) -> Result<()>;

    /// Case-insensitive display-name lookup.
    ///
    /// Fallback path for roster slots that carry no stable id; resolution
    /// by name is lower trust and callers log when they use it.
    fn find_by_name(&self, name: &str) -> Result<Option<PlayerProfile>>;

    /// Stamp a re-join cooldown on the player's profile
    fn set_cooldown(&self, player_id: &str, until: DateTime<Utc>) -> Result<()>;
}

/// In-memory profile store implementation
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<PlayerId, PlayerProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, player_id: &str) -> Result<Option<PlayerProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire profiles read lock".to_string(),
            })?;

        Ok(profiles.get(player_id).cloned())
    }

    fn get_many(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, PlayerProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire profiles read lock".to_string(),
            })?;

        let mut result = HashMap::new();
        for player_id in player_ids {
            if let Some(profile) = profiles.get(player_id) {
                result.insert(player_id.clone(), profile.clone());
            }
        }
        Ok(result)
    }

    fn put(&self, profile: PlayerProfile) -> Result<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire profiles write lock".to_string(),
            })?;

        profiles.insert(profile.player_id.clone(), profile);
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<PlayerProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire profiles read lock".to_string(),
            })?;

        let wanted = normalize_name(name);
        Ok(profiles
            .values()
            .find(|p| normalize_name(&p.name) == wanted)
            .cloned())
    }

    fn set_cooldown(&self, player_id: &str, until: DateTime<Utc>) -> Result<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire profiles write lock".to_string(),
            })?;

        let profile = profiles
            .get_mut(player_id)
            .ok_or_else(|| LifecycleError::PlayerNotFound {
                player_id: player_id.to_string(),
            })?;
        profile.cooldown_until = Some(until);
        Ok(())
    }
}
