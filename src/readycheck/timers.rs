//! Per-match expiry timers
//!
//! Each pending match owns exactly one logical timer. Scheduling for an id
//! that already has one replaces it (the old handle is aborted), so
//! redelivered documents never leak duplicate timers. Firing goes through
//! the same status-guarded path as every other signal, so a stale timer is
//! harmless.

use crate::types::MatchId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owns the scheduled expiry task per match id
#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    timers: Mutex<HashMap<MatchId, JoinHandle<()>>>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run at `fire_at`, replacing any previous timer
    /// for the same match.
    pub fn schedule<F>(&self, match_id: &str, fire_at: DateTime<Utc>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        if let Ok(mut timers) = self.timers.lock() {
            if let Some(previous) = timers.insert(match_id.to_string(), handle) {
                debug!("Replacing existing expiry timer for match {}", match_id);
                previous.abort();
            }
        }
    }

    /// Abort and forget the timer for a match; returns whether one existed.
    pub fn cancel(&self, match_id: &str) -> bool {
        if let Ok(mut timers) = self.timers.lock() {
            if let Some(handle) = timers.remove(match_id) {
                handle.abort();
                return true;
            }
        }
        false
    }

    /// Forget the timer without aborting it.
    ///
    /// Called from inside the firing task itself; aborting there would
    /// cancel the expiry handling mid-flight.
    pub fn discard(&self, match_id: &str) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.remove(match_id);
        }
    }

    /// Number of matches with a live timer
    pub fn active_count(&self) -> usize {
        self.timers.lock().map(|timers| timers.len()).unwrap_or(0)
    }
}
