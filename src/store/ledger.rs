//! Notification ledger: the idempotency store
//!
//! A ledger entry `(kind, entity_id)` means "this logical event was already
//! processed". Entries are append-only with set-if-absent semantics, which
//! is all the at-least-once change feeds require: a second write is
//! harmless, an existing entry short-circuits reprocessing.

use crate::error::{LifecycleError, Result};
use std::collections::HashSet;
use std::sync::RwLock;

/// Kinds of events the ledger distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// A ready check was announced
    ReadyCheck,
    /// A resolved result was applied
    Result,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::ReadyCheck => "readyCheck",
            LedgerKind::Result => "result",
        }
    }
}

/// Trait for notification ledger operations
pub trait NotificationLedger: Send + Sync {
    /// Record the entry unless it already exists; returns whether it was new
    fn record(&self, kind: LedgerKind, entity_id: &str) -> Result<bool>;

    /// Whether the entry exists
    fn contains(&self, kind: LedgerKind, entity_id: &str) -> Result<bool>;
}

/// In-memory notification ledger implementation
#[derive(Debug, Default)]
pub struct InMemoryNotificationLedger {
    entries: RwLock<HashSet<(LedgerKind, String)>>,
}

impl InMemoryNotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationLedger for InMemoryNotificationLedger {
    fn record(&self, kind: LedgerKind, entity_id: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire ledger write lock".to_string(),
            })?;

        Ok(entries.insert((kind, entity_id.to_string())))
    }

    fn contains(&self, kind: LedgerKind, entity_id: &str) -> Result<bool> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LifecycleError::StoreUnavailable {
                message: "Failed to acquire ledger read lock".to_string(),
            })?;

        Ok(entries.contains(&(kind, entity_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_set_if_absent() {
        let ledger = InMemoryNotificationLedger::new();

        assert!(!ledger.contains(LedgerKind::Result, "m1").unwrap());
        assert!(ledger.record(LedgerKind::Result, "m1").unwrap());
        assert!(!ledger.record(LedgerKind::Result, "m1").unwrap());
        assert!(ledger.contains(LedgerKind::Result, "m1").unwrap());
    }

    #[test]
    fn test_kinds_are_independent() {
        let ledger = InMemoryNotificationLedger::new();
        ledger.record(LedgerKind::ReadyCheck, "m1").unwrap();

        assert!(!ledger.contains(LedgerKind::Result, "m1").unwrap());
        assert!(ledger.record(LedgerKind::Result, "m1").unwrap());
    }
}
