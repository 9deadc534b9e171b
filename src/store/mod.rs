//! Document store interfaces for the match lifecycle service
//!
//! Each collection the service touches is fronted by a `Send + Sync` trait
//! with an in-memory implementation. Production deployments swap in
//! document-database-backed implementations; the lifecycle code only ever
//! sees the traits.

pub mod cache;
pub mod history;
pub mod ledger;
pub mod pending;
pub mod profile;
pub mod queue;

// Re-export commonly used types
pub use cache::ProfileCache;
pub use history::{HistoryStore, InMemoryHistoryStore};
pub use ledger::{InMemoryNotificationLedger, LedgerKind, NotificationLedger};
pub use pending::{InMemoryPendingMatchStore, PendingMatchStore};
pub use profile::{InMemoryProfileStore, ProfileStore};
pub use queue::{InMemoryQueueStore, QueueStore};
