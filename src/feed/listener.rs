//! Change-feed listener loops
//!
//! One loop per watched collection, fed by mpsc channels that stand in for
//! the realtime subscriptions of the backing document store. Processing
//! errors are logged and counted; the loop keeps draining, matching the
//! at-least-once semantics of the upstream feeds.

use crate::metrics::MetricsCollector;
use crate::readycheck::machine::ReadyCheckMachine;
use crate::results::resolver::ResultResolver;
use crate::types::{ChangeEvent, ChangeKind};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, info};

const PENDING_COLLECTION: &str = "pending";
const HISTORY_COLLECTION: &str = "history";

fn kind_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "added",
        ChangeKind::Modified => "modified",
        ChangeKind::Removed => "removed",
    }
}

/// Routes change events to the state machine and the result resolver
pub struct FeedListener {
    machine: Arc<ReadyCheckMachine>,
    resolver: Arc<ResultResolver>,
    metrics: Arc<MetricsCollector>,
}

impl FeedListener {
    pub fn new(
        machine: Arc<ReadyCheckMachine>,
        resolver: Arc<ResultResolver>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            machine,
            resolver,
            metrics,
        }
    }

    /// Handle one pending-collection event.
    pub async fn handle_pending_event(&self, event: ChangeEvent) {
        self.metrics
            .record_feed_event(PENDING_COLLECTION, kind_label(event.kind));
        let doc_id = event.doc_id.clone();
        if let Err(e) = Arc::clone(&self.machine).apply_pending_event(event).await {
            self.metrics.record_feed_error(PENDING_COLLECTION);
            error!("Failed to process pending event for {}: {}", doc_id, e);
        }
    }

    /// Handle one history-collection event.
    pub async fn handle_history_event(&self, event: ChangeEvent) {
        self.metrics
            .record_feed_event(HISTORY_COLLECTION, kind_label(event.kind));
        let doc_id = event.doc_id.clone();
        if let Err(e) = self.resolver.apply_history_event(event).await {
            self.metrics.record_feed_error(HISTORY_COLLECTION);
            error!("Failed to process history event for {}: {}", doc_id, e);
        }
    }

    /// Spawn the two listener loops. Each runs until its sender side is
    /// dropped.
    pub fn spawn(
        self: Arc<Self>,
        pending_rx: UnboundedReceiver<ChangeEvent>,
        history_rx: UnboundedReceiver<ChangeEvent>,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let pending_listener = Arc::clone(&self);
        let pending_task = tokio::spawn(async move {
            info!("Pending-match feed listener started");
            let mut events = UnboundedReceiverStream::new(pending_rx);
            while let Some(event) = events.next().await {
                pending_listener.handle_pending_event(event).await;
            }
            info!("Pending-match feed listener stopped");
        });

        let history_listener = self;
        let history_task = tokio::spawn(async move {
            info!("History feed listener started");
            let mut events = UnboundedReceiverStream::new(history_rx);
            while let Some(event) = events.next().await {
                history_listener.handle_history_event(event).await;
            }
            info!("History feed listener stopped");
        });

        (pending_task, history_task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadyCheckSettings;
    use crate::dispatch::RecordingSink;
    use crate::store::history::InMemoryHistoryStore;
    use crate::store::ledger::InMemoryNotificationLedger;
    use crate::store::pending::{InMemoryPendingMatchStore, PendingMatchStore};
    use crate::store::profile::InMemoryProfileStore;
    use crate::store::queue::InMemoryQueueStore;
    use serde_json::json;
    use tokio::sync::mpsc::unbounded_channel;

    fn listener_fixture() -> (Arc<FeedListener>, Arc<InMemoryPendingMatchStore>) {
        let pending = Arc::new(InMemoryPendingMatchStore::new());
        let history = Arc::new(InMemoryHistoryStore::new());
        let queue = Arc::new(InMemoryQueueStore::new());
        let profiles = Arc::new(InMemoryProfileStore::new());
        let ledger = Arc::new(InMemoryNotificationLedger::new());
        let sink = Arc::new(RecordingSink::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());

        let machine = Arc::new(ReadyCheckMachine::new(
            pending.clone(),
            history.clone(),
            queue.clone(),
            profiles.clone(),
            ledger.clone(),
            sink.clone(),
            ReadyCheckSettings::default(),
            metrics.clone(),
        ));
        let resolver = Arc::new(ResultResolver::new(
            profiles,
            queue,
            ledger,
            sink,
            metrics.clone(),
        ));

        (
            Arc::new(FeedListener::new(machine, resolver, metrics)),
            pending,
        )
    }

    #[tokio::test]
    async fn test_listener_adopts_pending_documents() {
        let (listener, pending) = listener_fixture();

        let (pending_tx, pending_rx) = unbounded_channel();
        let (history_tx, history_rx) = unbounded_channel();
        let (pending_task, history_task) = listener.spawn(pending_rx, history_rx);

        pending_tx
            .send(ChangeEvent {
                doc_id: "m1".to_string(),
                kind: ChangeKind::Added,
                data: Some(json!({
                    "teams": [
                        {"name": "Time 1", "players": [{"player_id": "a", "name": "A"}]},
                        {"name": "Time 2", "players": [{"player_id": "b", "name": "B"}]},
                    ],
                })),
            })
            .unwrap();

        drop(pending_tx);
        drop(history_tx);
        pending_task.await.unwrap();
        history_task.await.unwrap();

        assert!(pending.get("m1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_listener_survives_bad_payloads() {
        let (listener, pending) = listener_fixture();

        // A non-object payload fails normalization; the listener logs and
        // keeps draining.
        listener
            .handle_pending_event(ChangeEvent {
                doc_id: "bad".to_string(),
                kind: ChangeKind::Added,
                data: Some(json!("not a document")),
            })
            .await;

        listener
            .handle_pending_event(ChangeEvent {
                doc_id: "m1".to_string(),
                kind: ChangeKind::Added,
                data: Some(json!({
                    "teams": [
                        {"name": "Time 1", "players": []},
                        {"name": "Time 2", "players": []},
                    ],
                })),
            })
            .await;

        assert!(pending.get("bad").unwrap().is_none());
        assert!(pending.get("m1").unwrap().is_some());
    }
}
