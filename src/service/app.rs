//! Application state and service wiring
//!
//! `AppState` owns the stores, the state machine, the result resolver and
//! the feed listener loops. Inbound change events are pushed through the
//! mpsc senders it exposes; a production deployment connects those senders
//! to the document store's realtime subscriptions.

use crate::config::AppConfig;
use crate::dispatch::{AnnouncementSink, LoggingSink};
use crate::error::{LifecycleError, Result};
use crate::feed::listener::FeedListener;
use crate::metrics::MetricsCollector;
use crate::readycheck::machine::ReadyCheckMachine;
use crate::results::resolver::ResultResolver;
use crate::store::history::{HistoryStore, InMemoryHistoryStore};
use crate::store::ledger::{InMemoryNotificationLedger, NotificationLedger};
use crate::store::pending::{InMemoryPendingMatchStore, PendingMatchStore};
use crate::store::profile::{InMemoryProfileStore, ProfileStore};
use crate::store::queue::{InMemoryQueueStore, QueueStore};
use crate::types::ChangeEvent;
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::info;

/// The assembled service
pub struct AppState {
    config: AppConfig,
    metrics: Arc<MetricsCollector>,

    pending: Arc<dyn PendingMatchStore>,
    history: Arc<dyn HistoryStore>,
    queue: Arc<dyn QueueStore>,
    profiles: Arc<dyn ProfileStore>,
    ledger: Arc<dyn NotificationLedger>,

    machine: Arc<ReadyCheckMachine>,
    resolver: Arc<ResultResolver>,
    listener: Arc<FeedListener>,

    pending_tx: UnboundedSender<ChangeEvent>,
    history_tx: UnboundedSender<ChangeEvent>,
    feed_receivers: Mutex<Option<(UnboundedReceiver<ChangeEvent>, UnboundedReceiver<ChangeEvent>)>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,

    running: AtomicBool,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble the service with in-memory stores and a logging sink.
    pub async fn new(config: AppConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(LoggingSink::new())).await
    }

    /// Assemble the service with a custom announcement sink.
    pub async fn with_sink(config: AppConfig, sink: Arc<dyn AnnouncementSink>) -> Result<Self> {
        let metrics = Arc::new(
            MetricsCollector::new().map_err(|e| LifecycleError::InternalError {
                message: format!("Failed to create metrics collector: {}", e),
            })?,
        );

        let pending: Arc<dyn PendingMatchStore> = Arc::new(InMemoryPendingMatchStore::new());
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::new());
        let queue: Arc<dyn QueueStore> = Arc::new(InMemoryQueueStore::new());
        let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
        let ledger: Arc<dyn NotificationLedger> = Arc::new(InMemoryNotificationLedger::new());

        let machine = Arc::new(ReadyCheckMachine::new(
            pending.clone(),
            history.clone(),
            queue.clone(),
            profiles.clone(),
            ledger.clone(),
            sink.clone(),
            config.ready_check.clone(),
            metrics.clone(),
        ));
        let resolver = Arc::new(ResultResolver::new(
            profiles.clone(),
            queue.clone(),
            ledger.clone(),
            sink,
            metrics.clone(),
        ));
        let listener = Arc::new(FeedListener::new(
            machine.clone(),
            resolver.clone(),
            metrics.clone(),
        ));

        let (pending_tx, pending_rx) = unbounded_channel();
        let (history_tx, history_rx) = unbounded_channel();

        Ok(Self {
            config,
            metrics,
            pending,
            history,
            queue,
            profiles,
            ledger,
            machine,
            resolver,
            listener,
            pending_tx,
            history_tx,
            feed_receivers: Mutex::new(Some((pending_rx, history_rx))),
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            started_at: current_timestamp(),
        })
    }

    /// Start the feed listener loops and background tasks.
    pub async fn start(&self) -> Result<()> {
        let receivers = self
            .feed_receivers
            .lock()
            .map_err(|_| LifecycleError::InternalError {
                message: "Failed to acquire feed receiver lock".to_string(),
            })?
            .take();
        let Some((pending_rx, history_rx)) = receivers else {
            return Err(LifecycleError::InternalError {
                message: "Service already started".to_string(),
            }
            .into());
        };

        let (pending_task, history_task) = self.listener.clone().spawn(pending_rx, history_rx);

        // Uptime gauge refresher
        let metrics = self.metrics.clone();
        let started_at = self.started_at;
        let uptime_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(15));
            loop {
                interval.tick().await;
                let uptime = (current_timestamp() - started_at).num_seconds();
                metrics.service().uptime_seconds.set(uptime);
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.extend([pending_task, history_task, uptime_task]);
        }

        self.running.store(true, Ordering::SeqCst);
        info!("Service components started");
        Ok(())
    }

    /// Stop background tasks.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        info!("Service components stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sender feeding the pending-match change feed
    pub fn pending_feed(&self) -> UnboundedSender<ChangeEvent> {
        self.pending_tx.clone()
    }

    /// Sender feeding the history change feed
    pub fn history_feed(&self) -> UnboundedSender<ChangeEvent> {
        self.history_tx.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn machine(&self) -> Arc<ReadyCheckMachine> {
        self.machine.clone()
    }

    pub fn resolver(&self) -> Arc<ResultResolver> {
        self.resolver.clone()
    }

    pub fn pending_store(&self) -> Arc<dyn PendingMatchStore> {
        self.pending.clone()
    }

    pub fn history_store(&self) -> Arc<dyn HistoryStore> {
        self.history.clone()
    }

    pub fn queue_store(&self) -> Arc<dyn QueueStore> {
        self.queue.clone()
    }

    pub fn profile_store(&self) -> Arc<dyn ProfileStore> {
        self.profiles.clone()
    }

    pub fn ledger(&self) -> Arc<dyn NotificationLedger> {
        self.ledger.clone()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_start_and_stop() {
        let state = AppState::new(AppConfig::default()).await.unwrap();
        assert!(!state.is_running().await);

        state.start().await.unwrap();
        assert!(state.is_running().await);

        // Starting twice is an error: the receivers were consumed.
        assert!(state.start().await.is_err());

        state.stop().await;
        assert!(!state.is_running().await);
    }

    #[tokio::test]
    async fn test_feed_events_reach_the_machine() {
        let state = AppState::new(AppConfig::default()).await.unwrap();
        state.start().await.unwrap();

        state
            .pending_feed()
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

        // Let the listener loop drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(state.pending_store().get("m1").unwrap().is_some());
        state.stop().await;
    }
}
