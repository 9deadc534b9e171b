//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the ready-room service
//! using Prometheus metrics.

use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Main metrics collector for the lifecycle service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Ready-check lifecycle metrics
    ready_check_metrics: ReadyCheckMetrics,

    /// Queue metrics
    queue_metrics: QueueMetrics,

    /// Result-resolution metrics
    result_metrics: ResultMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Total change-feed events processed, by collection and change kind
    pub feed_events_total: IntCounterVec,

    /// Change-feed processing errors, by collection
    pub feed_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Ready-check lifecycle metrics
#[derive(Clone)]
pub struct ReadyCheckMetrics {
    /// Currently open ready checks
    pub active_ready_checks: IntGauge,

    /// Total ready checks announced
    pub opened_total: IntCounter,

    /// Total ready checks confirmed
    pub confirmed_total: IntCounter,

    /// Total ready checks cancelled by a decline
    pub cancelled_total: IntCounter,

    /// Total ready checks that timed out
    pub expired_total: IntCounter,

    /// Player button actions, by action and outcome
    pub player_actions_total: IntCounterVec,
}

/// Queue metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Players currently waiting in the queue
    pub players_waiting: IntGauge,

    /// Queue re-entries performed by the lifecycle, by reason
    pub requeues_total: IntCounterVec,
}

/// Result-resolution metrics
#[derive(Clone)]
pub struct ResultMetrics {
    /// Total results applied
    pub results_resolved_total: IntCounter,

    /// Redelivered results skipped by the ledger guard
    pub duplicate_results_skipped_total: IntCounter,

    /// Ladder rank changes, by direction
    pub rank_changes_total: IntCounterVec,

    /// MVP awards granted
    pub mvp_awards_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let service_metrics = ServiceMetrics {
            uptime_seconds: IntGauge::with_opts(Opts::new(
                "service_uptime_seconds",
                "Service uptime in seconds",
            ))?,
            feed_events_total: IntCounterVec::new(
                Opts::new(
                    "feed_events_total",
                    "Change-feed events processed by collection and kind",
                ),
                &["collection", "kind"],
            )?,
            feed_errors_total: IntCounterVec::new(
                Opts::new(
                    "feed_errors_total",
                    "Change-feed processing errors by collection",
                ),
                &["collection"],
            )?,
            health_status: IntGauge::with_opts(Opts::new(
                "health_status",
                "Health status (0=unhealthy, 1=degraded, 2=healthy)",
            ))?,
        };

        let ready_check_metrics = ReadyCheckMetrics {
            active_ready_checks: IntGauge::with_opts(Opts::new(
                "active_ready_checks",
                "Currently open ready checks",
            ))?,
            opened_total: IntCounter::with_opts(Opts::new(
                "ready_checks_opened_total",
                "Ready checks announced",
            ))?,
            confirmed_total: IntCounter::with_opts(Opts::new(
                "ready_checks_confirmed_total",
                "Ready checks confirmed",
            ))?,
            cancelled_total: IntCounter::with_opts(Opts::new(
                "ready_checks_cancelled_total",
                "Ready checks cancelled by a decline",
            ))?,
            expired_total: IntCounter::with_opts(Opts::new(
                "ready_checks_expired_total",
                "Ready checks that timed out",
            ))?,
            player_actions_total: IntCounterVec::new(
                Opts::new(
                    "player_actions_total",
                    "Player button actions by action and outcome",
                ),
                &["action", "outcome"],
            )?,
        };

        let queue_metrics = QueueMetrics {
            players_waiting: IntGauge::with_opts(Opts::new(
                "queue_players_waiting",
                "Players currently waiting in the queue",
            ))?,
            requeues_total: IntCounterVec::new(
                Opts::new(
                    "queue_requeues_total",
                    "Queue re-entries performed by the lifecycle, by reason",
                ),
                &["reason"],
            )?,
        };

        let result_metrics = ResultMetrics {
            results_resolved_total: IntCounter::with_opts(Opts::new(
                "results_resolved_total",
                "Match results applied",
            ))?,
            duplicate_results_skipped_total: IntCounter::with_opts(Opts::new(
                "duplicate_results_skipped_total",
                "Redelivered results skipped by the ledger guard",
            ))?,
            rank_changes_total: IntCounterVec::new(
                Opts::new("rank_changes_total", "Ladder rank changes by direction"),
                &["direction"],
            )?,
            mvp_awards_total: IntCounter::with_opts(Opts::new(
                "mvp_awards_total",
                "MVP awards granted",
            ))?,
        };

        registry.register(Box::new(service_metrics.uptime_seconds.clone()))?;
        registry.register(Box::new(service_metrics.feed_events_total.clone()))?;
        registry.register(Box::new(service_metrics.feed_errors_total.clone()))?;
        registry.register(Box::new(service_metrics.health_status.clone()))?;

        registry.register(Box::new(ready_check_metrics.active_ready_checks.clone()))?;
        registry.register(Box::new(ready_check_metrics.opened_total.clone()))?;
        registry.register(Box::new(ready_check_metrics.confirmed_total.clone()))?;
        registry.register(Box::new(ready_check_metrics.cancelled_total.clone()))?;
        registry.register(Box::new(ready_check_metrics.expired_total.clone()))?;
        registry.register(Box::new(ready_check_metrics.player_actions_total.clone()))?;

        registry.register(Box::new(queue_metrics.players_waiting.clone()))?;
        registry.register(Box::new(queue_metrics.requeues_total.clone()))?;

        registry.register(Box::new(result_metrics.results_resolved_total.clone()))?;
        registry.register(Box::new(
            result_metrics.duplicate_results_skipped_total.clone(),
        ))?;
        registry.register(Box::new(result_metrics.rank_changes_total.clone()))?;
        registry.register(Box::new(result_metrics.mvp_awards_total.clone()))?;

        Ok(Self {
            registry,
            service_metrics,
            ready_check_metrics,
            queue_metrics,
            result_metrics,
        })
    }

    /// Access the Prometheus registry for scraping
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Service-level metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Ready-check lifecycle metrics
    pub fn ready_check(&self) -> &ReadyCheckMetrics {
        &self.ready_check_metrics
    }

    /// Queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Result-resolution metrics
    pub fn results(&self) -> &ResultMetrics {
        &self.result_metrics
    }

    /// Record one processed feed event
    pub fn record_feed_event(&self, collection: &str, kind: &str) {
        self.service_metrics
            .feed_events_total
            .with_label_values(&[collection, kind])
            .inc();
    }

    /// Record one feed processing error
    pub fn record_feed_error(&self, collection: &str) {
        self.service_metrics
            .feed_errors_total
            .with_label_values(&[collection])
            .inc();
    }

    /// Record one player button action
    pub fn record_player_action(&self, action: &str, outcome: &str) {
        self.ready_check_metrics
            .player_actions_total
            .with_label_values(&[action, outcome])
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registration into a fresh registry only fails on duplicate metric
        // names, which the constructor never produces.
        Self::new().expect("metrics collector with a fresh registry")
    }
}
