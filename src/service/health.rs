//! Health check reporting for the lifecycle service

use crate::error::Result;
use crate::service::app::AppState;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Overall service health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Point-in-time service statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStats {
    pub active_ready_checks: usize,
    pub players_waiting: usize,
    pub ready_checks_confirmed: u64,
    pub ready_checks_cancelled: u64,
    pub ready_checks_expired: u64,
    pub results_resolved: u64,
    pub uptime_info: String,
}

/// A full health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub stats: HealthStats,
}

/// Health check entry point
pub struct HealthCheck;

impl HealthCheck {
    /// Build a health report from live service state.
    pub async fn check(app_state: Arc<AppState>) -> Result<HealthReport> {
        let machine_stats = app_state.machine().get_stats()?;
        let resolver_stats = app_state.resolver().get_stats()?;
        let active_ready_checks = app_state.pending_store().list_open()?.len();
        let players_waiting = app_state.queue_store().len()?;

        let status = if app_state.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        let uptime = current_timestamp() - app_state.started_at();
        let stats = HealthStats {
            active_ready_checks,
            players_waiting,
            ready_checks_confirmed: machine_stats.confirmed,
            ready_checks_cancelled: machine_stats.cancelled,
            ready_checks_expired: machine_stats.expired,
            results_resolved: resolver_stats.results_resolved,
            uptime_info: format!(
                "{}h{}m{}s",
                uptime.num_hours(),
                uptime.num_minutes() % 60,
                uptime.num_seconds() % 60
            ),
        };

        let gauge_value = match status {
            HealthStatus::Unhealthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Healthy => 2,
        };
        app_state.metrics().service().health_status.set(gauge_value);

        Ok(HealthReport { status, stats })
    }
}
