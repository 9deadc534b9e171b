//! Metrics collection and monitoring endpoints
//!
//! Prometheus-based metrics for the lifecycle service plus the HTTP server
//! exposing health and metrics endpoints.

pub mod collector;
pub mod health;

// Re-export commonly used types
pub use collector::MetricsCollector;
pub use health::{HealthServer, HealthServerConfig};
