//! Configuration schema definitions.
//!
//! All sections have defaults so the service runs with no configuration at
//! all; the loader only overrides individual fields from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Service identity attached to all exported telemetry.
    pub identity: IdentityConfig,

    /// Trace exporter settings.
    pub exporter: ExporterConfig,

    /// Request handler policy constants.
    pub handler: HandlerConfig,

    /// Heartbeat emitter settings.
    pub heartbeat: HeartbeatConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Logical service name (`service.name` resource attribute).
    pub service_name: String,

    /// Service version (`service.version` resource attribute).
    pub service_version: String,

    /// Optional deployment environment tag.
    pub environment: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            service_name: "traced-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: None,
        }
    }
}

/// Trace exporter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// OTLP/gRPC collector endpoint.
    pub otlp_endpoint: String,

    /// Capacity of the in-memory span queue; spans completing while the
    /// queue is full are dropped.
    pub queue_capacity: usize,

    /// Upper bound on the shutdown flush wait, in seconds.
    pub flush_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: "http://otel-collector:4317".to_string(),
            queue_capacity: 2048,
            flush_timeout_secs: 5,
        }
    }
}

impl ExporterConfig {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

/// Request handler policy constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Path that deterministically produces a 500 response.
    pub error_path: String,

    /// Artificial latency of the simulated work, in milliseconds.
    pub processing_delay_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            error_path: "/error".to_string(),
            processing_delay_ms: 50,
        }
    }
}

impl HandlerConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }
}

/// Heartbeat emitter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between heartbeat log records.
    pub period_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { period_secs: 5 }
    }
}

impl HeartbeatConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}
