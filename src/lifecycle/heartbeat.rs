//! Periodic liveness heartbeat.
//!
//! # Responsibilities
//! - Emit one uncorrelated info log record per period
//! - Keep firing regardless of request traffic, including none
//! - Stop when shutdown begins
//!
//! # Design Decisions
//! - Runs as an independent task outside any span scope, so its records
//!   never carry trace identifiers and it never creates spans
//! - Shares nothing with the request path besides the log sink handle

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use tokio::sync::broadcast;

use crate::telemetry::CorrelatedLogger;

/// Emits a liveness log record on a fixed period.
pub struct HeartbeatEmitter {
    logger: Arc<CorrelatedLogger>,
    period: Duration,
}

impl HeartbeatEmitter {
    pub fn new(logger: Arc<CorrelatedLogger>, period: Duration) -> Self {
        Self { logger, period }
    }

    /// Run until the shutdown signal fires. The first beat lands one full
    /// period after startup.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.period);
        // interval's first tick completes immediately; consume it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.logger.info("Periodic heartbeat log", Map::new());
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}
