//! Heartbeat properties: fixed-period emission, no correlation, stops on
//! shutdown.

use std::time::Duration;

use traced_service::lifecycle::{HeartbeatEmitter, Shutdown};

mod common;
use common::Harness;

#[tokio::test(start_paused = true)]
async fn heartbeat_fires_on_period_with_no_trace_identifiers() {
    let harness = Harness::new();
    let shutdown = Shutdown::new();
    let emitter = HeartbeatEmitter::new(harness.logger.clone(), Duration::from_secs(5));
    let task = tokio::spawn(emitter.run(shutdown.subscribe()));

    // Paused clock: this advances straight through three beat deadlines
    // (5s, 10s, 15s) with zero request traffic.
    tokio::time::sleep(Duration::from_secs(16)).await;
    shutdown.trigger();
    task.await.unwrap();

    let records = harness.logs.records();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.message, "Periodic heartbeat log");
        assert!(record.trace_id.is_none());
        assert!(record.span_id.is_none());
    }

    // No spans were created by the heartbeat.
    harness.flush().await;
    assert!(harness.spans.spans().is_empty());
}

#[tokio::test(start_paused = true)]
async fn heartbeat_stops_when_shutdown_begins() {
    let harness = Harness::new();
    let shutdown = Shutdown::new();
    let emitter = HeartbeatEmitter::new(harness.logger.clone(), Duration::from_secs(5));
    let task = tokio::spawn(emitter.run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_secs(6)).await;
    shutdown.trigger();
    task.await.unwrap();
    let count_at_shutdown = harness.logs.records().len();
    assert_eq!(count_at_shutdown, 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.logs.records().len(), count_at_shutdown);
}
