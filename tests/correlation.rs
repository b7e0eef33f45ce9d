//! Correlation properties: every log record emitted during a request joins
//! the span tree of that request and never another's.

use axum::http::StatusCode;
use traced_service::telemetry::span::AttributeValue;
use traced_service::telemetry::LogLevel;

mod common;
use common::Harness;

#[tokio::test]
async fn get_root_produces_two_spans_and_two_correlated_logs() {
    let harness = Harness::new();
    let (status, body) = common::send(harness.router(), "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello from traced-service!");

    harness.flush().await;
    let spans = harness.spans.spans();
    assert_eq!(spans.len(), 2);

    let root = spans.iter().find(|s| s.parent_span_id.is_none()).unwrap();
    let child = spans.iter().find(|s| s.parent_span_id.is_some()).unwrap();
    assert_eq!(root.name, "GET /");
    assert_eq!(child.name, "processing");
    assert_eq!(child.trace_id, root.trace_id);
    assert_eq!(child.parent_span_id, Some(root.span_id));
    // The child completes inside the root's extent.
    assert!(child.end_time <= root.end_time);

    assert_eq!(
        root.attribute("http.method"),
        Some(&AttributeValue::String("GET".into()))
    );
    assert_eq!(
        root.attribute("http.route"),
        Some(&AttributeValue::String("/".into()))
    );
    assert_eq!(
        child.attribute("processing.type"),
        Some(&AttributeValue::String("simulated-io".into()))
    );

    let logs = harness.logs.records();
    assert_eq!(logs.len(), 2);
    let root_trace = root.trace_id.to_string();
    for record in &logs {
        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.trace_id.as_deref(), Some(root_trace.as_str()));
        assert!(record.span_id.is_some());
    }
    assert!(logs[0].message.starts_with("Received request: GET /"));
    assert!(logs[1].message.starts_with("Successfully processed request"));
}

#[tokio::test]
async fn get_error_marks_root_span_and_emits_error_log() {
    let harness = Harness::new();
    let (status, body) = common::send(harness.router(), "GET", "/error").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error endpoint");

    harness.flush().await;
    let spans = harness.spans.spans();
    assert_eq!(spans.len(), 2);

    let root = spans.iter().find(|s| s.parent_span_id.is_none()).unwrap();
    let child = spans.iter().find(|s| s.parent_span_id.is_some()).unwrap();
    assert_eq!(root.status, traced_service::telemetry::SpanStatus::Error);
    assert_eq!(root.status_message.as_deref(), Some("Error endpoint called"));
    assert!(root.exception.is_some());
    // The child itself succeeded; its status is untouched.
    assert_eq!(child.status, traced_service::telemetry::SpanStatus::Unset);

    let logs = harness.logs.records();
    let errors: Vec<_> = logs
        .iter()
        .filter(|r| r.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Error endpoint called");
    assert_eq!(
        errors[0].trace_id.as_deref(),
        Some(root.trace_id.to_string().as_str())
    );
}

#[tokio::test]
async fn concurrent_requests_never_share_identifiers() {
    let harness = Harness::new();
    let router = harness.router();
    let (a, b, c) = tokio::join!(
        common::send(router.clone(), "GET", "/a"),
        common::send(router.clone(), "GET", "/b"),
        common::send(router, "GET", "/c"),
    );
    for (status, _) in [&a, &b, &c] {
        assert_eq!(*status, StatusCode::OK);
    }

    harness.flush().await;
    let spans = harness.spans.spans();
    assert_eq!(spans.len(), 6);

    let roots: Vec<_> = spans.iter().filter(|s| s.parent_span_id.is_none()).collect();
    assert_eq!(roots.len(), 3);
    for (i, first) in roots.iter().enumerate() {
        for second in &roots[i + 1..] {
            assert_ne!(first.trace_id, second.trace_id);
        }
    }

    // Every log record carries exactly the trace id of the request whose
    // path it mentions.
    let logs = harness.logs.records();
    for path in ["/a", "/b", "/c"] {
        let root = roots
            .iter()
            .find(|s| s.name == format!("GET {path}"))
            .unwrap();
        let expected = root.trace_id.to_string();
        let matching: Vec<_> = logs
            .iter()
            .filter(|r| r.fields.get("path") == Some(&serde_json::json!(path)))
            .collect();
        assert_eq!(matching.len(), 2);
        for record in matching {
            assert_eq!(record.trace_id.as_deref(), Some(expected.as_str()));
        }
    }
}

#[tokio::test]
async fn any_method_and_path_is_accepted() {
    let harness = Harness::new();
    let (status, body) = common::send(harness.router(), "POST", "/some/nested/path").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello from traced-service!");

    harness.flush().await;
    let spans = harness.spans.spans();
    let root = spans.iter().find(|s| s.parent_span_id.is_none()).unwrap();
    assert_eq!(root.name, "POST /some/nested/path");
}
