//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router and handler state
//! - Wrap every request in a root span plus a "processing" child span
//! - Emit correlated log records for receipt, success, and failure
//! - Decide the response for the three outcome paths
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - A single fallback handler accepts any method and path; the only
//!   routing decision is the error-path check
//! - The root span ends on every exit path of the handler because the
//!   scoped wrapper owns its end, not the branch logic
//! - A failure inside the child span surfaces as the root's failure only
//!   through the root's own error branch

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::telemetry::logger::fields;
use crate::telemetry::{context, CorrelatedLogger, SpanOrchestrator};

/// Fixed response bodies.
const GREETING_BODY: &str = "Hello from traced-service!";
const ERROR_BODY: &str = "Error endpoint";
const GENERIC_FAILURE_BODY: &str = "Internal server error";

/// Errors arising while handling one request.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The designed failure of the error endpoint.
    #[error("Error endpoint called")]
    ErrorEndpoint,

    /// Anything unexpected escaping the processing logic.
    #[error("processing failed: {0}")]
    Processing(String),
}

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SpanOrchestrator>,
    pub logger: Arc<CorrelatedLogger>,
    pub config: Arc<ServiceConfig>,
}

/// HTTP server for the traced service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given state.
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server until the shutdown signal fires, then stop accepting
    /// new requests and let in-flight ones complete.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router: one fallback handler, any method, any path.
pub fn build_router(state: AppState) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

/// Per-request entry point. Establishes the task-local span scope before
/// any span is created so correlation works across every await inside.
async fn handle_request(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let url = request.uri().to_string();
    context::scope(serve_traced(state, method, path, url)).await
}

async fn serve_traced(state: AppState, method: String, path: String, url: String) -> Response {
    let logger = state.logger.clone();
    let config = state.config.clone();
    let orchestrator = state.orchestrator.clone();
    let span_name = format!("{method} {path}");

    state
        .orchestrator
        .run_scoped(&span_name, |root| async move {
            root.set_attribute("http.method", method.as_str());
            root.set_attribute("http.url", url.as_str());
            root.set_attribute("http.route", path.as_str());

            logger.info(
                &format!("Received request: {method} {path}"),
                fields([("path", json!(path)), ("method", json!(method))]),
            );

            let delay = config.handler.processing_delay();
            let processed = orchestrator
                .run_scoped("processing", |child| async move {
                    child.set_attribute("processing.type", "simulated-io");
                    tokio::time::sleep(delay).await;
                    Ok::<(), HandlerError>(())
                })
                .await;

            let outcome = processed.and_then(|()| {
                if path == config.handler.error_path {
                    Err(HandlerError::ErrorEndpoint)
                } else {
                    Ok(())
                }
            });

            match outcome {
                Ok(()) => {
                    logger.info(
                        &format!("Successfully processed request: {method} {path}"),
                        fields([("path", json!(path))]),
                    );
                    (StatusCode::OK, GREETING_BODY).into_response()
                }
                Err(error @ HandlerError::ErrorEndpoint) => {
                    orchestrator.record_error(&root, &error);
                    logger.error("Error endpoint called", fields([("path", json!(path))]));
                    (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY).into_response()
                }
                Err(error) => {
                    orchestrator.record_error(&root, &error);
                    logger.error(
                        &format!("Request handling failed: {error}"),
                        fields([("path", json!(path)), ("error", json!(format!("{error:?}")))]),
                    );
                    (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_BODY).into_response()
                }
            }
        })
        .await
}
