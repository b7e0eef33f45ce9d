//! Configuration loading from the environment.

use std::env;

use crate::config::schema::ServiceConfig;

/// Build the service configuration: defaults overridden by environment
/// variables where set.
///
/// Recognized variables:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` — collector endpoint for span export
/// - `BIND_ADDRESS` — listener bind address
/// - `DEPLOYMENT_ENVIRONMENT` — optional environment tag on the resource
pub fn load_from_env() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    if let Some(endpoint) = non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.exporter.otlp_endpoint = endpoint;
    }
    if let Some(bind_address) = non_empty_var("BIND_ADDRESS") {
        config.listener.bind_address = bind_address;
    }
    if let Some(environment) = non_empty_var("DEPLOYMENT_ENVIRONMENT") {
        config.identity.environment = Some(environment);
    }
    config
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
