//! Service resource identity.

use crate::config::IdentityConfig;

/// Static identity attached to every exported span batch and log record.
///
/// Created once at process start and shared by reference; never mutated.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub service_name: String,
    pub service_version: String,
    pub environment: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(service_name: &str, service_version: &str, environment: Option<String>) -> Self {
        Self {
            service_name: service_name.to_string(),
            service_version: service_version.to_string(),
            environment,
        }
    }

    pub fn from_config(identity: &IdentityConfig) -> Self {
        Self {
            service_name: identity.service_name.clone(),
            service_version: identity.service_version.clone(),
            environment: identity.environment.clone(),
        }
    }
}
