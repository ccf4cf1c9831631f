//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the filter can be built from the config
//! - Validate addresses, the upstream URL and timeouts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::extract::{ConfigurationError, ExtractCnLayer};

/// A single semantic problem with the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("extract_cn: {0}")]
    ExtractCn(#[from] ConfigurationError),

    #[error("listener.bind_address: invalid socket address {0:?}")]
    BindAddress(String),

    #[error("upstream.url: {0}")]
    UpstreamUrl(String),

    #[error("upstream.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observability.metrics_address: invalid socket address {0:?}")]
    MetricsAddress(String),
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors: Vec<ValidationError> = Vec::new();

    if let Err(e) = ExtractCnLayer::new(&config.extract_cn) {
        errors.push(ValidationError::ExtractCn(e));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_upstream_url(&config.upstream.url) {
        errors.push(ValidationError::UpstreamUrl(reason));
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upstream must be a plain `http` URL with a host; TLS is not terminated here.
fn check_upstream_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("{:?} is not a valid URL: {}", raw, e))?;

    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, expected \"http\"", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("{:?} has no host", raw));
    }
    if url.path() != "/" || url.query().is_some() {
        return Err(format!("{:?} must not have a path or query", raw));
    }
    Ok(())
}
