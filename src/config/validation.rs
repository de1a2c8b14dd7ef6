//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check the upstream URL and metrics address parse
//! - Reject placeholder enum values in subscribed lists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before the classifier is built or the listener binds

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no API key configured (--apikey)")]
    MissingApiKey,

    #[error("classifier.server_url {url:?} is invalid: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("classifier.threat_lists[{0}] contains an unspecified value")]
    UnspecifiedThreatList(usize),

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.classifier.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }

    match Url::parse(&config.classifier.server_url) {
        Ok(url) if url.cannot_be_a_base() => errors.push(ValidationError::InvalidServerUrl {
            url: config.classifier.server_url.clone(),
            reason: "not a base URL".into(),
        }),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidServerUrl {
            url: config.classifier.server_url.clone(),
            reason: e.to_string(),
        }),
    }

    let timeouts = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.lookup_secs", config.timeouts.lookup_secs),
        ("classifier.request_timeout_secs", config.classifier.request_timeout_secs),
        ("classifier.purge_interval_secs", config.classifier.purge_interval_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    for (i, list) in config.classifier.threat_lists.iter().enumerate() {
        if list.is_unspecified() {
            errors.push(ValidationError::UnspecifiedThreatList(i));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
