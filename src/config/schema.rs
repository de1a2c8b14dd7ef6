//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol::{ThreatDescriptor, DEFAULT_THREAT_LISTS};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream classifier settings.
    pub classifier: ClassifierConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "localhost:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:8080".to_string(),
        }
    }
}

/// Classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// API key for the upstream Lookup API. Required.
    pub api_key: String,

    /// Path of the verdict database file.
    pub db_path: Option<PathBuf>,

    /// Base URL of the upstream Lookup API.
    pub server_url: String,

    /// Client identifier sent upstream.
    pub client_id: String,

    /// Verdict lifetime when the upstream gives none, in seconds.
    pub cache_ttl_secs: u64,

    /// Upstream request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How often expired verdicts are evicted, in seconds.
    pub purge_interval_secs: u64,

    /// Subscribed threat lists; empty means the default set.
    pub threat_lists: Vec<ThreatDescriptor>,
}

impl ClassifierConfig {
    /// Configured lists in configuration order, or the default set.
    pub fn subscribed_lists(&self) -> Vec<ThreatDescriptor> {
        if self.threat_lists.is_empty() {
            DEFAULT_THREAT_LISTS.to_vec()
        } else {
            self.threat_lists.clone()
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            db_path: None,
            server_url: "https://safebrowsing.googleapis.com".to_string(),
            client_id: "threat-gateway".to_string(),
            cache_ttl_secs: 300,
            request_timeout_secs: 10,
            purge_interval_secs: 60,
            threat_lists: Vec::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Classifier lookup timeout per request in seconds.
    pub lookup_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            lookup_secs: 15,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
