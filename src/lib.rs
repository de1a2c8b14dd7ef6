//! Threat-lookup gateway library.

pub mod classifier;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod protocol;

pub use classifier::{ApiClassifier, ThreatClassifier};
pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
