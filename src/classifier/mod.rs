//! Threat classifier subsystem.
//!
//! # Data Flow
//! ```text
//! lookup handler
//!     → ThreatClassifier::lookup_urls (one batch per request)
//!         → api.rs: VerdictStore hit?  → database / cache verdict
//!                   miss               → remote Lookup API (≤ 500 URLs per call)
//!     ← per-URL Vec<UrlThreat>, same order as the input
//!
//! status handler
//!     → ThreatClassifier::status → (Stats, last error)
//! ```
//!
//! # Design Decisions
//! - The gateway only sees the trait; the backing store and transport are
//!   implementation details of the classifier
//! - Implementations must be safe for concurrent use; handlers hold no locks
//! - A reported last error is data, not a failed status call

pub mod api;
pub mod store;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::protocol::ThreatDescriptor;

pub use api::ApiClassifier;
pub use store::VerdictStore;

/// A threat list hit for one looked-up URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlThreat {
    /// The URL expression that matched.
    pub pattern: String,
    pub descriptor: ThreatDescriptor,
}

/// Lookup counters, serialized with the field names clients already parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "QueriesByDatabase")]
    pub queries_by_database: u64,
    #[serde(rename = "QueriesByCache")]
    pub queries_by_cache: u64,
    #[serde(rename = "QueriesByAPI")]
    pub queries_by_api: u64,
    #[serde(rename = "QueriesFail")]
    pub queries_fail: u64,
}

/// Errors reported by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Decode(String),

    #[error("classifier lookup timed out after {0} seconds")]
    Timeout(u64),

    #[error("classifier returned {actual} results for {expected} urls")]
    ResultCount { expected: usize, actual: usize },

    #[error("invalid classifier configuration: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),
}

/// The collaborator that owns threat data and answers URL lookups.
pub trait ThreatClassifier: Send + Sync {
    /// Look up a batch of URLs. The result holds one entry per input URL,
    /// in input order; an entry may contain duplicate descriptors.
    fn lookup_urls<'a>(
        &'a self,
        urls: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<UrlThreat>>, ClassifierError>>;

    /// Current counters and the most recent internal error, if any.
    fn status(&self) -> (Stats, Option<ClassifierError>);
}

/// Lock-free counters behind [`Stats`].
#[derive(Debug, Default)]
pub struct StatsCounters {
    by_database: AtomicU64,
    by_cache: AtomicU64,
    by_api: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounters {
    pub fn record_database(&self, n: u64) {
        self.by_database.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_cache(&self, n: u64) {
        self.by_cache.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_api(&self, n: u64) {
        self.by_api.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_failure(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            queries_by_database: self.by_database.load(Ordering::Relaxed),
            queries_by_cache: self.by_cache.load(Ordering::Relaxed),
            queries_by_api: self.by_api.load(Ordering::Relaxed),
            queries_fail: self.failed.load(Ordering::Relaxed),
        }
    }
}
