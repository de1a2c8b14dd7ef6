//! Classifier backed by the remote Lookup API.
//!
//! # Responsibilities
//! - Answer lookups from the verdict store when a fresh verdict exists
//! - Batch the remaining URLs into upstream `threatMatches:find` calls
//! - Cache upstream verdicts for the durations the upstream asks for
//! - Keep lookup counters and the last upstream error for `/status`

use axum::http::header::CONTENT_TYPE;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;
use url::Url;

use crate::classifier::store::{VerdictOrigin, VerdictStore};
use crate::classifier::{ClassifierError, Stats, StatsCounters, ThreatClassifier, UrlThreat};
use crate::config::ClassifierConfig;
use crate::protocol::{
    ClientInfo, Encoding, FindThreatMatchesRequest, FindThreatMatchesResponse, ThreatDescriptor,
    ThreatEntry, ThreatInfo,
};

/// Upstream limit on entries per `threatMatches:find` request.
pub const MAX_ENTRIES_PER_REQUEST: usize = 500;

const FIND_THREAT_MATCHES: &str = "v4/threatMatches:find";

pub struct ApiClassifier {
    http: reqwest::Client,
    endpoint: Url,
    client_info: ClientInfo,
    threat_lists: Vec<ThreatDescriptor>,
    default_ttl: Duration,
    store: VerdictStore,
    stats: StatsCounters,
    last_error: Mutex<Option<ClassifierError>>,
}

/// Upstream answer for one chunk of URLs.
struct ChunkVerdicts {
    threats: HashMap<String, Vec<UrlThreat>>,
    positive_ttl: HashMap<String, Duration>,
    negative_ttl: Option<Duration>,
}

impl ApiClassifier {
    /// Build the classifier, loading the verdict database if one is configured.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        if config.api_key.is_empty() {
            return Err(ClassifierError::Config("missing API key".into()));
        }

        let mut endpoint = Url::parse(&config.server_url)
            .map_err(|e| ClassifierError::Config(format!("server_url {:?}: {}", config.server_url, e)))?;
        let path = format!("{}/{}", endpoint.path().trim_end_matches('/'), FIND_THREAT_MATCHES);
        endpoint.set_path(&path);
        endpoint.query_pairs_mut().append_pair("key", &config.api_key);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Config(e.to_string()))?;

        let store = match &config.db_path {
            Some(path) => VerdictStore::load_from_file(path)?,
            None => VerdictStore::new(None),
        };

        tracing::info!(
            server_url = %config.server_url,
            threat_lists = config.subscribed_lists().len(),
            verdicts = store.len(),
            "Lookup API classifier initialized"
        );

        Ok(Self {
            http,
            endpoint,
            client_info: ClientInfo {
                client_id: config.client_id.clone(),
                client_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            threat_lists: config.subscribed_lists(),
            default_ttl: Duration::from_secs(config.cache_ttl_secs),
            store,
            stats: StatsCounters::default(),
            last_error: Mutex::new(None),
        })
    }

    /// Persist the verdict store to the database file.
    pub fn persist(&self) -> Result<(), ClassifierError> {
        self.store.save_to_file()
    }

    /// Evict expired verdicts every `every` until `shutdown` fires.
    pub async fn run_purger(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = every.as_secs_f64(), "Verdict purger starting");

        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.store.len(), "Purged expired verdicts");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Verdict purger received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn lookup(&self, urls: &[String]) -> Result<Vec<Vec<UrlThreat>>, ClassifierError> {
        let mut results: Vec<Option<Vec<UrlThreat>>> = vec![None; urls.len()];
        let mut misses = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            match self.store.get(url) {
                Some(verdict) => {
                    match verdict.origin {
                        VerdictOrigin::Database => self.stats.record_database(1),
                        VerdictOrigin::Lookup => self.stats.record_cache(1),
                    }
                    results[i] = Some(verdict.threats);
                }
                None => misses.push(i),
            }
        }

        if !misses.is_empty() {
            let mut seen = HashSet::new();
            let pending: Vec<&str> = misses
                .iter()
                .map(|&i| urls[i].as_str())
                .filter(|url| seen.insert(*url))
                .collect();

            let mut resolved: HashMap<String, Vec<UrlThreat>> = HashMap::new();
            for chunk in pending.chunks(MAX_ENTRIES_PER_REQUEST) {
                let verdicts = match self.fetch(chunk).await {
                    Ok(verdicts) => verdicts,
                    Err(e) => {
                        tracing::warn!(error = %e, urls = chunk.len(), "Upstream lookup failed");
                        self.stats.record_failure(misses.len() as u64);
                        self.set_last_error(Some(e.clone()));
                        return Err(e);
                    }
                };
                self.remember(chunk, &verdicts);
                resolved.extend(verdicts.threats);
            }

            self.stats.record_api(misses.len() as u64);
            self.set_last_error(None);
            for i in misses {
                results[i] = Some(resolved.get(&urls[i]).cloned().unwrap_or_default());
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }

    async fn fetch(&self, urls: &[&str]) -> Result<ChunkVerdicts, ClassifierError> {
        let request = self.upstream_request(urls);
        let body = Encoding::Json
            .encode(&request)
            .map_err(|e| ClassifierError::Upstream(e.to_string()))?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, Encoding::Json.mime())
            .body(body)
            .send()
            .await
            .map_err(|e| ClassifierError::Upstream(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClassifierError::Upstream(e.to_string()))?;
        if !status.is_success() {
            return Err(ClassifierError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        let decoded: FindThreatMatchesResponse = Encoding::Json
            .decode(&bytes)
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;
        Ok(group_matches(urls, decoded))
    }

    fn upstream_request(&self, urls: &[&str]) -> FindThreatMatchesRequest {
        let mut threat_types = Vec::new();
        let mut platform_types = Vec::new();
        let mut threat_entry_types = Vec::new();
        for list in &self.threat_lists {
            push_unique(&mut threat_types, list.threat_type.into());
            push_unique(&mut platform_types, list.platform_type.into());
            push_unique(&mut threat_entry_types, list.threat_entry_type.into());
        }

        FindThreatMatchesRequest {
            client: Some(self.client_info.clone()),
            threat_info: Some(ThreatInfo {
                threat_types,
                platform_types,
                threat_entries: urls.iter().map(|url| ThreatEntry::url(*url)).collect(),
                threat_entry_types,
            }),
        }
    }

    fn remember(&self, urls: &[&str], verdicts: &ChunkVerdicts) {
        let negative_ttl = verdicts.negative_ttl.unwrap_or(self.default_ttl);
        for url in urls {
            match verdicts.threats.get(*url) {
                Some(threats) => {
                    let ttl = verdicts
                        .positive_ttl
                        .get(*url)
                        .copied()
                        .unwrap_or(self.default_ttl);
                    self.store.insert(url.to_string(), threats.clone(), ttl);
                }
                None => self.store.insert(url.to_string(), Vec::new(), negative_ttl),
            }
        }
    }

    fn set_last_error(&self, error: Option<ClassifierError>) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = error;
        }
    }
}

fn push_unique(values: &mut Vec<i32>, value: i32) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Attribute upstream matches back to the queried URLs.
fn group_matches(urls: &[&str], response: FindThreatMatchesResponse) -> ChunkVerdicts {
    let queried: HashSet<&str> = urls.iter().copied().collect();
    let mut threats: HashMap<String, Vec<UrlThreat>> = HashMap::new();
    let mut positive_ttl: HashMap<String, Duration> = HashMap::new();

    for m in &response.matches {
        let Some(url) = m.url().filter(|url| queried.contains(url)) else {
            tracing::debug!(threat = ?m.threat, "Ignoring upstream match for unqueried entry");
            continue;
        };
        threats.entry(url.to_string()).or_default().push(UrlThreat {
            pattern: url.to_string(),
            descriptor: m.descriptor(),
        });
        if let Some(ttl) = m.cache_duration.and_then(|d| d.to_std()) {
            let longest = positive_ttl.entry(url.to_string()).or_insert(ttl);
            *longest = (*longest).max(ttl);
        }
    }

    ChunkVerdicts {
        threats,
        positive_ttl,
        negative_ttl: response.negative_cache_duration.and_then(|d| d.to_std()),
    }
}

impl ThreatClassifier for ApiClassifier {
    fn lookup_urls<'a>(
        &'a self,
        urls: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<UrlThreat>>, ClassifierError>> {
        self.lookup(urls).boxed()
    }

    fn status(&self) -> (Stats, Option<ClassifierError>) {
        let last_error = self
            .last_error
            .lock()
            .map(|last| last.clone())
            .unwrap_or_default();
        (self.stats.snapshot(), last_error)
    }
}
