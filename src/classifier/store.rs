//! Verdict store and its on-disk database.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::classifier::{ClassifierError, UrlThreat};

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictOrigin {
    /// Loaded from the database file at startup.
    Database,
    /// Learned from an upstream lookup during this process.
    Lookup,
}

fn loaded_origin() -> VerdictOrigin {
    VerdictOrigin::Database
}

/// Cached answer for one URL. An empty `threats` list is a negative verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub threats: Vec<UrlThreat>,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: u64,
    #[serde(skip, default = "loaded_origin")]
    pub origin: VerdictOrigin,
}

impl Verdict {
    pub fn is_fresh(&self) -> bool {
        self.expires_at > now_secs()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A thread-safe URL → verdict map, optionally persisted as JSON.
#[derive(Debug, Default)]
pub struct VerdictStore {
    inner: DashMap<String, Verdict>,
    persistence_path: Option<PathBuf>,
}

impl VerdictStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: DashMap::new(),
            persistence_path,
        }
    }

    /// Load from `path`; a missing file yields an empty store bound to it.
    pub fn load_from_file(path: &Path) -> Result<Self, ClassifierError> {
        let store = Self::new(Some(path.to_path_buf()));
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No verdict database yet, starting empty");
                return Ok(store);
            }
            Err(e) => return Err(ClassifierError::Database(format!("{}: {}", path.display(), e))),
        };

        let entries: HashMap<String, Verdict> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ClassifierError::Database(format!("{}: {}", path.display(), e)))?;

        let mut expired = 0;
        for (url, verdict) in entries {
            if verdict.is_fresh() {
                store.inner.insert(url, verdict);
            } else {
                expired += 1;
            }
        }
        tracing::info!(
            path = %path.display(),
            loaded = store.inner.len(),
            expired,
            "Loaded verdict database"
        );
        Ok(store)
    }

    /// Fresh verdict for `url`. Expired entries are evicted on the way.
    pub fn get(&self, url: &str) -> Option<Verdict> {
        let verdict = self.inner.get(url)?.value().clone();
        if verdict.is_fresh() {
            Some(verdict)
        } else {
            self.inner.remove_if(url, |_, v| !v.is_fresh());
            None
        }
    }

    pub fn insert(&self, url: String, threats: Vec<UrlThreat>, ttl: Duration) {
        let verdict = Verdict {
            threats,
            expires_at: now_secs().saturating_add(ttl.as_secs()),
            origin: VerdictOrigin::Lookup,
        };
        self.inner.insert(url, verdict);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired verdict, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_secs();
        let mut removed = 0;
        self.inner.retain(|_, verdict| {
            let fresh = verdict.expires_at > now;
            if !fresh {
                removed += 1;
            }
            fresh
        });
        removed
    }

    /// Write fresh verdicts to the database file, if one is configured.
    pub fn save_to_file(&self) -> Result<(), ClassifierError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        self.purge_expired();

        let snapshot: HashMap<String, Verdict> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let io_err = |e: std::io::Error| ClassifierError::Database(format!("{}: {}", path.display(), e));
        let tmp = path.with_extension("tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)
            .map_err(|e| ClassifierError::Database(format!("{}: {}", path.display(), e)))?;
        writer.flush().map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        tracing::info!(path = %path.display(), verdicts = snapshot.len(), "Saved verdict database");
        Ok(())
    }
}
