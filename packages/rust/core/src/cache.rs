//! Index snapshot cache.
//!
//! Scanning a network share full of workbooks is slow, so a built index can
//! be persisted and reused for a while. A snapshot is only reused when it is
//! younger than the TTL and was built from the same scan configuration.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use patrimonio_registry::AssetIndex;
use patrimonio_shared::{PatrimonioError, Result, ScanConfig};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Upper bound on the configured TTL (ten years).
const MAX_TTL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// A persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub built_at: DateTime<Utc>,
    /// [`fingerprint`] of the scan configuration the index was built from.
    pub fingerprint: String,
    pub index: AssetIndex,
}

/// SHA-256 over the scan configuration (folders, schema, location rules, origins).
pub fn fingerprint(config: &ScanConfig) -> Result<String> {
    let bytes = serde_json::to_vec(config)
        .map_err(|e| PatrimonioError::validation(format!("cannot fingerprint scan config: {e}")))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Where snapshots live and how long they stay valid.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub path: PathBuf,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(path: impl Into<PathBuf>, ttl_minutes: u64) -> Self {
        Self {
            path: path.into(),
            ttl: Duration::minutes(ttl_minutes.min(MAX_TTL_MINUTES) as i64),
        }
    }

    /// Return the cached index if it is fresh at `now` and matches `fingerprint`.
    ///
    /// Any problem reading the snapshot means a cache miss, never an error.
    pub fn load_fresh(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<AssetIndex> {
        if self.ttl <= Duration::zero() {
            return None;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no index snapshot");
                return None;
            }
        };

        let snapshot: IndexSnapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt index snapshot");
                return None;
            }
        };

        if snapshot.fingerprint != fingerprint {
            debug!("index snapshot built from a different configuration");
            return None;
        }

        let age = now.signed_duration_since(snapshot.built_at);
        if age < Duration::zero() || age >= self.ttl {
            debug!(age_secs = age.num_seconds(), "index snapshot expired");
            return None;
        }

        debug!(
            entries = snapshot.index.len(),
            age_secs = age.num_seconds(),
            "index snapshot reused"
        );
        Some(snapshot.index)
    }

    /// Persist a snapshot, creating the parent directory if needed.
    pub fn store(&self, snapshot: &IndexSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PatrimonioError::io(parent, e))?;
        }
        let json = serde_json::to_string(snapshot)
            .map_err(|e| PatrimonioError::validation(format!("cannot serialize snapshot: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| PatrimonioError::io(&self.path, e))
    }
}
