//! The asset index: normalized tombamento → location and origin.
//!
//! Insertion is first-write-wins. Whatever order records are fed in is the
//! order that decides which location a duplicated identifier keeps, so
//! callers must feed records in source → sheet → row enumeration order.

use std::collections::HashMap;

use patrimonio_shared::{AssetRecord, normalize_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Where an indexed identifier was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub location: String,
    pub origin: String,
}

/// Read-only lookup structure built once per reconciliation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetIndex {
    entries: HashMap<String, IndexEntry>,
    /// Number of records whose identifier was already present.
    collisions: usize,
}

impl AssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records in enumeration order.
    #[instrument(skip_all)]
    pub fn build<'a>(records: impl IntoIterator<Item = &'a AssetRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }

        if index.collisions > 0 {
            warn!(
                collisions = index.collisions,
                "duplicate identifiers across sources, kept first occurrence"
            );
        }
        debug!(entries = index.len(), "asset index built");

        index
    }

    /// Insert a record unless its identifier is already indexed.
    ///
    /// Returns `true` when the record was inserted.
    pub fn insert(&mut self, record: &AssetRecord) -> bool {
        let key = record.key();
        if key.is_empty() {
            return false;
        }

        if self.entries.contains_key(&key) {
            self.collisions += 1;
            debug!(tombamento = %key, location = %record.source_location, "identifier collision");
            return false;
        }

        self.entries.insert(
            key,
            IndexEntry {
                location: record.source_location.clone(),
                origin: record.origin_tag.clone(),
            },
        );
        true
    }

    /// Look up a raw identifier (normalized before the lookup).
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(&normalize_key(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
