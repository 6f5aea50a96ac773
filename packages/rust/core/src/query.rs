//! Point lookups over scanned records and bulk reconciliation against the index.

use patrimonio_registry::AssetIndex;
use patrimonio_shared::{AssetField, MatchMode, ReportItem, ScannedRecord, SearchOptions};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Compare a field value against a query under the given options.
///
/// Both sides are trimmed. Without case sensitivity both are upper-cased
/// before comparison. An empty query matches nothing.
pub fn field_matches(field_value: &str, query: &str, options: &SearchOptions) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }
    let field_value = field_value.trim();

    let (field_value, query) = if options.case_sensitive {
        (field_value.to_string(), query.to_string())
    } else {
        (field_value.to_uppercase(), query.to_uppercase())
    };

    match options.match_mode {
        MatchMode::Exact => field_value == query,
        MatchMode::Partial => field_value.contains(&query),
    }
}

/// Every record whose `field` matches `value`, in source-enumeration order.
///
/// Scans all records rather than the index, since only the tombamento is
/// indexed. Never stops at the first hit.
pub fn lookup<'a>(
    records: &'a [ScannedRecord],
    field: AssetField,
    value: &str,
    options: &SearchOptions,
) -> Vec<&'a ScannedRecord> {
    if value.trim().is_empty() {
        return Vec::new();
    }

    records
        .iter()
        .filter(|r| field_matches(field.value_of(&r.record), value, options))
        .collect()
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconciliation outcome for one report item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationEntry {
    #[serde(flatten)]
    pub item: ReportItem,
    pub found: bool,
    /// Location recorded in the index, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Per-item results in report order. One entry per input candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    entries: Vec<ReconciliationEntry>,
}

impl ReconciliationResult {
    pub fn entries(&self) -> &[ReconciliationEntry] {
        &self.entries
    }

    /// First entry for the given candidate identifier.
    pub fn get(&self, candidate_id: &str) -> Option<&ReconciliationEntry> {
        self.entries.iter().find(|e| e.item.candidate_id == candidate_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn found_count(&self) -> usize {
        self.entries.iter().filter(|e| e.found).count()
    }

    pub fn missing_count(&self) -> usize {
        self.len() - self.found_count()
    }
}

/// Test each candidate for membership in the index, preserving input order
/// and cardinality. Pure: no I/O, no side effects.
pub fn reconcile(candidates: &[ReportItem], index: &AssetIndex) -> ReconciliationResult {
    let entries = candidates
        .iter()
        .map(|item| {
            let hit = index.get(&item.candidate_id);
            ReconciliationEntry {
                item: item.clone(),
                found: hit.is_some(),
                location: hit.map(|e| e.location.clone()),
                origin: hit.map(|e| e.origin.clone()),
            }
        })
        .collect();

    ReconciliationResult { entries }
}
