//! End-to-end flows: registry scan → index → lookup / report verification.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use patrimonio_registry::{
    AssetIndex, CancelFlag, RegistryScan, ScanProgress, SourceFailure, WorkbookReader,
    scan_registry,
};
use patrimonio_report::{DocumentLayout, ReportParser};
use patrimonio_shared::{
    AppConfig, AssetField, MarkerConfig, PatrimonioError, ReportConfig, Result, ScanConfig,
    ScannedRecord, SearchOptions,
};

use crate::annotate::{JsonLinesAnnotator, Marker, apply_markers, map_markers};
use crate::cache::{CachePolicy, IndexSnapshot, fingerprint};
use crate::query::{ReconciliationEntry, ReconciliationResult, lookup, reconcile};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a registry workbook is about to be read.
    fn source_scanned(&self, file: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_scanned(&self, _file: &str, _current: usize, _total: usize) {}
    fn done(&self) {}
}

/// Adapts a `ProgressReporter` to the registry's `ScanProgress` interface.
struct PipelineScanProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl ScanProgress for PipelineScanProgress<'_> {
    fn source_started(&self, path: &Path, current: usize, total: usize) {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        self.inner.source_scanned(&file, current, total);
    }
}

/// Scan with progress forwarded to a pipeline reporter.
fn scan(
    config: &ScanConfig,
    reader: &dyn WorkbookReader,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> RegistryScan {
    progress.phase("Scanning registry");
    scan_registry(config, reader, &PipelineScanProgress { inner: progress }, cancel)
}

// ---------------------------------------------------------------------------
// Scan summary
// ---------------------------------------------------------------------------

/// What a registry scan skipped, for reporting to the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub sources_scanned: usize,
    pub failures: Vec<SourceFailure>,
    pub missing_folders: Vec<PathBuf>,
    pub rows_skipped: usize,
    pub interrupted: bool,
}

impl From<&RegistryScan> for ScanSummary {
    fn from(scan: &RegistryScan) -> Self {
        Self {
            sources_scanned: scan.sources_scanned,
            failures: scan.failures.clone(),
            missing_folders: scan.missing_folders.clone(),
            rows_skipped: scan.rows_skipped,
            interrupted: scan.interrupted,
        }
    }
}

// ---------------------------------------------------------------------------
// Index build
// ---------------------------------------------------------------------------

/// How the index for a session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexSource {
    Scanned,
    Cached,
}

/// An index plus how it was built.
#[derive(Debug)]
pub struct IndexBuild {
    pub index: AssetIndex,
    pub source: IndexSource,
    /// Empty when the index came from the cache.
    pub scan: ScanSummary,
}

/// Build the asset index, reusing a fresh cached snapshot when allowed.
///
/// Partial scans (interrupted, a folder missing, or sources skipped) yield a
/// valid index that is never cached.
#[instrument(skip_all, fields(folders = config.folders.len(), cached = cache.is_some()))]
pub fn build_index(
    config: &ScanConfig,
    cache: Option<&CachePolicy>,
    reader: &dyn WorkbookReader,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<IndexBuild> {
    let fp = match cache {
        Some(_) => Some(fingerprint(config)?),
        None => None,
    };

    if let (Some(policy), Some(fp)) = (cache, fp.as_deref()) {
        if let Some(index) = policy.load_fresh(fp, Utc::now()) {
            info!(entries = index.len(), "using cached asset index");
            return Ok(IndexBuild {
                index,
                source: IndexSource::Cached,
                scan: ScanSummary::default(),
            });
        }
    }

    let registry = scan(config, reader, progress, cancel);
    progress.phase("Building index");
    let index = registry.index();

    if let (Some(policy), Some(fp)) = (cache, fp) {
        if let Some(reason) = incomplete_reason(&registry) {
            warn!(reason, "index is partial, snapshot not saved");
        } else {
            let snapshot = IndexSnapshot {
                built_at: Utc::now(),
                fingerprint: fp,
                index: index.clone(),
            };
            if let Err(e) = policy.store(&snapshot) {
                warn!(error = %e, "failed to save index snapshot");
            }
        }
    }

    info!(
        entries = index.len(),
        collisions = index.collisions(),
        "asset index ready"
    );

    Ok(IndexBuild {
        index,
        source: IndexSource::Scanned,
        scan: ScanSummary::from(&registry),
    })
}

/// Why a scan cannot stand in for the whole registry, if it cannot.
fn incomplete_reason(scan: &RegistryScan) -> Option<&'static str> {
    if scan.interrupted {
        Some("scan interrupted")
    } else if !scan.missing_folders.is_empty() {
        Some("registry folder unavailable")
    } else if !scan.failures.is_empty() {
        Some("unreadable sources skipped")
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Result of a registry lookup.
#[derive(Debug)]
pub struct LookupOutcome {
    /// Matching records in source-enumeration order.
    pub matches: Vec<ScannedRecord>,
    pub scan: ScanSummary,
}

/// Scan the registry and return every record whose `field` matches `value`.
#[instrument(skip_all, fields(%field, value))]
pub fn search_registry(
    config: &ScanConfig,
    field: AssetField,
    value: &str,
    options: &SearchOptions,
    reader: &dyn WorkbookReader,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> LookupOutcome {
    let registry = scan(config, reader, progress, cancel);
    let matches: Vec<ScannedRecord> = lookup(&registry.records, field, value, options)
        .into_iter()
        .cloned()
        .collect();

    info!(matches = matches.len(), "lookup complete");
    progress.done();

    LookupOutcome {
        matches,
        scan: ScanSummary::from(&registry),
    }
}

// ---------------------------------------------------------------------------
// Report verification
// ---------------------------------------------------------------------------

/// Configuration for [`verify_report`].
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub scan: ScanConfig,
    pub report: ReportConfig,
    pub markers: MarkerConfig,
    /// `None` always scans.
    pub cache: Option<CachePolicy>,
}

impl VerifyConfig {
    /// Runtime config from the app config, with an optional snapshot cache.
    pub fn from_app(config: &AppConfig, cache: Option<CachePolicy>) -> Self {
        Self {
            scan: ScanConfig::from(config),
            report: config.report.clone(),
            markers: config.markers.clone(),
            cache,
        }
    }
}

/// Result of verifying a report against the registry.
#[derive(Debug)]
pub struct VerifyOutcome {
    pub result: ReconciliationResult,
    pub markers: Vec<Marker>,
    pub index_source: IndexSource,
    pub index_entries: usize,
    pub collisions: usize,
    pub scan: ScanSummary,
    pub elapsed: std::time::Duration,
}

/// Extract report items, reconcile them against the registry, and place markers.
#[instrument(skip_all, fields(pages = layout.pages.len()))]
pub fn verify_report(
    config: &VerifyConfig,
    layout: &DocumentLayout,
    reader: &dyn WorkbookReader,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<VerifyOutcome> {
    let start = Instant::now();

    progress.phase("Reading report");
    let items = ReportParser::new(&config.report).extract_document(layout);
    if items.is_empty() {
        warn!("no asset lines recognised in report");
    }
    info!(items = items.len(), "report items extracted");

    let build = build_index(&config.scan, config.cache.as_ref(), reader, progress, cancel)?;

    progress.phase("Reconciling");
    let result = reconcile(&items, &build.index);
    let markers = map_markers(layout, &result, &config.markers);

    let outcome = VerifyOutcome {
        index_entries: build.index.len(),
        collisions: build.index.collisions(),
        result,
        markers,
        index_source: build.source,
        scan: build.scan,
        elapsed: start.elapsed(),
    };

    progress.done();

    info!(
        items = outcome.result.len(),
        found = outcome.result.found_count(),
        missing = outcome.result.missing_count(),
        markers = outcome.markers.len(),
        elapsed_ms = outcome.elapsed.as_millis(),
        "report verification complete"
    );

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct VerifyExport<'a> {
    generated_at: String,
    index_source: IndexSource,
    total: usize,
    found: usize,
    missing: usize,
    scan: &'a ScanSummary,
    entries: &'a [ReconciliationEntry],
    markers: &'a [Marker],
}

/// Write the verification result (entries in report order plus marker
/// drawing instructions) as pretty JSON.
pub fn write_export(path: &Path, outcome: &VerifyOutcome) -> Result<()> {
    let export = VerifyExport {
        generated_at: Utc::now().to_rfc3339(),
        index_source: outcome.index_source,
        total: outcome.result.len(),
        found: outcome.result.found_count(),
        missing: outcome.result.missing_count(),
        scan: &outcome.scan,
        entries: outcome.result.entries(),
        markers: &outcome.markers,
    };

    let json = serde_json::to_string_pretty(&export)
        .map_err(|e| PatrimonioError::validation(format!("cannot serialize export: {e}")))?;
    std::fs::write(path, json).map_err(|e| PatrimonioError::io(path, e))
}

/// Write the marker strokes as JSON lines for an external drawing tool.
/// Returns the number of strokes written.
pub fn write_strokes(path: &Path, markers: &[Marker]) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|e| PatrimonioError::io(path, e))?;
    let mut annotator = JsonLinesAnnotator::new(std::io::BufWriter::new(file));
    let drawn = apply_markers(markers, &mut annotator)?;
    annotator
        .into_inner()
        .flush()
        .map_err(|e| PatrimonioError::io(path, e))?;
    Ok(drawn)
}
