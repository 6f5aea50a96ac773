//! Registry scan: root folders → workbooks → sheets → records.
//!
//! Sources are processed sequentially in a fixed order: folders as
//! configured, files sorted by name within each folder. That order is what
//! makes first-write-wins deterministic. A missing folder contributes
//! nothing; an unreadable workbook is recorded and skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use patrimonio_shared::{ScanConfig, ScannedRecord};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::extractor::{SourceContext, extract_records};
use crate::index::AssetIndex;
use crate::location::{LocationResolver, classify_origin};
use crate::reader::WorkbookReader;

// ---------------------------------------------------------------------------
// Cancellation & progress
// ---------------------------------------------------------------------------

/// Cooperative cancellation, checked between source files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback for registry scans.
pub trait ScanProgress: Send + Sync {
    /// Called before a source file is read.
    fn source_started(&self, path: &Path, current: usize, total: usize);
}

/// No-op progress for headless/test usage.
pub struct SilentScanProgress;

impl ScanProgress for SilentScanProgress {
    fn source_started(&self, _path: &Path, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Source discovery
// ---------------------------------------------------------------------------

/// A workbook to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Origin tag of the root folder the file was found in.
    pub origin: String,
}

/// A source that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Workbooks found under the configured folders, in scan order.
#[derive(Debug, Default)]
pub struct SourceListing {
    pub sources: Vec<SourceFile>,
    /// Configured folders that do not exist.
    pub missing_folders: Vec<PathBuf>,
    /// Folders that exist but could not be listed.
    pub failures: Vec<SourceFailure>,
}

/// List registry workbooks in deterministic order.
#[instrument(skip_all, fields(folders = config.folders.len()))]
pub fn discover_sources(config: &ScanConfig) -> SourceListing {
    let mut listing = SourceListing::default();

    for folder in &config.folders {
        if !folder.is_dir() {
            warn!(folder = %folder.display(), "registry folder not found");
            listing.missing_folders.push(folder.clone());
            continue;
        }

        let entries = match std::fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "cannot list registry folder");
                listing.failures.push(SourceFailure {
                    path: folder.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_registry_file(path, &config.extensions))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let origin = classify_origin(folder, &config.origins, &config.unknown_origin);
        debug!(folder = %folder.display(), files = files.len(), %origin, "registry folder listed");

        listing
            .sources
            .extend(files.into_iter().map(|path| SourceFile {
                path,
                origin: origin.clone(),
            }));
    }

    listing
}

fn is_registry_file(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    // Office lock files (`~$SALA 1.xlsx`)
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Result of scanning the registry.
#[derive(Debug, Default)]
pub struct RegistryScan {
    /// Records in source → sheet → row order.
    pub records: Vec<ScannedRecord>,
    /// Workbooks read successfully.
    pub sources_scanned: usize,
    /// Folders or workbooks skipped because they could not be read.
    pub failures: Vec<SourceFailure>,
    pub missing_folders: Vec<PathBuf>,
    /// Malformed rows skipped across all sheets.
    pub rows_skipped: usize,
    /// The scan stopped early on cancellation. Records gathered so far are valid.
    pub interrupted: bool,
}

impl RegistryScan {
    /// Build the identifier index from the scanned records.
    pub fn index(&self) -> AssetIndex {
        AssetIndex::build(self.records.iter().map(|r| &r.record))
    }
}

/// Discover and scan every registry workbook.
pub fn scan_registry(
    config: &ScanConfig,
    reader: &dyn WorkbookReader,
    progress: &dyn ScanProgress,
    cancel: &CancelFlag,
) -> RegistryScan {
    let listing = discover_sources(config);
    let mut scan = scan_sources(&listing.sources, config, reader, progress, cancel);
    scan.missing_folders = listing.missing_folders;

    let mut failures = listing.failures;
    failures.append(&mut scan.failures);
    scan.failures = failures;
    scan
}

/// Scan the given workbooks in order.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn scan_sources(
    sources: &[SourceFile],
    config: &ScanConfig,
    reader: &dyn WorkbookReader,
    progress: &dyn ScanProgress,
    cancel: &CancelFlag,
) -> RegistryScan {
    let resolver = LocationResolver::new(&config.location);
    let mut scan = RegistryScan::default();
    let total = sources.len();

    for (i, source) in sources.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(done = i, total, "registry scan cancelled");
            scan.interrupted = true;
            break;
        }

        progress.source_started(&source.path, i + 1, total);

        let workbook = match reader.read_workbook(&source.path) {
            Ok(workbook) => workbook,
            Err(e) => {
                warn!(path = %source.path.display(), error = %e, "skipping unreadable workbook");
                scan.failures.push(SourceFailure {
                    path: source.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let file_name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let context = SourceContext {
            location: resolver.resolve(&file_name),
            file_name,
            origin: source.origin.clone(),
        };

        let before = scan.records.len();
        for unreadable in &workbook.unreadable_sheets {
            scan.failures.push(SourceFailure {
                path: source.path.clone(),
                reason: format!("sheet '{}': {}", unreadable.sheet, unreadable.message),
            });
        }

        for sheet in &workbook.sheets {
            let extract = extract_records(sheet, &config.columns, config.header_rows, &context);
            scan.rows_skipped += extract.rows_skipped;
            scan.records.extend(extract.records);
        }
        scan.sources_scanned += 1;

        debug!(
            file = %context.file_name,
            location = %context.location,
            sheets = workbook.sheets.len(),
            records = scan.records.len() - before,
            "workbook scanned"
        );
    }

    info!(
        sources = scan.sources_scanned,
        records = scan.records.len(),
        failures = scan.failures.len(),
        rows_skipped = scan.rows_skipped,
        interrupted = scan.interrupted,
        "registry scan complete"
    );

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use patrimonio_shared::{AppConfig, Cell, PatrimonioError, Result};

    use crate::reader::{CalamineReader, SheetError, SheetRows, WorkbookRows};

    /// In-memory reader keyed by file name.
    struct FakeReader {
        books: HashMap<String, WorkbookRows>,
    }

    impl WorkbookReader for FakeReader {
        fn read_workbook(&self, path: &Path) -> Result<WorkbookRows> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.books
                .get(&name)
                .cloned()
                .ok_or_else(|| PatrimonioError::source_unreadable(path, "corrupt"))
        }
    }

    /// Cancels after the given number of sources have started.
    struct CancelAfter {
        after: usize,
        flag: CancelFlag,
        seen: Mutex<Vec<usize>>,
    }

    impl ScanProgress for CancelAfter {
        fn source_started(&self, _path: &Path, current: usize, _total: usize) {
            self.seen.lock().unwrap().push(current);
            if current >= self.after {
                self.flag.cancel();
            }
        }
    }

    fn data_row(id: &str) -> Vec<Cell> {
        let mut row = vec![Cell::Empty; 8];
        row[1] = Cell::from("ITEM");
        row[2] = Cell::from(id);
        row
    }

    fn book(ids: &[&str]) -> WorkbookRows {
        let mut rows = vec![vec![Cell::from("HEADER"); 8]];
        rows.extend(ids.iter().map(|id| data_row(id)));
        WorkbookRows::from(vec![SheetRows {
            name: "Plan1".into(),
            first_row: 0,
            rows,
        }])
    }

    fn source(name: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(format!("/registry/ceduc/{name}")),
            origin: "CEDUC".into(),
        }
    }

    fn config() -> ScanConfig {
        ScanConfig::from(&AppConfig::default())
    }

    #[test]
    fn first_source_wins_for_duplicate_identifier() {
        let reader = FakeReader {
            books: HashMap::from([
                ("A.xlsx".to_string(), book(&["100", "101"])),
                ("B.xlsx".to_string(), book(&["100"])),
            ]),
        };
        let sources = vec![source("A.xlsx"), source("B.xlsx")];

        let cancel = CancelFlag::new();
        let scan = scan_sources(&sources, &config(), &reader, &SilentScanProgress, &cancel);
        assert_eq!(scan.records.len(), 3);
        assert_eq!(scan.sources_scanned, 2);

        let index = scan.index();
        assert_eq!(index.get("100").unwrap().location, "A");
        assert_eq!(index.collisions(), 1);
    }

    #[test]
    fn unreadable_source_is_skipped_and_counted() {
        let reader = FakeReader {
            books: HashMap::from([("OK.xlsx".to_string(), book(&["1"]))]),
        };
        let sources = vec![source("BROKEN.xlsx"), source("OK.xlsx")];

        let cancel = CancelFlag::new();
        let scan = scan_sources(&sources, &config(), &reader, &SilentScanProgress, &cancel);
        assert_eq!(scan.failures.len(), 1);
        assert!(scan.failures[0].path.ends_with("BROKEN.xlsx"));
        assert_eq!(scan.sources_scanned, 1);
        assert_eq!(scan.records.len(), 1);
    }

    #[test]
    fn unreadable_sheet_is_recorded_and_other_sheets_kept() {
        let mut workbook = book(&["1"]);
        workbook.unreadable_sheets.push(SheetError {
            sheet: "Grafico1".into(),
            message: "not a worksheet".into(),
        });
        let reader = FakeReader {
            books: HashMap::from([("MIXED.xlsx".to_string(), workbook)]),
        };
        let sources = vec![source("MIXED.xlsx")];

        let cancel = CancelFlag::new();
        let scan = scan_sources(&sources, &config(), &reader, &SilentScanProgress, &cancel);
        assert_eq!(scan.sources_scanned, 1);
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.failures.len(), 1);
        assert!(scan.failures[0].reason.contains("Grafico1"));
    }

    #[test]
    fn cancellation_stops_between_files_with_valid_partial_index() {
        let reader = FakeReader {
            books: HashMap::from([
                ("A.xlsx".to_string(), book(&["1"])),
                ("B.xlsx".to_string(), book(&["2"])),
                ("C.xlsx".to_string(), book(&["3"])),
            ]),
        };
        let flag = CancelFlag::new();
        let progress = CancelAfter {
            after: 1,
            flag: flag.clone(),
            seen: Mutex::new(Vec::new()),
        };
        let sources = vec![source("A.xlsx"), source("B.xlsx"), source("C.xlsx")];

        let scan = scan_sources(&sources, &config(), &reader, &progress, &flag);
        assert!(scan.interrupted);
        assert_eq!(*progress.seen.lock().unwrap(), vec![1]);

        let index = scan.index();
        assert!(index.contains("1"));
        assert!(!index.contains("2"));
    }

    #[test]
    fn missing_folder_contributes_nothing() {
        let mut config = config();
        config.folders = vec![PathBuf::from("/definitely/not/here/patrimonio")];

        let scan = scan_registry(&config, &CalamineReader, &SilentScanProgress, &CancelFlag::new());
        assert!(scan.records.is_empty());
        assert!(scan.failures.is_empty());
        assert_eq!(scan.missing_folders.len(), 1);
        assert!(!scan.interrupted);
    }

    #[test]
    fn scans_real_workbooks_in_folder_order() {
        let root = tempfile::tempdir().expect("tempdir");
        let ceduc = root.path().join("CEDUC_LEVANTAMENTO");
        let neoa = root.path().join("2025_NEOA");
        std::fs::create_dir_all(&ceduc).unwrap();
        std::fs::create_dir_all(&neoa).unwrap();

        write_workbook(&ceduc.join("SALA 2_PROF_ANA.xlsx"), &["100", "200"]);
        write_workbook(&ceduc.join("LAB 1_RESP_JOSE (2024).xlsx"), &["300"]);
        write_workbook(&neoa.join("AUDITORIO.xlsx"), &["100", "400"]);
        std::fs::write(ceduc.join("notes.txt"), "ignored").unwrap();
        std::fs::write(ceduc.join("CORRUPT.xlsx"), "not a workbook").unwrap();

        let mut config = config();
        config.folders = vec![ceduc.clone(), neoa.clone()];

        let scan = scan_registry(&config, &CalamineReader, &SilentScanProgress, &CancelFlag::new());
        assert_eq!(scan.sources_scanned, 3);
        assert_eq!(scan.failures.len(), 1);

        let files: Vec<&str> = scan.records.iter().map(|r| r.provenance.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "LAB 1_RESP_JOSE (2024).xlsx",
                "SALA 2_PROF_ANA.xlsx",
                "SALA 2_PROF_ANA.xlsx",
                "AUDITORIO.xlsx",
                "AUDITORIO.xlsx",
            ]
        );

        let index = scan.index();
        assert_eq!(index.get("300").unwrap().location, "LAB 1");
        assert_eq!(index.get("100").unwrap().location, "SALA 2");
        assert_eq!(index.get("100").unwrap().origin, "CEDUC");
        assert_eq!(index.get("400").unwrap().origin, "NEOA");
        assert_eq!(scan.records[1].provenance.row, 2);
    }

    fn write_workbook(path: &Path, ids: &[&str]) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        let headers = [
            "N",
            "ITEM",
            "TOMBAMENTO",
            "PATRIMONIO",
            "INVENTARIO",
            "ESPECIFICACAO",
            "TR",
            "SITUACAO",
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (i, id) in ids.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_number(row, 0, (i + 1) as f64).unwrap();
            sheet.write_string(row, 1, "CADEIRA").unwrap();
            sheet.write_string(row, 2, *id).unwrap();
            sheet.write_string(row, 7, "BOM").unwrap();
        }
        workbook.save(path).unwrap();
    }
}
