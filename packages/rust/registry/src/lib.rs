//! Registry scanning and the asset index.
//!
//! This crate provides:
//! - [`reader`]: the [`WorkbookReader`] seam and the `calamine` implementation
//! - [`extractor`]: positional row → [`AssetRecord`](patrimonio_shared::AssetRecord) mapping
//! - [`location`]: location labels from file names, origin tags from folders
//! - [`scan`]: ordered, cancellable scan of the registry folders
//! - [`index`]: the first-write-wins [`AssetIndex`]

pub mod extractor;
pub mod index;
pub mod location;
pub mod reader;
pub mod scan;

pub use extractor::{SheetExtract, SourceContext, extract_records, map_row};
pub use index::{AssetIndex, IndexEntry};
pub use location::{LocationResolver, classify_origin};
pub use reader::{CalamineReader, SheetError, SheetRows, WorkbookReader, WorkbookRows};
pub use scan::{
    CancelFlag, RegistryScan, ScanProgress, SilentScanProgress, SourceFailure, SourceFile,
    SourceListing, discover_sources, scan_registry, scan_sources,
};
