//! Shared types, error model, and configuration for the asset registry tools.
//!
//! This crate is the foundation depended on by all other crates in the workspace.
//! It provides:
//! - [`PatrimonioError`]: the unified error type
//! - Domain types ([`AssetRecord`], [`ScannedRecord`], [`ReportItem`], [`Cell`])
//! - Configuration ([`AppConfig`], [`ScanConfig`], [`SearchOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, ColumnSchema, LocationConfig, MarkerConfig, OriginRule,
    RegistryConfig, ReportConfig, ScanConfig, SearchConfig, SearchOptions, cache_file_path,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PatrimonioError, Result};
pub use types::{
    AssetField, AssetRecord, Cell, MatchMode, Provenance, ReportItem, ReportPosition,
    ScannedRecord, normalize_key,
};
