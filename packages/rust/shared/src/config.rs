//! Application configuration for the asset registry tools.
//!
//! User config lives at `~/.patrimonio/patrimonio.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PatrimonioError, Result};
use crate::types::MatchMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "patrimonio.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".patrimonio";

/// File name of the index snapshot cache, stored next to the config file.
const CACHE_FILE_NAME: &str = "index-cache.json";

// ---------------------------------------------------------------------------
// Config structs (matching patrimonio.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry folders and source classification.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Positional column schema of registry sheets.
    #[serde(default)]
    pub columns: ColumnSchema,

    /// Location label derivation from file names.
    #[serde(default)]
    pub location: LocationConfig,

    /// Lookup match semantics.
    #[serde(default)]
    pub search: SearchConfig,

    /// Inventory report parsing.
    #[serde(default)]
    pub report: ReportConfig,

    /// Found/not-found marker geometry and colors.
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Index snapshot cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root folders scanned for registry spreadsheets, in priority order.
    #[serde(default = "default_folders")]
    pub folders: Vec<String>,

    /// File extensions (without the dot) treated as registry spreadsheets.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Leading rows of every sheet that hold headers, not records.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,

    /// Origin keywords matched against the upper-cased folder path. First match wins.
    #[serde(default = "default_origins")]
    pub origins: Vec<OriginRule>,

    /// Origin name used when no keyword matches.
    #[serde(default = "default_unknown_origin")]
    pub unknown_origin: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            folders: default_folders(),
            extensions: default_extensions(),
            header_rows: default_header_rows(),
            origins: default_origins(),
            unknown_origin: default_unknown_origin(),
        }
    }
}

fn default_folders() -> Vec<String> {
    vec![
        r"\\fileceduc\grupos\ceduc_secretaria\PATRIMÔNIO\CEDUC_LEVANTAMENTO PATRIMÔNIO_2025".into(),
        r"\\fileceduc\grupos\ceduc_secretaria\PATRIMÔNIO\2025_PATRIMÔNIO_NEOA".into(),
    ]
}
fn default_extensions() -> Vec<String> {
    vec!["xlsx".into()]
}
fn default_header_rows() -> usize {
    1
}
fn default_origins() -> Vec<OriginRule> {
    vec![
        OriginRule {
            keyword: "NEOA".into(),
            name: "NEOA".into(),
        },
        OriginRule {
            keyword: "CEDUC".into(),
            name: "CEDUC".into(),
        },
    ]
}
fn default_unknown_origin() -> String {
    "DESCONHECIDA".into()
}

/// `[[registry.origins]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRule {
    /// Keyword searched for in the upper-cased root folder path.
    pub keyword: String,
    /// Origin tag assigned on match.
    pub name: String,
}

/// `[columns]` section: zero-based positional offsets within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    #[serde(default = "col_item")]
    pub item: usize,
    #[serde(default = "col_tombamento")]
    pub tombamento: usize,
    #[serde(default = "col_patrimonio")]
    pub patrimonio: usize,
    #[serde(default = "col_inventario")]
    pub inventario: usize,
    #[serde(default = "col_specification")]
    pub specification: usize,
    #[serde(default = "col_tr")]
    pub tr: usize,
    #[serde(default = "col_status")]
    pub status: usize,
    /// Rows with fewer cells than this are skipped.
    #[serde(default = "col_min_fields")]
    pub min_fields: usize,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            item: col_item(),
            tombamento: col_tombamento(),
            patrimonio: col_patrimonio(),
            inventario: col_inventario(),
            specification: col_specification(),
            tr: col_tr(),
            status: col_status(),
            min_fields: col_min_fields(),
        }
    }
}

fn col_item() -> usize {
    1
}
fn col_tombamento() -> usize {
    2
}
fn col_patrimonio() -> usize {
    3
}
fn col_inventario() -> usize {
    4
}
fn col_specification() -> usize {
    5
}
fn col_tr() -> usize {
    6
}
fn col_status() -> usize {
    7
}
fn col_min_fields() -> usize {
    8
}

impl ColumnSchema {
    /// Every offset must fall inside the minimum row width.
    pub fn validate(&self) -> Result<()> {
        let offsets = [
            ("item", self.item),
            ("tombamento", self.tombamento),
            ("patrimonio", self.patrimonio),
            ("inventario", self.inventario),
            ("specification", self.specification),
            ("tr", self.tr),
            ("status", self.status),
        ];
        for (name, offset) in offsets {
            if offset >= self.min_fields {
                return Err(PatrimonioError::validation(format!(
                    "column '{name}' at offset {offset} is outside min_fields = {}",
                    self.min_fields
                )));
            }
        }
        Ok(())
    }
}

/// `[location]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Delimiter splitting a file name into tokens.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Separator joining the surviving tokens.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Keywords that end the location part of a file name (case-insensitive substring).
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            separator: default_separator(),
            denylist: default_denylist(),
        }
    }
}

fn default_delimiter() -> String {
    "_".into()
}
fn default_separator() -> String {
    " ".into()
}
fn default_denylist() -> Vec<String> {
    ["PROF", "RESP", "SERVIDOR", "COORD", "DIRETOR", "TECNICO", "TÉCNICO", "LEVANTAMENTO"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[search]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub match_mode: MatchMode,

    #[serde(default)]
    pub case_sensitive: bool,
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Line prefixes (case-insensitive) that are never item lines.
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

fn default_skip_prefixes() -> Vec<String> {
    vec!["número de série".into()]
}

/// `[markers]` section. Units are document points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Horizontal distance of the glyph from the page's left edge.
    #[serde(default = "default_offset_x")]
    pub offset_x: f32,

    /// Glyph width and height.
    #[serde(default = "default_marker_size")]
    pub size: f32,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,

    /// RGB components in `0.0..=1.0`.
    #[serde(default = "default_found_color")]
    pub found_color: [f32; 3],

    #[serde(default = "default_missing_color")]
    pub missing_color: [f32; 3],
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            offset_x: default_offset_x(),
            size: default_marker_size(),
            stroke_width: default_stroke_width(),
            found_color: default_found_color(),
            missing_color: default_missing_color(),
        }
    }
}

fn default_offset_x() -> f32 {
    20.0
}
fn default_marker_size() -> f32 {
    8.0
}
fn default_stroke_width() -> f32 {
    1.5
}
fn default_found_color() -> [f32; 3] {
    [0.0, 0.6, 0.0]
}
fn default_missing_color() -> [f32; 3] {
    [0.85, 0.0, 0.0]
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Minutes a built index stays reusable. `0` disables the cache.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

fn default_ttl_minutes() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime registry scan configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    /// Root folders, scanned in this order.
    pub folders: Vec<PathBuf>,
    /// Accepted extensions, lower-cased, without the dot.
    pub extensions: Vec<String>,
    pub header_rows: usize,
    pub columns: ColumnSchema,
    pub location: LocationConfig,
    pub origins: Vec<OriginRule>,
    pub unknown_origin: String,
}

impl From<&AppConfig> for ScanConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            folders: config.registry.folders.iter().map(PathBuf::from).collect(),
            extensions: config
                .registry
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            header_rows: config.registry.header_rows,
            columns: config.columns.clone(),
            location: config.location.clone(),
            origins: config.registry.origins.clone(),
            unknown_origin: config.registry.unknown_origin.clone(),
        }
    }
}

/// Runtime lookup options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub match_mode: MatchMode,
    pub case_sensitive: bool,
}

impl From<&AppConfig> for SearchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            match_mode: config.search.match_mode,
            case_sensitive: config.search.case_sensitive,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.patrimonio/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PatrimonioError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.patrimonio/patrimonio.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path to the index snapshot cache (`~/.patrimonio/index-cache.json`).
pub fn cache_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CACHE_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PatrimonioError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PatrimonioError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.columns.validate()?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PatrimonioError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PatrimonioError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PatrimonioError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("folders"));
        assert!(toml_str.contains("DESCONHECIDA"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.columns, ColumnSchema::default());
        assert_eq!(parsed.registry.origins[0].keyword, "NEOA");
        assert_eq!(parsed.markers.offset_x, 20.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[registry]
folders = ["/srv/patrimonio/ceduc"]

[search]
match_mode = "partial"
case_sensitive = true

[location]
denylist = ["PROF"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.registry.folders.len(), 1);
        assert_eq!(config.registry.header_rows, 1);
        assert_eq!(config.search.match_mode, MatchMode::Partial);
        assert!(config.search.case_sensitive);
        assert_eq!(config.location.delimiter, "_");
        assert_eq!(config.columns.tombamento, 2);
    }

    #[test]
    fn scan_config_from_app_config() {
        let mut app = AppConfig::default();
        app.registry.extensions = vec![".XLSX".into(), "xls".into()];
        let scan = ScanConfig::from(&app);
        assert_eq!(scan.folders.len(), 2);
        assert_eq!(scan.extensions, vec!["xlsx", "xls"]);
        assert_eq!(scan.columns.min_fields, 8);
    }

    #[test]
    fn column_schema_rejects_offset_past_min_fields() {
        let schema = ColumnSchema {
            status: 9,
            ..ColumnSchema::default()
        };
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("status"));
        assert!(ColumnSchema::default().validate().is_ok());
    }
}
