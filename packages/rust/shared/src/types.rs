//! Core domain types for the asset registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PatrimonioError;

/// Normalize an identifier into its index key form: trimmed and upper-cased.
///
/// Index keys and report candidates must both pass through this function so
/// that membership tests compare like with like.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A typed spreadsheet cell value, as handed over by a tabular reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl Cell {
    /// Render the cell as trimmed text.
    ///
    /// Integral floats lose their fractional part so that numeric identifiers
    /// (`2017004687.0`) read the same as when typed as text.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Float(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Cell::Int(n) => n.to_string(),
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// AssetRecord
// ---------------------------------------------------------------------------

/// One row of the asset registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Primary identifier (trimmed, never empty).
    pub tombamento: String,
    /// Secondary patrimony number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patrimonio: Option<String>,
    /// Secondary inventory number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventario: Option<String>,
    /// Item name as written in the registry.
    pub item: String,
    pub specification: String,
    pub tr: String,
    pub status: String,
    /// Location label derived from the source file name. Best-effort only.
    pub source_location: String,
    /// Which root collection the source file belongs to.
    pub origin_tag: String,
}

impl AssetRecord {
    /// The normalized index key for this record.
    pub fn key(&self) -> String {
        normalize_key(&self.tombamento)
    }
}

/// Where a record was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source file name (not the full path).
    pub file: String,
    /// Worksheet name.
    pub sheet: String,
    /// 1-based sheet row number.
    pub row: usize,
}

/// A record together with its provenance, in source-enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedRecord {
    pub record: AssetRecord,
    pub provenance: Provenance,
}

// ---------------------------------------------------------------------------
// AssetField
// ---------------------------------------------------------------------------

/// Record field selectable for point lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetField {
    Tombamento,
    Patrimonio,
    Inventario,
    Specification,
    Item,
}

impl AssetField {
    /// Read this field's value from a record (empty string when absent).
    pub fn value_of<'a>(&self, record: &'a AssetRecord) -> &'a str {
        match self {
            AssetField::Tombamento => &record.tombamento,
            AssetField::Patrimonio => record.patrimonio.as_deref().unwrap_or(""),
            AssetField::Inventario => record.inventario.as_deref().unwrap_or(""),
            AssetField::Specification => &record.specification,
            AssetField::Item => &record.item,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetField::Tombamento => "tombamento",
            AssetField::Patrimonio => "patrimonio",
            AssetField::Inventario => "inventario",
            AssetField::Specification => "specification",
            AssetField::Item => "item",
        }
    }
}

impl fmt::Display for AssetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetField {
    type Err = PatrimonioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tombamento" => Ok(AssetField::Tombamento),
            "patrimonio" | "patrimônio" => Ok(AssetField::Patrimonio),
            "inventario" | "inventário" => Ok(AssetField::Inventario),
            "specification" | "especificacao" | "especificação" => Ok(AssetField::Specification),
            "item" => Ok(AssetField::Item),
            other => Err(PatrimonioError::parse(format!("unknown field '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MatchMode
// ---------------------------------------------------------------------------

/// How a lookup value is compared with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whole-value equality.
    #[default]
    Exact,
    /// The field contains the value as a substring.
    Partial,
}

impl FromStr for MatchMode {
    type Err = PatrimonioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "partial" => Ok(MatchMode::Partial),
            other => Err(PatrimonioError::parse(format!(
                "invalid match mode '{other}': expected 'exact' or 'partial'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportItem
// ---------------------------------------------------------------------------

/// Position of an item line inside the source report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPosition {
    /// 1-based page number.
    pub page: usize,
    /// 1-based line number within the page text.
    pub line: usize,
}

/// One asset reference extracted from an inventory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    pub candidate_id: String,
    pub label: String,
    pub source_position: ReportPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_renders_without_fraction() {
        assert_eq!(Cell::Float(2017004687.0).to_text(), "2017004687");
        assert_eq!(Cell::Float(12.5).to_text(), "12.5");
        assert_eq!(Cell::Text("  abc ".into()).to_text(), "abc");
        assert_eq!(Cell::Empty.to_text(), "");
    }

    #[test]
    fn normalize_key_trims_and_uppercases() {
        assert_eq!(normalize_key("  ab12 "), "AB12");
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("Tombamento".parse::<AssetField>().unwrap(), AssetField::Tombamento);
        assert_eq!("especificação".parse::<AssetField>().unwrap(), AssetField::Specification);
        assert!("room".parse::<AssetField>().is_err());
    }

    #[test]
    fn match_mode_serializes_lowercase() {
        let json = serde_json::to_string(&MatchMode::Partial).expect("serialize");
        assert_eq!(json, "\"partial\"");
        assert_eq!("EXACT".parse::<MatchMode>().unwrap(), MatchMode::Exact);
    }
}
