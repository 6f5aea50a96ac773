//! Record extraction: one worksheet of positional cells → [`ScannedRecord`]s.
//!
//! The column layout is a fixed external contract of the registry
//! spreadsheets. [`map_row`] is the only place that reads cells by offset.

use patrimonio_shared::{AssetRecord, Cell, ColumnSchema, Provenance, ScannedRecord};

use crate::reader::SheetRows;

/// Per-source values stamped onto every record of that source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// File name of the workbook.
    pub file_name: String,
    /// Location label resolved from the file name.
    pub location: String,
    /// Origin tag of the root folder.
    pub origin: String,
}

/// Records extracted from one worksheet.
#[derive(Debug, Default)]
pub struct SheetExtract {
    /// Records in row order.
    pub records: Vec<ScannedRecord>,
    /// Data rows skipped as malformed (too short or empty identifier).
    pub rows_skipped: usize,
}

/// Map one row onto an [`AssetRecord`].
///
/// Returns `None` when the row has fewer than `min_fields` cells or the
/// identifying cell is empty after trimming.
pub fn map_row(
    row: &[Cell],
    columns: &ColumnSchema,
    source: &SourceContext,
) -> Option<AssetRecord> {
    if row.len() < columns.min_fields {
        return None;
    }

    let text = |offset: usize| row.get(offset).map(Cell::to_text).unwrap_or_default();
    let optional = |offset: usize| Some(text(offset)).filter(|s| !s.is_empty());

    let tombamento = text(columns.tombamento);
    if tombamento.is_empty() {
        return None;
    }

    Some(AssetRecord {
        tombamento,
        patrimonio: optional(columns.patrimonio),
        inventario: optional(columns.inventario),
        item: text(columns.item),
        specification: text(columns.specification),
        tr: text(columns.tr),
        status: text(columns.status),
        source_location: source.location.clone(),
        origin_tag: source.origin.clone(),
    })
}

/// Extract all records from a worksheet, skipping the first `header_rows` sheet rows.
pub fn extract_records(
    sheet: &SheetRows,
    columns: &ColumnSchema,
    header_rows: usize,
    source: &SourceContext,
) -> SheetExtract {
    let mut extract = SheetExtract::default();

    for (idx, row) in sheet.rows.iter().enumerate() {
        let sheet_row = sheet.first_row + idx;
        if sheet_row < header_rows {
            continue;
        }

        match map_row(row, columns, source) {
            Some(record) => extract.records.push(ScannedRecord {
                record,
                provenance: Provenance {
                    file: source.file_name.clone(),
                    sheet: sheet.name.clone(),
                    row: sheet_row + 1,
                },
            }),
            None => extract.rows_skipped += 1,
        }
    }

    extract
}
