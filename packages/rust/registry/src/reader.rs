//! Tabular source reading.
//!
//! [`WorkbookReader`] is the seam between the registry scan and the file
//! format. [`CalamineReader`] handles xlsx/xls/xlsb/ods through `calamine`.

use std::path::Path;

use calamine::{Data, ExcelDateTime, Reader, Sheets, open_workbook_auto};
use chrono::Timelike;
use patrimonio_shared::{Cell, PatrimonioError, Result};
use tracing::warn;

/// All rows of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRows {
    /// Worksheet name.
    pub name: String,
    /// Zero-based sheet row of `rows[0]`.
    pub first_row: usize,
    /// Rows as positional cells, column A at index 0.
    pub rows: Vec<Vec<Cell>>,
}

/// A worksheet that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetError {
    pub sheet: String,
    pub message: String,
}

/// The readable sheets of a workbook, in workbook order, plus the ones skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookRows {
    pub sheets: Vec<SheetRows>,
    pub unreadable_sheets: Vec<SheetError>,
}

impl From<Vec<SheetRows>> for WorkbookRows {
    fn from(sheets: Vec<SheetRows>) -> Self {
        Self {
            sheets,
            unreadable_sheets: Vec::new(),
        }
    }
}

/// Reads a workbook into per-sheet rows.
///
/// A workbook that cannot be opened comes back as
/// [`PatrimonioError::SourceUnreadable`] so the caller can skip the source and
/// continue. A single unreadable sheet only drops that sheet.
pub trait WorkbookReader: Send + Sync {
    fn read_workbook(&self, path: &Path) -> Result<WorkbookRows>;
}

/// `calamine`-backed reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

impl WorkbookReader for CalamineReader {
    fn read_workbook(&self, path: &Path) -> Result<WorkbookRows> {
        let mut workbook: Sheets<_> = open_workbook_auto(path)
            .map_err(|e| PatrimonioError::source_unreadable(path, e.to_string()))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

        Ok(collect_sheets(path, sheet_names, |sheet_name| {
            let range = workbook
                .worksheet_range(sheet_name)
                .map_err(|e| e.to_string())?;

            // Range start offset (data may not begin at A1)
            let (start_row, start_col) = range.start().unwrap_or((0, 0));

            let rows = range
                .rows()
                .map(|row| {
                    let mut cells = vec![Cell::Empty; start_col as usize];
                    cells.extend(row.iter().map(cell_from_data));
                    cells
                })
                .collect();

            Ok(SheetRows {
                name: sheet_name.to_string(),
                first_row: start_row as usize,
                rows,
            })
        }))
    }
}

/// Read every named sheet, keeping the readable ones in order.
fn collect_sheets<F>(path: &Path, sheet_names: Vec<String>, mut read: F) -> WorkbookRows
where
    F: FnMut(&str) -> std::result::Result<SheetRows, String>,
{
    let mut workbook = WorkbookRows::default();

    for sheet_name in sheet_names {
        match read(&sheet_name) {
            Ok(sheet) => workbook.sheets.push(sheet),
            Err(message) => {
                warn!(
                    path = %path.display(),
                    sheet = %sheet_name,
                    error = %message,
                    "skipping unreadable sheet"
                );
                workbook.unreadable_sheets.push(SheetError {
                    sheet: sheet_name,
                    message,
                });
            }
        }
    }

    workbook
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Float(*n),
        Data::Int(n) => Cell::Int(*n),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => date_cell(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Dates render as `DD/MM/YYYY`, with the time only when it is not midnight.
/// Durations keep their serial value.
fn date_cell(dt: &ExcelDateTime) -> Cell {
    if !dt.is_datetime() {
        return Cell::Float(dt.as_f64());
    }
    match dt.as_datetime() {
        Some(value) if value.num_seconds_from_midnight() == 0 => {
            Cell::Text(value.format("%d/%m/%Y").to_string())
        }
        Some(value) => Cell::Text(value.format("%d/%m/%Y %H:%M:%S").to_string()),
        None => Cell::Float(dt.as_f64()),
    }
}
