//! Inventory report parsing and document geometry.
//!
//! The report is a scanned/exported inventory listing. Its text and word
//! boxes come from an external extractor as a [`DocumentLayout`]; this crate
//! turns the text into ordered [`ReportItem`](patrimonio_shared::ReportItem)s.

mod layout;
mod parser;

pub use layout::{DocumentLayout, PageLayout, Point, Rect, Word};
pub use parser::ReportParser;
