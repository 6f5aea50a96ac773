//! Inventory report item extraction.
//!
//! A scanned inventory report lists one asset per line:
//! `2017004687 TELEFONE IP 23/11/2017 ...`: a tombamento of six or more
//! digits, a description, then an acquisition date. Every other line
//! (headers, totals, serial-number continuation lines) is ignored.

use std::sync::LazyLock;

use patrimonio_shared::{ReportConfig, ReportItem, ReportPosition};
use regex::Regex;
use tracing::debug;

use crate::layout::DocumentLayout;

/// Leading identifier, lazy description, first `DD/MM/YYYY` date.
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{6,})\s+(.+?)\s+\d{2}/\d{2}/\d{4}").expect("item line regex")
});

/// Extracts [`ReportItem`]s from report text.
#[derive(Debug, Clone)]
pub struct ReportParser {
    /// Lower-cased prefixes of lines that are never items.
    skip_prefixes: Vec<String>,
}

impl ReportParser {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            skip_prefixes: config
                .skip_prefixes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Match one line, returning `(identifier, description)`.
    pub fn parse_line(&self, line: &str) -> Option<(String, String)> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let lower = line.to_lowercase();
        if self.skip_prefixes.iter().any(|p| lower.starts_with(p.as_str())) {
            return None;
        }

        let caps = ITEM_RE.captures(line)?;
        Some((caps[1].to_string(), caps[2].trim().to_string()))
    }

    /// Extract items from one page of text, in line order.
    pub fn extract_page<S: AsRef<str>>(&self, page: usize, lines: &[S]) -> Vec<ReportItem> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                self.parse_line(line.as_ref()).map(|(candidate_id, label)| ReportItem {
                    candidate_id,
                    label,
                    source_position: ReportPosition {
                        page,
                        line: idx + 1,
                    },
                })
            })
            .collect()
    }

    /// Extract items from every page of a document, in report order.
    pub fn extract_document(&self, layout: &DocumentLayout) -> Vec<ReportItem> {
        let mut items = Vec::new();
        for page in &layout.pages {
            let found = self.extract_page(page.number, &page.text_lines());
            debug!(page = page.number, items = found.len(), "report page parsed");
            items.extend(found);
        }
        items
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new(&ReportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_identifier_and_label() {
        let parser = ReportParser::default();
        let parsed = parser.parse_line("2017004687 TELEFONE IP 23/11/2017 XYZ");
        assert_eq!(parsed, Some(("2017004687".into(), "TELEFONE IP".into())));
    }

    #[test]
    fn description_stops_at_first_date() {
        let parser = ReportParser::default();
        let parsed = parser.parse_line("  123456 MESA 10/10/2010 ENTREGUE 11/11/2011  ");
        assert_eq!(parsed, Some(("123456".into(), "MESA".into())));
    }

    #[test]
    fn non_item_lines_yield_nothing() {
        let parser = ReportParser::default();
        assert_eq!(parser.parse_line("2017004687 TELEFONE IP sem data"), None);
        assert_eq!(parser.parse_line("12345 CURTO 01/01/2020"), None);
        assert_eq!(parser.parse_line("RELATÓRIO DE BENS 01/01/2020"), None);
        assert_eq!(parser.parse_line(""), None);
        assert_eq!(parser.parse_line("Número de Série 2017004687 X 01/01/2020"), None);
    }

    #[test]
    fn page_items_keep_line_positions() {
        let parser = ReportParser::default();
        let lines = [
            "Relatório de inventário",
            "2017004687 TELEFONE IP 23/11/2017 XYZ",
            "Número de série: ABC123",
            "2018000001 CADEIRA GIRATÓRIA 02/03/2018",
        ];
        let items = parser.extract_page(3, &lines);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_position, ReportPosition { page: 3, line: 2 });
        assert_eq!(items[1].candidate_id, "2018000001");
        assert_eq!(items[1].label, "CADEIRA GIRATÓRIA");
        assert_eq!(items[1].source_position.line, 4);
    }

    #[test]
    fn fixture_report_page() {
        let content = std::fs::read_to_string("../../../fixtures/report/inventory-page.txt")
            .expect("read fixture");
        let lines: Vec<&str> = content.lines().collect();
        let items = ReportParser::default().extract_page(1, &lines);

        let ids: Vec<&str> = items.iter().map(|i| i.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["2017004687", "2017004688", "2019000154", "2020001337"]);
        assert_eq!(items[2].label, "PROJETOR MULTIMIDIA EPSON");
    }

    #[test]
    fn document_items_follow_page_order() {
        let layout = DocumentLayout::load(std::path::Path::new(
            "../../../fixtures/layout/inventory-two-pages.json",
        ))
        .expect("load fixture");
        let items = ReportParser::default().extract_document(&layout);

        let ids: Vec<&str> = items.iter().map(|i| i.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["2017004687", "2018000001", "2019000154"]);
        assert_eq!(items[2].source_position.page, 2);
    }
}
