//! Found/not-found markers placed next to report lines.
//!
//! For every reconciled candidate, each text line of the document containing
//! the identifier gets one glyph: a check when the asset is in the index, a
//! cross when it is not. The glyph sits at a fixed offset from the page's
//! left edge, vertically centred on the matched word.
//!
//! Drawing itself belongs to whatever renders the document. Markers reach it
//! through [`DocumentAnnotator`]; [`JsonLinesAnnotator`] writes the strokes as
//! JSON lines for an external PDF tool.

use std::collections::HashSet;
use std::io::Write;

use patrimonio_report::{DocumentLayout, Point};
use patrimonio_shared::{MarkerConfig, PatrimonioError, Result};
use serde::Serialize;
use tracing::debug;

use crate::query::ReconciliationResult;

/// RGB color, components in `0.0..=1.0`.
pub type Rgb = [f32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Glyph {
    Check,
    Cross,
}

/// One stroke of a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineSegment {
    pub from: Point,
    pub to: Point,
}

/// Drawing instructions for one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// 1-based page number.
    pub page: usize,
    pub candidate_id: String,
    pub found: bool,
    pub glyph: Glyph,
    pub anchor: Point,
    /// Text of the matched line, left to right.
    pub line_text: String,
    pub segments: [LineSegment; 2],
    pub color: Rgb,
    pub stroke_width: f32,
}

/// Receives draw-line primitives and persists an annotated document.
pub trait DocumentAnnotator {
    fn draw_line(
        &mut self,
        page: usize,
        segment: &LineSegment,
        color: Rgb,
        stroke_width: f32,
    ) -> Result<()>;
}

/// Compute markers for every candidate of `result` found in the layout's words.
///
/// A candidate repeated in the report is marked once. Several matching words
/// on the same `(block, line)` of a page give a single marker.
pub fn map_markers(
    layout: &DocumentLayout,
    result: &ReconciliationResult,
    style: &MarkerConfig,
) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut seen_candidates: HashSet<&str> = HashSet::new();

    for entry in result.entries() {
        let candidate_id = entry.item.candidate_id.as_str();
        if candidate_id.is_empty() || !seen_candidates.insert(candidate_id) {
            continue;
        }

        for page in &layout.pages {
            let mut marked_lines: HashSet<(u32, u32)> = HashSet::new();

            for word in page.words.iter().filter(|w| w.text.contains(candidate_id)) {
                let key = word.line_key();
                if !marked_lines.insert(key) {
                    continue;
                }

                let line = page.line_words(key);
                if line.is_empty() {
                    continue;
                }

                let anchor = Point {
                    x: page.bounds.x0 + style.offset_x,
                    y: word.bbox.center_y(),
                };
                let glyph = if entry.found { Glyph::Check } else { Glyph::Cross };

                markers.push(Marker {
                    page: page.number,
                    candidate_id: candidate_id.to_string(),
                    found: entry.found,
                    glyph,
                    anchor,
                    line_text: line
                        .iter()
                        .map(|w| w.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                    segments: glyph_segments(glyph, anchor, style.size),
                    color: if entry.found {
                        style.found_color
                    } else {
                        style.missing_color
                    },
                    stroke_width: style.stroke_width,
                });
            }
        }
    }

    debug!(markers = markers.len(), candidates = result.len(), "markers mapped");
    markers
}

/// The two strokes of a glyph of width/height `size`, starting at `anchor.x`
/// and centred on `anchor.y`.
pub fn glyph_segments(glyph: Glyph, anchor: Point, size: f32) -> [LineSegment; 2] {
    let Point { x, y } = anchor;
    let half = size / 2.0;
    let p = |x: f32, y: f32| Point { x, y };
    let stroke = |from: Point, to: Point| LineSegment { from, to };

    match glyph {
        Glyph::Check => {
            let elbow = p(x + size * 0.4, y + half);
            [
                stroke(p(x, y), elbow),
                stroke(elbow, p(x + size, y - half)),
            ]
        }
        Glyph::Cross => [
            stroke(p(x, y - half), p(x + size, y + half)),
            stroke(p(x, y + half), p(x + size, y - half)),
        ],
    }
}

/// Send every marker's strokes to an annotator. Returns the number of lines drawn.
pub fn apply_markers(
    markers: &[Marker],
    annotator: &mut dyn DocumentAnnotator,
) -> Result<usize> {
    let mut drawn = 0;
    for marker in markers {
        for segment in &marker.segments {
            annotator.draw_line(marker.page, segment, marker.color, marker.stroke_width)?;
            drawn += 1;
        }
    }
    Ok(drawn)
}

/// One stroke per line: `{"page":1,"from":{..},"to":{..},"color":[..],"stroke_width":1.5}`.
#[derive(Serialize)]
struct StrokeRecord<'a> {
    page: usize,
    from: &'a Point,
    to: &'a Point,
    color: Rgb,
    stroke_width: f32,
}

/// Annotator that serializes every stroke as a JSON line.
pub struct JsonLinesAnnotator<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesAnnotator<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DocumentAnnotator for JsonLinesAnnotator<W> {
    fn draw_line(
        &mut self,
        page: usize,
        segment: &LineSegment,
        color: Rgb,
        stroke_width: f32,
    ) -> Result<()> {
        let record = StrokeRecord {
            page,
            from: &segment.from,
            to: &segment.to,
            color,
            stroke_width,
        };
        serde_json::to_writer(&mut self.out, &record)
            .map_err(|e| PatrimonioError::validation(format!("cannot write stroke: {e}")))?;
        writeln!(self.out)
            .map_err(|e| PatrimonioError::validation(format!("cannot write stroke: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use patrimonio_registry::AssetIndex;
    use patrimonio_report::{PageLayout, Rect, Word};
    use patrimonio_shared::{AssetRecord, ReportItem, ReportPosition};

    use crate::query::reconcile;

    fn item(id: &str) -> ReportItem {
        ReportItem {
            candidate_id: id.into(),
            label: String::new(),
            source_position: ReportPosition { page: 1, line: 1 },
        }
    }

    fn index_with(ids: &[&str]) -> AssetIndex {
        let records: Vec<AssetRecord> = ids
            .iter()
            .map(|id| AssetRecord {
                tombamento: id.to_string(),
                patrimonio: None,
                inventario: None,
                item: String::new(),
                specification: String::new(),
                tr: String::new(),
                status: String::new(),
                source_location: "SALA 1".into(),
                origin_tag: "CEDUC".into(),
            })
            .collect();
        AssetIndex::build(&records)
    }

    fn fixture() -> DocumentLayout {
        DocumentLayout::load(Path::new("../../../fixtures/layout/inventory-two-pages.json"))
            .expect("load fixture")
    }

    #[test]
    fn identifier_on_two_pages_gets_two_markers() {
        let layout = fixture();
        let result = reconcile(&[item("2017004687")], &index_with(&["2017004687"]));
        let markers = map_markers(&layout, &result, &MarkerConfig::default());

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].page, 1);
        assert_eq!(markers[0].anchor, Point { x: 20.0, y: 105.0 });
        assert_eq!(markers[1].page, 2);
        assert_eq!(markers[1].anchor.y, 305.0);
        assert_eq!(markers[0].color, markers[1].color);
        assert!(markers.iter().all(|m| m.glyph == Glyph::Check));
        assert_eq!(markers[1].line_text, "Obs.: bem 2017004687 transferido");
    }

    #[test]
    fn color_follows_found_flag() {
        let layout = fixture();
        let style = MarkerConfig::default();
        let result = reconcile(
            &[item("2017004687"), item("2018000001")],
            &index_with(&["2018000001"]),
        );
        let markers = map_markers(&layout, &result, &style);

        let missing: Vec<_> = markers.iter().filter(|m| m.candidate_id == "2017004687").collect();
        let found: Vec<_> = markers.iter().filter(|m| m.candidate_id == "2018000001").collect();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|m| m.color == style.missing_color && m.glyph == Glyph::Cross));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].color, style.found_color);
        assert_eq!(found[0].anchor.y, 125.0);
    }

    #[test]
    fn absent_identifier_emits_nothing() {
        let layout = fixture();
        let result = reconcile(&[item("2099999999")], &AssetIndex::new());
        assert!(map_markers(&layout, &result, &MarkerConfig::default()).is_empty());
    }

    #[test]
    fn one_marker_per_line_and_per_candidate() {
        let word = |text: &str, x0: f32| Word {
            text: text.into(),
            bbox: Rect {
                x0,
                y0: 50.0,
                x1: x0 + 40.0,
                y1: 60.0,
            },
            block: 2,
            line: 0,
        };
        let layout = DocumentLayout {
            pages: vec![PageLayout {
                number: 1,
                bounds: Rect {
                    x0: 10.0,
                    y0: 0.0,
                    x1: 600.0,
                    y1: 800.0,
                },
                text: String::new(),
                words: vec![word("555555", 40.0), word("(555555)", 200.0)],
            }],
        };
        let result = reconcile(&[item("555555"), item("555555")], &AssetIndex::new());
        let markers = map_markers(&layout, &result, &MarkerConfig::default());

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].anchor, Point { x: 30.0, y: 55.0 });
    }

    #[test]
    fn glyph_geometry() {
        let anchor = Point { x: 20.0, y: 100.0 };
        let check = glyph_segments(Glyph::Check, anchor, 8.0);
        assert_eq!(check[0].from, anchor);
        assert_eq!(check[0].to, check[1].from);
        assert_eq!(check[1].to, Point { x: 28.0, y: 96.0 });

        let cross = glyph_segments(Glyph::Cross, anchor, 8.0);
        assert_eq!(cross[0].from, Point { x: 20.0, y: 96.0 });
        assert_eq!(cross[0].to, Point { x: 28.0, y: 104.0 });
        assert_eq!(cross[1].from, Point { x: 20.0, y: 104.0 });
    }

    #[test]
    fn apply_sends_two_lines_per_marker() {
        struct Recorder(Vec<(usize, LineSegment, Rgb, f32)>);

        impl DocumentAnnotator for Recorder {
            fn draw_line(
                &mut self,
                page: usize,
                segment: &LineSegment,
                color: Rgb,
                width: f32,
            ) -> Result<()> {
                self.0.push((page, *segment, color, width));
                Ok(())
            }
        }

        let layout = fixture();
        let result = reconcile(&[item("2017004687")], &AssetIndex::new());
        let markers = map_markers(&layout, &result, &MarkerConfig::default());

        let mut recorder = Recorder(Vec::new());
        let drawn = apply_markers(&markers, &mut recorder).expect("apply");
        assert_eq!(drawn, 4);
        assert_eq!(recorder.0[2].0, 2);
        assert_eq!(recorder.0[0].3, 1.5);
    }

    #[test]
    fn json_lines_annotator_writes_one_stroke_per_line() {
        let layout = fixture();
        let result = reconcile(&[item("2018000001")], &index_with(&["2018000001"]));
        let markers = map_markers(&layout, &result, &MarkerConfig::default());

        let mut annotator = JsonLinesAnnotator::new(Vec::new());
        let drawn = apply_markers(&markers, &mut annotator).expect("apply");
        let output = String::from_utf8(annotator.into_inner()).expect("utf8");

        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(drawn, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["page"], 1);
        assert_eq!(lines[0]["from"]["x"], 20.0);
        assert_eq!(lines[0]["from"]["y"], 125.0);
        assert_eq!(lines[1]["stroke_width"], 1.5);
    }
}
