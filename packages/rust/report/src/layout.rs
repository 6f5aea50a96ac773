//! Page text and word geometry of a paginated document.
//!
//! Text extraction itself happens outside this workspace; an extractor
//! writes a [`DocumentLayout`] as JSON and we read it back here.
//! Coordinates are in points with a top-left origin (y grows downward).

use std::collections::BTreeMap;
use std::path::Path;

use patrimonio_shared::{PatrimonioError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }
}

/// A 2-D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One extracted word with its text-line coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: Rect,
    /// Text block index within the page.
    pub block: u32,
    /// Line index within the block.
    pub line: u32,
}

impl Word {
    pub fn line_key(&self) -> (u32, u32) {
        (self.block, self.line)
    }
}

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: usize,
    /// Page box. Markers are offset from `bounds.x0`.
    #[serde(default)]
    pub bounds: Rect,
    /// Plain page text, lines separated by `\n`.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

impl PageLayout {
    /// Page text as lines.
    ///
    /// When the extractor supplied no plain text, lines are rebuilt from the
    /// words grouped by `(block, line)`, left to right.
    pub fn text_lines(&self) -> Vec<String> {
        if !self.text.trim().is_empty() || self.words.is_empty() {
            return self.text.lines().map(str::to_string).collect();
        }

        let mut grouped: BTreeMap<(u32, u32), Vec<&Word>> = BTreeMap::new();
        for word in &self.words {
            grouped.entry(word.line_key()).or_default().push(word);
        }

        grouped
            .into_values()
            .map(|mut words| {
                words.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
                words
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// All words on the given `(block, line)`, left to right.
    pub fn line_words(&self, key: (u32, u32)) -> Vec<&Word> {
        let mut words: Vec<&Word> = self.words.iter().filter(|w| w.line_key() == key).collect();
        words.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        words
    }
}

/// Per-page text and geometry of a whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    /// Parse a layout from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PatrimonioError::parse(format!("invalid layout: {e}")))
    }

    /// Read a layout JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PatrimonioError::io(path, e))?;
        let layout = Self::from_json(&content)?;
        debug!(path = %path.display(), pages = layout.pages.len(), "document layout loaded");
        Ok(layout)
    }
}
