//! Reading tools: word streams for RSVP speed reading and line grouping for text export

use crate::document::PdfDocument;
use crate::error::PdfSuiteError;
use crate::forms::text_string;
use crate::services::PageMetrics;
use lopdf::content::{Content, Operation};
use lopdf::Object;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

pub const MIN_WPM: u32 = 100;
pub const MAX_WPM: u32 = 1000;
pub const DEFAULT_WPM: u32 = 300;

/// Items closer than this vertically sort as one line.
const SAME_LINE_TOLERANCE: f64 = 5.0;
/// A vertical jump larger than this starts a new line.
const LINE_BREAK_THRESHOLD: f64 = 10.0;

/// Whitespace-separated words with runs of whitespace collapsed.
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Every word of the document, pages joined in order.
pub fn document_words(doc: &PdfDocument) -> Result<Vec<String>, PdfSuiteError> {
    let mut words = Vec::new();
    for index in 0..doc.page_count() {
        words.extend(split_words(&doc.extract_text(index)?));
    }
    tracing::debug!(words = words.len(), "Extracted reading words");
    Ok(words)
}

/// Rapid serial visual presentation state: one word at a time at a fixed pace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsvpReader {
    words: Vec<String>,
    index: usize,
    wpm: u32,
    playing: bool,
}

impl RsvpReader {
    pub fn new(words: Vec<String>) -> Self {
        Self {
            words,
            index: 0,
            wpm: DEFAULT_WPM,
            playing: false,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(split_words(text))
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.words.get(self.index).map(String::as_str)
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    /// Set the reading speed, clamped to `MIN_WPM..=MAX_WPM`.
    pub fn set_wpm(&mut self, wpm: u32) {
        self.wpm = wpm.clamp(MIN_WPM, MAX_WPM);
    }

    /// Time each word stays on screen.
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.wpm))
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = !self.words.is_empty();
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move to the next word. At the last word playback stops and this returns false.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 >= self.words.len() {
            self.playing = false;
            return false;
        }
        self.index += 1;
        true
    }

    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.last_index());
    }

    /// Jump by `delta` words, stopping at either end.
    pub fn skip(&mut self, delta: isize) {
        let target = self.index.saturating_add_signed(delta);
        self.seek(target);
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.index = 0;
    }

    /// Fraction of the text shown so far, counting the current word.
    pub fn progress(&self) -> f64 {
        if self.words.is_empty() {
            0.0
        } else {
            (self.index + 1) as f64 / self.words.len() as f64
        }
    }

    fn last_index(&self) -> usize {
        self.words.len().saturating_sub(1)
    }
}

/// A word split around its optimal recognition point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orp<'a> {
    pub left: &'a str,
    pub pivot: &'a str,
    pub right: &'a str,
}

impl<'a> Orp<'a> {
    /// The pivot is the character at `len / 2`, counted in characters.
    pub fn split(word: &'a str) -> Self {
        let center = word.chars().count() / 2;
        let mut boundaries = word
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(word.len()))
            .skip(center);
        let start = boundaries.next().unwrap_or(word.len());
        let end = boundaries.next().unwrap_or(word.len());
        Self {
            left: &word[..start],
            pivot: &word[start..end],
            right: &word[end..],
        }
    }
}

/// A positioned run of text on a page, in document points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// TJ adjustments beyond this many thousandths of an em read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = 250.0;

/// Positioned text runs of one page, in the order the content stream shows them.
pub fn page_text_items(doc: &PdfDocument, index: usize) -> Result<Vec<TextItem>, PdfSuiteError> {
    doc.ensure_available()?;
    let page_id = doc.page_id(index)?;
    let content = doc.as_lopdf().get_page_content(page_id)?;
    let operations = Content::decode(&content)?.operations;
    Ok(positioned_text(&operations))
}

/// Positioned text items of every page, ready for [`group_lines`].
pub fn document_text_items(doc: &PdfDocument) -> Result<Vec<Vec<TextItem>>, PdfSuiteError> {
    (0..doc.page_count())
        .map(|index| page_text_items(doc, index))
        .collect()
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(f64::from(*r)),
            _ => None,
        })
        .collect()
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    match numbers(operands).as_slice() {
        &[a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

/// Tracks the text and line matrices while walking a content stream.
struct TextState {
    ctm: Matrix,
    saved: Vec<Matrix>,
    text: Matrix,
    line: Matrix,
    leading: f64,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            saved: Vec::new(),
            text: IDENTITY,
            line: IDENTITY,
            leading: 0.0,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line);
        self.text = self.line;
    }

    fn origin(&self) -> (f64, f64) {
        let m = multiply(&self.text, &self.ctm);
        (m[4], m[5])
    }
}

fn positioned_text(operations: &[Operation]) -> Vec<TextItem> {
    let mut state = TextState::new();
    let mut items = Vec::new();

    for op in operations {
        let shown = match op.operator.as_str() {
            "q" => {
                state.saved.push(state.ctm);
                None
            }
            "Q" => {
                if let Some(ctm) = state.saved.pop() {
                    state.ctm = ctm;
                }
                None
            }
            "cm" => {
                if let Some(m) = matrix_operand(&op.operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
                None
            }
            "BT" => {
                state.text = IDENTITY;
                state.line = IDENTITY;
                None
            }
            "TL" => {
                if let Some(&leading) = numbers(&op.operands).first() {
                    state.leading = leading;
                }
                None
            }
            "Td" | "TD" => {
                if let &[tx, ty] = numbers(&op.operands).as_slice() {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
                None
            }
            "Tm" => {
                if let Some(m) = matrix_operand(&op.operands) {
                    state.text = m;
                    state.line = m;
                }
                None
            }
            "T*" => {
                state.move_line(0.0, -state.leading);
                None
            }
            "Tj" => op.operands.first().and_then(text_string),
            "'" => {
                state.move_line(0.0, -state.leading);
                op.operands.first().and_then(text_string)
            }
            "\"" => {
                state.move_line(0.0, -state.leading);
                op.operands.get(2).and_then(text_string)
            }
            "TJ" => op.operands.first().and_then(|o| o.as_array().ok()).map(|parts| {
                let mut text = String::new();
                for part in parts {
                    let adjustment = match part {
                        Object::Integer(i) => *i as f64,
                        Object::Real(r) => f64::from(*r),
                        other => {
                            text.extend(text_string(other));
                            continue;
                        }
                    };
                    if adjustment < -TJ_SPACE_THRESHOLD {
                        text.push(' ');
                    }
                }
                text
            }),
            _ => None,
        };

        if let Some(text) = shown {
            if !text.trim().is_empty() {
                let (x, y) = state.origin();
                items.push(TextItem { text, x, y });
            }
        }
    }
    items
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum TextBlock {
    Line(String),
    PageBreak,
}

/// Reassemble reading-order lines from the text items of each page.
///
/// Items are ordered top to bottom, then left to right within a line.
/// Empty lines are dropped and a page break separates consecutive pages.
pub fn group_lines(pages: &[Vec<TextItem>]) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for (page_number, items) in pages.iter().enumerate() {
        let mut current = String::new();
        let mut last_y: Option<f64> = None;

        for item in reading_order(items) {
            if let Some(y) = last_y {
                if (item.y - y).abs() > LINE_BREAK_THRESHOLD {
                    push_line(&mut blocks, &mut current);
                }
            }
            current.push_str(&item.text);
            current.push(' ');
            last_y = Some(item.y);
        }
        push_line(&mut blocks, &mut current);

        if page_number + 1 < pages.len() {
            blocks.push(TextBlock::PageBreak);
        }
    }
    blocks
}

fn push_line(blocks: &mut Vec<TextBlock>, current: &mut String) {
    let line = current.trim();
    if !line.is_empty() {
        blocks.push(TextBlock::Line(line.to_string()));
    }
    current.clear();
}

/// Sort by descending y, banding items within the same-line tolerance and ordering each band by x.
fn reading_order(items: &[TextItem]) -> Vec<&TextItem> {
    let mut sorted: Vec<&TextItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut ordered = Vec::with_capacity(sorted.len());
    let mut band: Vec<&TextItem> = Vec::new();
    for item in sorted {
        if let Some(first) = band.first() {
            if first.y - item.y > SAME_LINE_TOLERANCE {
                flush_band(&mut band, &mut ordered);
            }
        }
        band.push(item);
    }
    flush_band(&mut band, &mut ordered);
    ordered
}

fn flush_band<'a>(band: &mut Vec<&'a TextItem>, ordered: &mut Vec<&'a TextItem>) {
    band.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    ordered.append(band);
}
