//! Speed-reading bindings
//!
//! JavaScript owns the timer: it calls `advance` every `delayMs` while
//! `isPlaying` is true and redraws from `currentWord`.

use crate::{to_js, to_js_error};
use pdfsuite_core::reader::{document_words, Orp, RsvpReader};
use pdfsuite_core::{PdfDocument, PdfSuiteError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Words jumped by the skip buttons.
const SKIP_WORDS: isize = 10;

#[derive(Debug, Serialize, PartialEq)]
struct WordParts<'a> {
    left: &'a str,
    pivot: &'a str,
    right: &'a str,
}

#[wasm_bindgen]
pub struct RsvpPlayer {
    reader: RsvpReader,
}

#[wasm_bindgen]
impl RsvpPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(text: &str) -> Self {
        Self {
            reader: RsvpReader::from_text(text),
        }
    }

    /// Load every word of a PDF, pages in order
    #[wasm_bindgen(js_name = fromPdf)]
    pub fn from_pdf(bytes: &[u8]) -> Result<RsvpPlayer, JsValue> {
        Self::from_pdf_internal(bytes).map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = wordCount)]
    pub fn word_count(&self) -> usize {
        self.reader.words().len()
    }

    #[wasm_bindgen(getter)]
    pub fn index(&self) -> usize {
        self.reader.index()
    }

    #[wasm_bindgen(getter)]
    pub fn wpm(&self) -> u32 {
        self.reader.wpm()
    }

    #[wasm_bindgen(js_name = setWpm)]
    pub fn set_wpm(&mut self, wpm: u32) {
        self.reader.set_wpm(wpm);
    }

    #[wasm_bindgen(getter, js_name = delayMs)]
    pub fn delay_ms(&self) -> f64 {
        self.reader.delay().as_secs_f64() * 1000.0
    }

    #[wasm_bindgen(getter, js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.reader.is_playing()
    }

    #[wasm_bindgen(getter)]
    pub fn progress(&self) -> f64 {
        self.reader.progress()
    }

    /// `{ left, pivot, right }` for the current word, or null when there are no words
    #[wasm_bindgen(js_name = currentWord)]
    pub fn current_word(&self) -> Result<JsValue, JsValue> {
        match self.current_parts() {
            Some(parts) => to_js(&parts),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn toggle(&mut self) {
        self.reader.toggle();
    }

    pub fn pause(&mut self) {
        self.reader.pause();
    }

    /// Returns false once the last word has been shown
    pub fn advance(&mut self) -> bool {
        self.reader.advance()
    }

    #[wasm_bindgen(js_name = skipBack)]
    pub fn skip_back(&mut self) {
        self.reader.skip(-SKIP_WORDS);
    }

    #[wasm_bindgen(js_name = skipForward)]
    pub fn skip_forward(&mut self) {
        self.reader.skip(SKIP_WORDS);
    }

    pub fn seek(&mut self, index: usize) {
        self.reader.seek(index);
    }

    pub fn reset(&mut self) {
        self.reader.reset();
    }
}

impl RsvpPlayer {
    fn from_pdf_internal(bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        let doc = PdfDocument::load(bytes)?;
        Ok(Self {
            reader: RsvpReader::new(document_words(&doc)?),
        })
    }

    fn current_parts(&self) -> Option<WordParts<'_>> {
        self.reader.current().map(|word| {
            let orp = Orp::split(word);
            WordParts {
                left: orp.left,
                pivot: orp.pivot,
                right: orp.right,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_current_word_parts() {
        let player = RsvpPlayer::new("reading quickly");
        assert_eq!(
            player.current_parts(),
            Some(WordParts {
                left: "rea",
                pivot: "d",
                right: "ing"
            })
        );
    }

    #[test]
    fn test_empty_text_has_no_word() {
        let mut player = RsvpPlayer::new("   ");
        assert_eq!(player.word_count(), 0);
        assert!(player.current_parts().is_none());
        player.toggle();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_skip_buttons_move_ten_words() {
        let text: String = (0..30).map(|i| format!("w{} ", i)).collect();
        let mut player = RsvpPlayer::new(&text);
        player.skip_forward();
        assert_eq!(player.index(), 10);
        player.skip_back();
        player.skip_back();
        assert_eq!(player.index(), 0);
    }

    #[test]
    fn test_delay_follows_wpm() {
        let mut player = RsvpPlayer::new("a b c");
        assert_eq!(player.delay_ms(), 200.0);
        player.set_wpm(600);
        assert_eq!(player.delay_ms(), 100.0);
    }

    #[test]
    fn test_from_pdf_reads_all_pages() {
        let player = RsvpPlayer::from_pdf_internal(&create_test_pdf(2)).unwrap();
        // Each fixture page reads "Page N"
        assert_eq!(player.word_count(), 4);
    }
}
