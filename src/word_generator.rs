use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

use crate::error::{Error, Result};

/// Number of lines buffered up front in timed mode
pub const TIMED_INITIAL_LINES: usize = 3;

/// How much text a session asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenMode {
    Words(usize),
    Timed(Duration),
}

/// The text being typed, split into display lines.
///
/// `content` is the concatenation of `lines`; trailing spaces stay at the end
/// of each line and are typed like any other character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetText {
    lines: Vec<String>,
    content: Vec<char>,
}

impl TargetText {
    pub fn new(lines: Vec<String>) -> Self {
        let content = lines.iter().flat_map(|l| l.chars()).collect();
        Self { lines, content }
    }

    pub fn push_line(&mut self, line: String) {
        self.content.extend(line.chars());
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Length of line `row` in characters
    pub fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |l| l.chars().count())
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.content.get(idx).copied()
    }

    pub fn content(&self) -> String {
        self.content.iter().collect()
    }
}

/// Something that can hand out another packed line on demand.
pub trait LineSource {
    fn next_line(&mut self) -> String;
}

/// Packs randomly drawn words onto lines no longer than `max_line_length`.
#[derive(Debug)]
pub struct WordGenerator<R: Rng> {
    words: Vec<String>,
    max_line_length: usize,
    rng: R,
}

impl<R: Rng> WordGenerator<R> {
    pub fn new(words: Vec<String>, max_line_length: usize, rng: R) -> Result<Self> {
        if words.is_empty() {
            return Err(Error::Config("word list is empty".into()));
        }
        if max_line_length == 0 {
            return Err(Error::Config("max line length must be greater than 0".into()));
        }
        Ok(Self {
            words,
            max_line_length,
            rng,
        })
    }

    fn pick(&mut self) -> String {
        // `words` is never empty, see `new`
        self.words
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `word` still fits on `line` together with its trailing separator.
    /// An empty line always takes the word, so long words are never split.
    fn fits(&self, line: &str, word: &str) -> bool {
        line.is_empty() || line.len() + word.len() + 1 <= self.max_line_length
    }

    pub fn generate(&mut self, mode: GenMode) -> TargetText {
        match mode {
            GenMode::Words(count) => self.generate_words(count),
            GenMode::Timed(_) => {
                let mut text = TargetText::default();
                while text.line_count() < TIMED_INITIAL_LINES {
                    let line = self.next_line();
                    text.push_line(line);
                }
                text
            }
        }
    }

    fn generate_words(&mut self, count: usize) -> TargetText {
        let words: Vec<String> = (0..count).map(|_| self.pick()).collect();
        self.pack(&words)
    }

    /// Pack the given words in order. The last word has no trailing separator.
    pub fn pack(&self, words: &[String]) -> TargetText {
        let mut lines = Vec::new();
        let mut line = String::new();
        for (i, word) in words.iter().enumerate() {
            if !self.fits(&line, word) {
                lines.push(std::mem::take(&mut line));
            }
            line.push_str(word);
            if i + 1 < words.len() {
                line.push(' ');
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        TargetText::new(lines)
    }
}

impl<R: Rng> LineSource for WordGenerator<R> {
    /// A full line with a trailing separator. The word that did not fit is dropped.
    fn next_line(&mut self) -> String {
        let mut line = String::new();
        loop {
            let word = self.pick();
            if !self.fits(&line, &word) {
                return line;
            }
            line.push_str(&word);
            line.push(' ');
        }
    }
}
