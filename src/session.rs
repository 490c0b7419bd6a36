use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::word_generator::TargetText;

/// Per-session options, fixed for the lifetime of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub backspace: bool,
    pub correct_only: bool,
    /// `Some` in timed mode
    pub time_limit: Option<Duration>,
}

impl SessionConfig {
    pub fn is_timed(&self) -> bool {
        self.time_limit.is_some()
    }

    /// Which accuracy formula this session reports
    pub fn accuracy_rule(&self) -> AccuracyRule {
        if self.is_timed() || self.correct_only {
            AccuracyRule::PerKeystroke
        } else {
            AccuracyRule::PerPosition
        }
    }
}

/// `PerPosition`: correct / typed positions. `PerKeystroke`: correct / (correct + mistakes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyRule {
    PerPosition,
    PerKeystroke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing typed yet, timer not running
    #[default]
    Idle,
    Active,
    Terminal,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// Cursor position as a linear index and its row/column decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    pub index: usize,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub correct: u64,
    pub incorrect: u64,
}

impl Tally {
    pub fn accuracy(&self) -> f64 {
        let total = self.correct + self.incorrect;
        if total == 0 {
            100.0
        } else {
            self.correct as f64 / total as f64 * 100.0
        }
    }
}

/// Expected character -> how often it was hit or missed this session
pub type CharTally = BTreeMap<char, Tally>;

/// Text style a rendered cell is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Untyped,
    Typed,
    Error,
}

/// Terminal output produced by a state change, applied by the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Draw `ch` at the live cursor and step right
    Put { ch: char, style: CellStyle },
    /// Draw `ch` at the live cursor without moving (pending mistake)
    Mark { ch: char, style: CellStyle },
    /// Step back one cell and redraw it untyped. `unwrap` means the cursor
    /// moved up to the end of the previous row, landing on `column`.
    Unput {
        ch: char,
        unwrap: bool,
        column: usize,
    },
    /// Move to the start of the next row
    NextRow,
    /// A line was appended to the text; `line_count` includes it
    AppendLine { line: String, line_count: usize },
}

/// The whole mutable model of one typing session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub config: SessionConfig,
    pub text: TargetText,
    pub cursor: CursorState,
    pub typed: Vec<char>,
    pub tally: CharTally,
    pub correct: usize,
    pub mistakes: usize,
    pub mistake_pending: bool,
    pub phase: Phase,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
}

impl SessionState {
    pub fn new(text: TargetText, config: SessionConfig) -> Self {
        Self {
            config,
            text,
            cursor: CursorState::default(),
            typed: Vec::new(),
            tally: CharTally::new(),
            correct: 0,
            mistakes: 0,
            mistake_pending: false,
            phase: Phase::Idle,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Terminal
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.phase = Phase::Active;
    }

    /// Stop the clock at `now`, or at the time limit if that came first.
    pub fn finish(&mut self, now: Instant) {
        if let (None, Some(start)) = (self.ended_at, self.started_at) {
            let end = match self.config.time_limit {
                Some(limit) => now.min(start + limit),
                None => now,
            };
            self.ended_at = Some(end);
        }
        self.phase = Phase::Terminal;
    }

    pub fn expected_char(&self) -> Option<char> {
        self.text.char_at(self.cursor.index)
    }

    /// Time typed so far; frozen once the session ended
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor.index >= self.text.len()
    }

    pub fn time_expired(&self, now: Instant) -> bool {
        match (self.config.time_limit, self.started_at) {
            (Some(limit), Some(_)) => self.elapsed(now) >= limit,
            _ => false,
        }
    }

    /// Record the verdict for the character at the cursor.
    pub fn judge(&mut self, typed: char) -> Outcome {
        let expected = self.expected_char();
        let outcome = if Some(typed) == expected {
            self.correct += 1;
            Outcome::Correct
        } else {
            self.mistakes += 1;
            Outcome::Incorrect
        };
        if let Some(expected) = expected {
            let entry = self.tally.entry(expected).or_default();
            match outcome {
                Outcome::Correct => entry.correct += 1,
                Outcome::Incorrect => entry.incorrect += 1,
            }
        }
        outcome
    }

    /// Consume the position under the cursor with `typed`, drawing `glyph` in `style`.
    ///
    /// A pending correct-only slot is overwritten instead of appended to.
    /// Returns the effects and whether the cursor wrapped to a new row.
    pub fn advance(&mut self, typed: char, glyph: char, style: CellStyle) -> (Vec<Effect>, bool) {
        if self.mistake_pending {
            if let Some(slot) = self.typed.get_mut(self.cursor.index) {
                *slot = typed;
            }
            self.mistake_pending = false;
        } else {
            self.typed.push(typed);
        }
        self.cursor.index += 1;
        self.cursor.column += 1;

        let mut effects = vec![Effect::Put { ch: glyph, style }];
        let wrapped = self.cursor.column >= self.text.line_len(self.cursor.row)
            && self.cursor.index < self.text.len();
        if wrapped {
            self.cursor.row += 1;
            self.cursor.column = 0;
            effects.push(Effect::NextRow);
        }
        (effects, wrapped)
    }

    /// Hold the cursor on a mistyped position (correct-only mode).
    pub fn hold(&mut self, typed: char, glyph: char) -> Vec<Effect> {
        if self.mistake_pending {
            if let Some(slot) = self.typed.get_mut(self.cursor.index) {
                *slot = typed;
            }
        } else {
            self.typed.push(typed);
            self.mistake_pending = true;
        }
        vec![Effect::Mark {
            ch: glyph,
            style: CellStyle::Error,
        }]
    }

    /// Undo the last consumed position.
    pub fn retreat(&mut self) -> Vec<Effect> {
        if self.cursor.index == 0 {
            return Vec::new();
        }
        self.cursor.index -= 1;
        let unwrap = self.cursor.column == 0;
        if unwrap {
            self.cursor.row -= 1;
            self.cursor.column = self.text.line_len(self.cursor.row).saturating_sub(1);
        } else {
            self.cursor.column -= 1;
        }

        let expected = self.text.char_at(self.cursor.index);
        if let Some(removed) = self.typed.pop() {
            if Some(removed) == expected {
                self.correct = self.correct.saturating_sub(1);
            }
        }

        vec![Effect::Unput {
            ch: expected.unwrap_or(' '),
            unwrap,
            column: self.cursor.column,
        }]
    }

    /// Append a freshly generated line (timed mode).
    pub fn append_line(&mut self, line: String) -> Effect {
        self.text.push_line(line.clone());
        Effect::AppendLine {
            line,
            line_count: self.text.line_count(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        let (hits, total) = match self.config.accuracy_rule() {
            AccuracyRule::PerPosition => (self.correct, self.typed.len()),
            AccuracyRule::PerKeystroke => (self.correct, self.correct + self.mistakes),
        };
        if total == 0 {
            100.0
        } else {
            (hits as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        }
    }

    /// Words per minute over `elapsed`, counting five correct characters as a word
    pub fn wpm(&self, elapsed: Duration) -> f64 {
        wpm(self.correct, elapsed)
    }

    /// The typed record must line up with the cursor.
    pub fn check_consistency(&self) -> Result<()> {
        let expected_len = self.cursor.index + usize::from(self.mistake_pending);
        if self.typed.len() != expected_len {
            return Err(Error::Invariant(format!(
                "typed record holds {} entries but cursor is at {} (pending: {})",
                self.typed.len(),
                self.cursor.index,
                self.mistake_pending
            )));
        }
        if self.cursor.index > self.text.len() {
            return Err(Error::Invariant(format!(
                "cursor index {} is past the end of the text ({})",
                self.cursor.index,
                self.text.len()
            )));
        }
        Ok(())
    }
}

pub fn wpm(correct: usize, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes > 0.0 {
        correct as f64 / 5.0 / minutes
    } else {
        0.0
    }
}
