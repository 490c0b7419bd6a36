use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{MoveDown, MoveToColumn, RestorePosition},
    queue,
    style::PrintStyledContent,
    terminal::{Clear, ClearType},
};

use crate::session::{wpm, SessionState};
use crate::ui::Palette;

/// Copy of everything the status line shows, taken between transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub started: bool,
    pub elapsed: Duration,
    pub correct: usize,
    pub mistakes: usize,
    pub text_len: usize,
    pub accuracy: f64,
    pub row: usize,
    pub column: usize,
}

impl StatusSnapshot {
    pub fn capture(state: &SessionState, now: Instant) -> Self {
        Self {
            started: state.has_started(),
            elapsed: state.elapsed(now),
            correct: state.correct,
            mistakes: state.mistakes,
            text_len: state.text.len(),
            accuracy: state.accuracy(),
            row: state.cursor.row,
            column: state.cursor.column,
        }
    }

    pub fn wpm(&self) -> f64 {
        wpm(self.correct, self.elapsed)
    }

    /// Live line: `wpm  elapsed  correct/text length/mistakes  accuracy`
    pub fn live_line(&self) -> String {
        format_line(self.wpm(), self.elapsed, self.correct, self.text_len, self.mistakes, self.accuracy)
    }
}

/// Shown before the first keystroke
pub fn placeholder_line(text_len: usize) -> String {
    format!("000wpm  0s  0/{text_len}/0  100%")
}

pub fn format_line(
    wpm: f64,
    elapsed: Duration,
    correct: usize,
    total: usize,
    mistakes: usize,
    accuracy: f64,
) -> String {
    format!(
        "{:03.0}wpm  {}  {}/{}/{}  {:.2}%",
        wpm,
        format_elapsed(elapsed),
        correct,
        total,
        mistakes,
        accuracy
    )
}

/// Whole seconds, in the `1h2m3s` form
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs_f64().round() as u64;
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

/// Rewrites the status line in place and puts the cursor back where typing continues.
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    palette: Palette,
}

impl StatusReporter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn render<W: Write>(&self, out: &mut W, snapshot: &StatusSnapshot) -> io::Result<()> {
        if !snapshot.started {
            return Ok(());
        }
        queue!(
            out,
            RestorePosition,
            Clear(ClearType::CurrentLine),
            MoveToColumn(0),
            PrintStyledContent(self.palette.status_live.apply(snapshot.live_line())),
            MoveDown(snapshot.row as u16 + 1),
            MoveToColumn(snapshot.column as u16)
        )?;
        out.flush()
    }
}
