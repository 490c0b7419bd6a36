pub mod stats_report;
pub mod status;

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveDown, MoveLeft, MoveToColumn, MoveUp, RestorePosition, SavePosition},
    queue,
    style::{Attribute, Color, ContentStyle, Print, PrintStyledContent, Stylize},
    terminal::{Clear, ClearType},
};
use itertools::Itertools;

use crate::session::{CellStyle, Effect};
use crate::word_generator::TargetText;

/// Text styles for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub untyped: ContentStyle,
    pub typed: ContentStyle,
    pub error: ContentStyle,
    pub status_idle: ContentStyle,
    pub status_live: ContentStyle,
    pub status_done: ContentStyle,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            untyped: ContentStyle::new().with(Color::DarkGrey),
            typed: ContentStyle::new().with(Color::White),
            error: ContentStyle::new()
                .with(Color::DarkRed)
                .attribute(Attribute::Bold)
                .attribute(Attribute::Underlined),
            status_idle: ContentStyle::new().with(Color::Green).attribute(Attribute::Dim),
            status_live: ContentStyle::new().with(Color::Green),
            status_done: ContentStyle::new()
                .with(Color::DarkYellow)
                .attribute(Attribute::Dim),
        }
    }
}

impl Palette {
    fn cell(&self, style: CellStyle) -> ContentStyle {
        match style {
            CellStyle::Untyped => self.untyped,
            CellStyle::Typed => self.typed,
            CellStyle::Error => self.error,
        }
    }
}

/// Draws the text block and applies effects to it.
///
/// Layout: the status line on top, the text rows right below it. The saved
/// cursor position always points at the status line.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    palette: Palette,
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Print the placeholder status line and the untyped text, then park the
    /// cursor at the first text cell.
    pub fn draw_intro<W: Write>(&self, out: &mut W, text: &TargetText, status: &str) -> io::Result<()> {
        queue!(
            out,
            PrintStyledContent(self.palette.status_idle.apply(status)),
            Print("\r\n")
        )?;
        let body = text.lines().iter().join("\r\n");
        queue!(out, PrintStyledContent(self.palette.untyped.apply(body)))?;
        queue!(
            out,
            MoveToColumn(0),
            MoveUp(text.line_count().max(1) as u16),
            SavePosition,
            MoveDown(1)
        )?;
        out.flush()
    }

    pub fn apply<W: Write>(&self, out: &mut W, effects: &[Effect]) -> io::Result<()> {
        for effect in effects {
            match effect {
                Effect::Put { ch, style } => {
                    queue!(out, PrintStyledContent(self.palette.cell(*style).apply(*ch)))?;
                }
                Effect::Mark { ch, style } => {
                    queue!(
                        out,
                        PrintStyledContent(self.palette.cell(*style).apply(*ch)),
                        MoveLeft(1)
                    )?;
                }
                Effect::Unput { ch, unwrap, column } => {
                    if *unwrap {
                        queue!(out, MoveUp(1), MoveToColumn(*column as u16))?;
                    } else {
                        queue!(out, MoveLeft(1))?;
                    }
                    queue!(
                        out,
                        PrintStyledContent(self.palette.untyped.apply(*ch)),
                        MoveLeft(1)
                    )?;
                }
                Effect::NextRow => {
                    queue!(out, MoveDown(1), MoveToColumn(0))?;
                }
                Effect::AppendLine { line, line_count } => {
                    // a bare line feed scrolls when the block reaches the bottom of the screen
                    queue!(
                        out,
                        Print("\n"),
                        PrintStyledContent(self.palette.untyped.apply(line.as_str())),
                        MoveToColumn(0),
                        MoveUp(*line_count as u16),
                        SavePosition
                    )?;
                    if *line_count > 1 {
                        queue!(out, MoveDown(*line_count as u16 - 1))?;
                    }
                }
            }
        }
        out.flush()
    }

    /// Wipe the status line and all text rows (cancelled session).
    pub fn clear<W: Write>(&self, out: &mut W, line_count: usize) -> io::Result<()> {
        queue!(out, RestorePosition)?;
        for _ in 0..=line_count {
            queue!(out, Clear(ClearType::CurrentLine), MoveDown(1))?;
        }
        queue!(out, RestorePosition, MoveToColumn(0))?;
        out.flush()
    }

    /// Replace the status line with the final result and move below the text.
    pub fn draw_final<W: Write>(&self, out: &mut W, status: &str, line_count: usize) -> io::Result<()> {
        queue!(
            out,
            RestorePosition,
            Clear(ClearType::CurrentLine),
            MoveToColumn(0),
            PrintStyledContent(self.palette.status_done.apply(status))
        )?;
        if line_count > 0 {
            queue!(out, MoveDown(line_count as u16))?;
        }
        queue!(out, Print("\r\n"))?;
        out.flush()
    }
}
