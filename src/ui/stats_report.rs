use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    widgets::{Cell, Row, Table, Widget},
};

use crate::stats::{CharStat, SessionResult, StatsSummary};
use crate::ui::status::format_elapsed;

const COLUMN_WIDTHS: [u16; 4] = [6, 9, 11, 10];
const COLUMN_SPACING: u16 = 1;

/// One table row per character
pub fn present_row(stat: &CharStat) -> Row<'static> {
    let char_display = if stat.character == ' ' {
        "SPACE".to_string()
    } else {
        stat.character.to_string()
    };

    Row::new(vec![
        Cell::from(char_display),
        Cell::from(stat.correct.to_string()),
        Cell::from(stat.incorrect.to_string()),
        Cell::from(format!("{:.2}%", stat.accuracy)),
    ])
}

/// Render the per-character table as plain text lines, in the order given.
pub fn char_table_lines(chars: &[CharStat]) -> Vec<String> {
    if chars.is_empty() {
        return vec!["No character statistics recorded yet.".to_string()];
    }

    let header = Row::new(vec!["char", "correct", "incorrect", "accuracy"]);
    let rule = Row::new(vec!["----", "-------", "---------", "--------"]);
    let rows: Vec<Row> = std::iter::once(rule)
        .chain(chars.iter().map(present_row))
        .collect();

    let width = COLUMN_WIDTHS.iter().sum::<u16>() + COLUMN_SPACING * (COLUMN_WIDTHS.len() as u16 - 1);
    let height = rows.len() as u16 + 1;
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);

    Table::new(rows, COLUMN_WIDTHS.map(Constraint::Length))
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .render(area, &mut buf);

    buffer_lines(&buf)
}

fn buffer_lines(buf: &Buffer) -> Vec<String> {
    let area = buf.area;
    (area.top()..area.bottom())
        .map(|y| {
            let line: String = (area.left()..area.right())
                .map(|x| buf[(x, y)].symbol())
                .collect();
            line.trim_end().to_string()
        })
        .collect()
}

pub fn summary_lines(summary: Option<&StatsSummary>) -> Vec<String> {
    let Some(s) = summary else {
        return vec!["No sessions recorded yet.".to_string()];
    };
    vec![
        format!("Sessions: {}", s.sessions),
        format!("Average WPM: {:.2}", s.avg_wpm),
        format!("Best WPM: {:.2}", s.best_wpm),
        format!("WPM std dev: {:.2}", s.wpm_std_dev),
        format!("Average Accuracy: {:.2}%", s.avg_accuracy),
        format!("Average Mistakes: {:.2}", s.avg_mistakes),
        format!("Time spent typing: {}", format_elapsed(s.time_spent)),
    ]
}

/// The full `--stats` report
pub fn report(results: &[SessionResult], chars: &[CharStat]) -> String {
    let summary = StatsSummary::from_results(results);
    let mut lines = char_table_lines(chars);
    lines.push(String::new());
    lines.extend(summary_lines(summary.as_ref()));
    lines.join("\n")
}
