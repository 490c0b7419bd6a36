use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::debug;
use std::time::Instant;

use crate::session::{CellStyle, Effect, Outcome, Phase, SessionState};
use crate::word_generator::LineSource;

/// Keystroke after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Cancel,
    Backspace,
    Printable(char),
    Ignored,
}

impl InputEvent {
    pub fn classify(key: &KeyEvent) -> Self {
        if key.kind == KeyEventKind::Release {
            return InputEvent::Ignored;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => InputEvent::Cancel,
            KeyCode::Char('h') if ctrl => InputEvent::Backspace,
            KeyCode::Backspace => InputEvent::Backspace,
            KeyCode::Char(c)
                if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) && is_printable(c) =>
            {
                InputEvent::Printable(c)
            }
            _ => InputEvent::Ignored,
        }
    }
}

/// Printable ASCII, space included
pub fn is_printable(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Why a session reached its terminal phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Cancelled,
    Completed,
    TimedOut,
}

/// Result of feeding one input event to the session
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub ending: Option<Ending>,
}

/// Glyph shown for a mistyped position: the expected character, with the
/// separator made visible.
fn error_glyph(expected: char) -> char {
    if expected == ' ' {
        '_'
    } else {
        expected
    }
}

/// Default mode: judge and always advance.
pub fn write_normal(state: &mut SessionState, c: char, lines: &mut dyn LineSource) -> Vec<Effect> {
    let Some(expected) = state.expected_char() else {
        return Vec::new();
    };
    let (glyph, style) = match state.judge(c) {
        Outcome::Correct => (c, CellStyle::Typed),
        Outcome::Incorrect => (error_glyph(expected), CellStyle::Error),
    };
    let (mut effects, wrapped) = state.advance(c, glyph, style);
    if wrapped {
        effects.extend(reflow(state, lines));
    }
    effects
}

/// Correct-only mode: a mistake holds the cursor until the same position is
/// typed correctly. A corrected position is redrawn in the error style.
pub fn write_correct_only(
    state: &mut SessionState,
    c: char,
    lines: &mut dyn LineSource,
) -> Vec<Effect> {
    let Some(expected) = state.expected_char() else {
        return Vec::new();
    };
    match state.judge(c) {
        Outcome::Incorrect => state.hold(c, error_glyph(expected)),
        Outcome::Correct => {
            let style = if state.mistake_pending {
                CellStyle::Error
            } else {
                CellStyle::Typed
            };
            let (mut effects, wrapped) = state.advance(c, c, style);
            if wrapped {
                effects.extend(reflow(state, lines));
            }
            effects
        }
    }
}

/// In timed mode keep one untyped line buffered below the cursor row.
fn reflow(state: &mut SessionState, lines: &mut dyn LineSource) -> Option<Effect> {
    if !state.config.is_timed() || state.cursor.row + 1 < state.text.line_count() {
        return None;
    }
    let line = lines.next_line();
    debug!(
        "reflow: appending line {} ({} chars)",
        state.text.line_count() + 1,
        line.len()
    );
    Some(state.append_line(line))
}

/// Apply one input event at time `now`.
pub fn apply(
    state: &mut SessionState,
    input: InputEvent,
    now: Instant,
    lines: &mut dyn LineSource,
) -> Transition {
    if state.has_finished() {
        return Transition::default();
    }

    let effects = match input {
        InputEvent::Cancel => {
            state.finish(now);
            return Transition {
                effects: Vec::new(),
                ending: Some(Ending::Cancelled),
            };
        }
        InputEvent::Backspace if state.config.backspace && !state.config.correct_only => {
            state.retreat()
        }
        InputEvent::Backspace | InputEvent::Ignored => Vec::new(),
        InputEvent::Printable(c) => {
            if state.phase == Phase::Idle {
                state.start(now);
            } else if state.time_expired(now) {
                // arrived after the limit but before the tick noticed it
                state.finish(now);
                return Transition {
                    effects: Vec::new(),
                    ending: Some(Ending::TimedOut),
                };
            }
            if state.config.correct_only {
                write_correct_only(state, c, lines)
            } else {
                write_normal(state, c, lines)
            }
        }
    };

    Transition {
        effects,
        ending: check_ending(state, now),
    }
}

/// Move to the terminal phase when the text is done or the time is up.
pub fn check_ending(state: &mut SessionState, now: Instant) -> Option<Ending> {
    if state.has_finished() || !state.has_started() {
        return None;
    }
    let ending = if state.is_complete() {
        Ending::Completed
    } else if state.time_expired(now) {
        Ending::TimedOut
    } else {
        return None;
    };
    state.finish(now);
    Some(ending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CursorState, SessionConfig};
    use crate::word_generator::TargetText;
    use std::time::Duration;

    struct FixedLines(&'static str);

    impl LineSource for FixedLines {
        fn next_line(&mut self) -> String {
            self.0.to_string()
        }
    }

    fn session(lines: &[&str], config: SessionConfig) -> SessionState {
        let text = TargetText::new(lines.iter().map(|l| l.to_string()).collect());
        SessionState::new(text, config)
    }

    fn normal() -> SessionConfig {
        SessionConfig {
            backspace: true,
            ..SessionConfig::default()
        }
    }

    fn type_str(state: &mut SessionState, s: &str, now: Instant) -> Vec<Transition> {
        let mut src = FixedLines("more words ");
        s.chars()
            .map(|c| apply(state, InputEvent::Printable(c), now, &mut src))
            .collect()
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn classify_keys() {
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputEvent::Cancel
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Backspace, KeyModifiers::NONE)),
            InputEvent::Backspace
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char('h'), KeyModifiers::CONTROL)),
            InputEvent::Backspace
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            InputEvent::Printable('A')
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char(' '), KeyModifiers::NONE)),
            InputEvent::Printable(' ')
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char('é'), KeyModifiers::NONE)),
            InputEvent::Ignored
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Enter, KeyModifiers::NONE)),
            InputEvent::Ignored
        );
        assert_eq!(
            InputEvent::classify(&key(KeyCode::Char('x'), KeyModifiers::ALT)),
            InputEvent::Ignored
        );
    }

    #[test]
    fn typing_cat_exactly() {
        let mut s = session(&["cat"], normal());
        let t = type_str(&mut s, "cat", Instant::now());

        assert_eq!(s.correct, 3);
        assert_eq!(s.mistakes, 0);
        assert_eq!(s.cursor.index, 3);
        assert_eq!(t.last().unwrap().ending, Some(Ending::Completed));
        assert!(t[..2].iter().all(|t| t.ending.is_none()));
        assert_eq!(s.phase, Phase::Terminal);
    }

    #[test]
    fn typing_cbt_marks_the_a() {
        let mut s = session(&["cat"], normal());
        let t = type_str(&mut s, "cbt", Instant::now());

        assert_eq!(
            t[1].effects,
            vec![Effect::Put { ch: 'a', style: CellStyle::Error }]
        );
        assert_eq!(
            t[2].effects,
            vec![Effect::Put { ch: 't', style: CellStyle::Typed }]
        );
        assert_eq!(s.mistakes, 1);
        assert_eq!(s.correct, 2);
        assert!((s.accuracy() - 66.67).abs() < 0.01);
        assert_eq!(s.tally[&'a'].incorrect, 1);
    }

    #[test]
    fn missed_space_shows_underscore() {
        let mut s = session(&["a b"], normal());
        let t = type_str(&mut s, "ax", Instant::now());
        assert_eq!(
            t[1].effects,
            vec![Effect::Put { ch: '_', style: CellStyle::Error }]
        );
        assert_eq!(s.tally[&' '].incorrect, 1);
    }

    #[test]
    fn first_printable_starts_timer() {
        let mut s = session(&["abc"], normal());
        let t0 = Instant::now();
        let mut src = FixedLines("x ");

        apply(&mut s, InputEvent::Backspace, t0, &mut src);
        apply(&mut s, InputEvent::Ignored, t0, &mut src);
        assert_eq!(s.phase, Phase::Idle);

        apply(&mut s, InputEvent::Printable('a'), t0, &mut src);
        assert_eq!(s.phase, Phase::Active);
        assert_eq!(s.started_at, Some(t0));
    }

    #[test]
    fn typed_record_tracks_cursor() {
        let mut s = session(&["the quick ", "brown fox"], normal());
        let mut src = FixedLines("x ");
        let now = Instant::now();
        let inputs = "thx qu"
            .chars()
            .map(InputEvent::Printable)
            .chain([InputEvent::Backspace, InputEvent::Backspace])
            .chain("uick brpwn".chars().map(InputEvent::Printable))
            .chain([InputEvent::Backspace, InputEvent::Ignored]);
        for input in inputs {
            apply(&mut s, input, now, &mut src);
            assert_eq!(s.typed.len(), s.cursor.index);
            assert!(s.check_consistency().is_ok());
        }
        assert_eq!(s.cursor.row, 1);
    }

    #[test]
    fn backspace_then_retype_restores_state() {
        let mut s = session(&["ab ", "cd"], normal());
        let now = Instant::now();
        type_str(&mut s, "ab ", now);
        let cursor = s.cursor;
        let correct = s.correct;

        let mut src = FixedLines("x ");
        let t = apply(&mut s, InputEvent::Backspace, now, &mut src);
        assert_eq!(
            t.effects,
            vec![Effect::Unput { ch: ' ', unwrap: true, column: 2 }]
        );
        apply(&mut s, InputEvent::Printable(' '), now, &mut src);

        assert_eq!(s.cursor, cursor);
        assert_eq!(s.correct, correct);
    }

    #[test]
    fn backspace_disabled_is_noop() {
        let mut s = session(&["abc"], SessionConfig::default());
        let now = Instant::now();
        type_str(&mut s, "ab", now);
        let before = (s.cursor, s.typed.clone(), s.correct);

        let t = apply(&mut s, InputEvent::Backspace, now, &mut FixedLines("x "));
        assert!(t.effects.is_empty());
        assert_eq!((s.cursor, s.typed.clone(), s.correct), before);
    }

    #[test]
    fn correct_only_holds_until_fixed() {
        let config = SessionConfig {
            correct_only: true,
            backspace: true,
            ..SessionConfig::default()
        };
        let mut s = session(&["hi"], config);
        let now = Instant::now();
        let mut src = FixedLines("x ");

        let t = apply(&mut s, InputEvent::Printable('x'), now, &mut src);
        assert!(s.mistake_pending);
        assert_eq!(s.cursor.index, 0);
        assert_eq!(
            t.effects,
            vec![Effect::Mark { ch: 'h', style: CellStyle::Error }]
        );

        // backspace never skips a correction
        apply(&mut s, InputEvent::Backspace, now, &mut src);
        assert!(s.mistake_pending);

        let t = apply(&mut s, InputEvent::Printable('h'), now, &mut src);
        assert!(!s.mistake_pending);
        assert_eq!(s.cursor.index, 1);
        assert_eq!(
            t.effects,
            vec![Effect::Put { ch: 'h', style: CellStyle::Error }]
        );

        let t = apply(&mut s, InputEvent::Printable('i'), now, &mut src);
        assert_eq!(t.ending, Some(Ending::Completed));
        assert_eq!(s.correct, 2);
        assert_eq!(s.mistakes, 1);
        assert!((s.accuracy() - 66.67).abs() < 0.01);
    }

    #[test]
    fn correct_only_never_passes_a_mistake() {
        let config = SessionConfig {
            correct_only: true,
            ..SessionConfig::default()
        };
        let mut s = session(&["abcd"], config);
        let mut src = FixedLines("x ");
        let now = Instant::now();
        for c in "axxbzcdd".chars() {
            let before = s.cursor.index;
            apply(&mut s, InputEvent::Printable(c), now, &mut src);
            if s.mistake_pending {
                assert_eq!(s.cursor.index, before);
            }
            assert!(s.check_consistency().is_ok());
        }
        assert_eq!(s.text.content(), s.typed.iter().collect::<String>());
    }

    #[test]
    fn cancel_ends_immediately() {
        let mut s = session(&["abc"], normal());
        let now = Instant::now();
        type_str(&mut s, "a", now);
        let t = apply(&mut s, InputEvent::Cancel, now, &mut FixedLines("x "));
        assert_eq!(t.ending, Some(Ending::Cancelled));
        assert!(s.has_finished());

        // input after the end does nothing
        let t = apply(&mut s, InputEvent::Printable('b'), now, &mut FixedLines("x "));
        assert_eq!(t, Transition::default());
        assert_eq!(s.cursor.index, 1);
    }

    #[test]
    fn timed_mode_reflows_on_last_line() {
        let config = SessionConfig {
            backspace: true,
            time_limit: Some(Duration::from_secs(60)),
            ..SessionConfig::default()
        };
        let mut s = session(&["ab ", "cd ", "ef "], config);
        let now = Instant::now();

        let t = type_str(&mut s, "ab ", now);
        assert_eq!(s.text.line_count(), 3);
        assert_eq!(t[2].effects.last(), Some(&Effect::NextRow));

        let t = type_str(&mut s, "cd ", now);
        assert_eq!(s.cursor, CursorState { index: 6, row: 2, column: 0 });
        assert_eq!(s.text.line_count(), 4);
        assert_eq!(
            t[2].effects.last(),
            Some(&Effect::AppendLine {
                line: "more words ".into(),
                line_count: 4
            })
        );
        assert_eq!(s.text.content(), "ab cd ef more words ");
    }

    #[test]
    fn correct_only_mistake_on_wrap_space_defers_reflow() {
        let config = SessionConfig {
            correct_only: true,
            time_limit: Some(Duration::from_secs(60)),
            ..SessionConfig::default()
        };
        let mut s = session(&["ab ", "cd ", "ef "], config);
        let mut src = FixedLines("gh ");
        let now = Instant::now();

        for c in "ab cd".chars() {
            apply(&mut s, InputEvent::Printable(c), now, &mut src);
            assert!(s.check_consistency().is_ok());
        }
        assert_eq!(s.cursor, CursorState { index: 5, row: 1, column: 2 });

        // wrong key on the trailing space of the second-to-last line
        let t = apply(&mut s, InputEvent::Printable('x'), now, &mut src);
        assert!(s.mistake_pending);
        assert_eq!(t.effects, vec![Effect::Mark { ch: '_', style: CellStyle::Error }]);
        assert_eq!(s.cursor, CursorState { index: 5, row: 1, column: 2 });
        assert_eq!(s.text.line_count(), 3);
        assert!(s.check_consistency().is_ok());

        let t = apply(&mut s, InputEvent::Printable('y'), now, &mut src);
        assert!(s.mistake_pending);
        assert_eq!(s.text.line_count(), 3);
        assert_eq!(s.typed.len(), 6);
        assert!(s.check_consistency().is_ok());

        let t2 = apply(&mut s, InputEvent::Printable(' '), now, &mut src);
        assert!(!s.mistake_pending);
        assert_eq!(s.cursor, CursorState { index: 6, row: 2, column: 0 });
        assert_eq!(s.text.line_count(), 4);
        assert_eq!(
            t2.effects,
            vec![
                Effect::Put { ch: ' ', style: CellStyle::Error },
                Effect::NextRow,
                Effect::AppendLine { line: "gh ".into(), line_count: 4 },
            ]
        );
        assert_eq!(s.typed.iter().collect::<String>(), "ab cd ");
        assert!(s.check_consistency().is_ok());
        assert!(t.ending.is_none() && t2.ending.is_none());
    }

    #[test]
    fn late_keystroke_is_not_judged() {
        let config = SessionConfig {
            time_limit: Some(Duration::from_secs(1)),
            ..SessionConfig::default()
        };
        let mut s = session(&["abc "], config);
        let t0 = Instant::now();
        let mut src = FixedLines("x ");

        apply(&mut s, InputEvent::Printable('a'), t0, &mut src);
        let t = apply(
            &mut s,
            InputEvent::Printable('b'),
            t0 + Duration::from_millis(1090),
            &mut src,
        );
        assert_eq!(t.ending, Some(Ending::TimedOut));
        assert!(t.effects.is_empty());
        assert_eq!(s.correct, 1);
        assert_eq!(s.typed, vec!['a']);
        assert_eq!(s.cursor.index, 1);
        assert_eq!(s.elapsed(t0 + Duration::from_secs(30)), Duration::from_secs(1));
        assert!((s.wpm(s.elapsed(t0)) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn tick_after_limit_clamps_elapsed() {
        let config = SessionConfig {
            time_limit: Some(Duration::from_secs(1)),
            ..SessionConfig::default()
        };
        let mut s = session(&["abc "], config);
        let t0 = Instant::now();
        apply(&mut s, InputEvent::Printable('a'), t0, &mut FixedLines("x "));

        let ending = check_ending(&mut s, t0 + Duration::from_millis(1080));
        assert_eq!(ending, Some(Ending::TimedOut));
        assert_eq!(s.elapsed(t0), Duration::from_secs(1));
    }

    #[test]
    fn check_ending_waits_for_first_keystroke() {
        let config = SessionConfig {
            time_limit: Some(Duration::from_secs(1)),
            ..SessionConfig::default()
        };
        let mut s = session(&["abc "], config);
        assert_eq!(
            check_ending(&mut s, Instant::now() + Duration::from_secs(10)),
            None
        );
    }
}
