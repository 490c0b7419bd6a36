use std::time::{Duration, Instant};

use crossterm::queue;
use log::{debug, error, info};
use rand::Rng;

use crate::config::{Config, CursorStyle};
use crate::language::Language;
use crate::error::{Error, Result};
use crate::runtime::{CancelToken, EventSource, Runner, SessionEvent, Ticker};
use crate::session::{CharTally, SessionConfig, SessionState};
use crate::stats::{SessionResult, StatsStore};
use crate::terminal::{RawModeGuard, TerminalDriver};
use crate::typing_policy::{self, Ending, InputEvent};
use crate::ui::status::{format_line, placeholder_line, StatusReporter, StatusSnapshot};
use crate::ui::{Palette, Renderer};
use crate::word_generator::{
    GenMode, LineSource, TargetText, WordGenerator, TIMED_INITIAL_LINES,
};

/// How a session ended, from the caller's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Cancelled,
    Finished {
        result: SessionResult,
        tally: CharTally,
        timed_out: bool,
    },
}

/// Owns one session from first draw to the stats hand-off
pub struct Coordinator {
    config: SessionConfig,
    cursor_style: CursorStyle,
    palette: Palette,
    cancel: CancelToken,
}

impl Coordinator {
    pub fn new(config: SessionConfig, cursor_style: CursorStyle, cancel: CancelToken) -> Self {
        Self {
            config,
            cursor_style,
            palette: Palette::default(),
            cancel,
        }
    }

    /// Run a session over `text` and persist its result unless it was cancelled.
    ///
    /// Raw mode is held only while typing; the terminal is restored before the
    /// result is written to `store`.
    pub fn run<T, E, K, L, S>(
        &self,
        term: &mut T,
        mut runner: Runner<E, K>,
        text: TargetText,
        lines: &mut L,
        store: &mut S,
    ) -> Result<SessionOutcome>
    where
        T: TerminalDriver,
        E: EventSource,
        K: Ticker,
        L: LineSource,
        S: StatsStore,
    {
        let outcome = RawModeGuard::new(term)
            .map_err(Error::Terminal)
            .and_then(|mut guard| self.type_text(&mut *guard, &mut runner, text, lines));
        // stops the input reader on every exit path
        self.cancel.cancel();
        let outcome = outcome?;

        if let SessionOutcome::Finished { result, tally, .. } = &outcome {
            store.append(result, tally)?;
        }
        Ok(outcome)
    }

    fn type_text<T, E, K, L>(
        &self,
        out: &mut T,
        runner: &mut Runner<E, K>,
        text: TargetText,
        lines: &mut L,
    ) -> Result<SessionOutcome>
    where
        T: TerminalDriver,
        E: EventSource,
        K: Ticker,
        L: LineSource,
    {
        let renderer = Renderer::new(self.palette);
        let reporter = StatusReporter::new(self.palette);
        let mut state = SessionState::new(text, self.config.clone());

        queue!(out, self.cursor_style.command())?;
        renderer.draw_intro(out, &state.text, &placeholder_line(state.text.len()))?;
        debug!(
            "session ready: {} chars on {} lines, timed: {}, cursor: {}",
            state.text.len(),
            state.text.line_count(),
            self.config.is_timed(),
            self.cursor_style
        );

        let ending = loop {
            match runner.step() {
                SessionEvent::Tick => {
                    let now = Instant::now();
                    if let Some(ending) = typing_policy::check_ending(&mut state, now) {
                        break ending;
                    }
                    reporter.render(out, &StatusSnapshot::capture(&state, now))?;
                }
                SessionEvent::Key(key) => {
                    let input = InputEvent::classify(&key);
                    let transition = typing_policy::apply(&mut state, input, Instant::now(), lines);
                    renderer.apply(out, &transition.effects)?;
                    state.check_consistency()?;
                    if let Some(ending) = transition.ending {
                        break ending;
                    }
                }
                SessionEvent::ReadFailed(e) => {
                    error!("input failed mid-session: {e}");
                    return Err(Error::InputRead(e));
                }
                SessionEvent::Closed => {
                    error!("input stream closed mid-session");
                    return Err(Error::InputClosed);
                }
            }
        };

        if ending == Ending::Cancelled {
            info!("session cancelled");
            renderer.clear(out, state.text.line_count())?;
            return Ok(SessionOutcome::Cancelled);
        }

        let result = final_result(&state, Instant::now());
        let status = format_line(
            result.wpm,
            state.elapsed(Instant::now()),
            result.correct,
            result.total,
            result.mistakes,
            result.accuracy,
        );
        renderer.draw_final(out, &status, state.text.line_count())?;
        info!(
            "session {:?}: {:.0} wpm, {:.2}% accuracy in {:.1}s",
            ending, result.wpm, result.accuracy, result.elapsed_secs
        );

        Ok(SessionOutcome::Finished {
            result,
            tally: state.tally,
            timed_out: ending == Ending::TimedOut,
        })
    }
}

/// Everything a session needs before the first draw
#[derive(Debug)]
pub struct SessionPlan<R: Rng> {
    pub config: SessionConfig,
    pub text: TargetText,
    /// Supplies further lines in timed mode
    pub generator: WordGenerator<R>,
}

/// Turn the merged config into session options and the text to type.
///
/// `columns` is the terminal width, used when no line length is configured.
/// A `prompt` replaces the random words; in timed mode the generator keeps
/// adding lines after it.
pub fn plan_session<R: Rng>(
    config: &Config,
    prompt: Option<&str>,
    columns: u16,
    rng: R,
) -> Result<SessionPlan<R>> {
    let words = Language::english()?.top(config.word_list_size);
    let max_line_length = config.max_line_length.unwrap_or(usize::from(columns));
    let mut generator = WordGenerator::new(words, max_line_length, rng)?;

    let session = SessionConfig {
        backspace: !config.no_backspace,
        correct_only: config.correct_only,
        time_limit: config
            .is_timed()
            .then(|| Duration::from_secs(config.timed_mode)),
    };

    let text = match prompt {
        Some(prompt) => {
            let words: Vec<String> = prompt.split_whitespace().map(String::from).collect();
            if words.is_empty() {
                return Err(Error::Config("prompt has no words".into()));
            }
            let packed = generator.pack(&words);
            if session.is_timed() {
                // generated lines follow the prompt, so it needs a separator
                let mut lines = packed.lines().to_vec();
                if let Some(last) = lines.last_mut() {
                    last.push(' ');
                }
                let mut text = TargetText::new(lines);
                while text.line_count() < TIMED_INITIAL_LINES {
                    text.push_line(generator.next_line());
                }
                text
            } else {
                packed
            }
        }
        None => match session.time_limit {
            Some(limit) => generator.generate(GenMode::Timed(limit)),
            None => generator.generate(GenMode::Words(config.word_count)),
        },
    };
    debug!(
        "planned {} lines, max line length {max_line_length}",
        text.line_count()
    );

    Ok(SessionPlan {
        config: session,
        text,
        generator,
    })
}

/// Compute the session result from state alone
pub fn final_result(state: &SessionState, now: Instant) -> SessionResult {
    let elapsed = state.elapsed(now);
    SessionResult {
        wpm: state.wpm(elapsed),
        accuracy: state.accuracy(),
        correct: state.correct,
        total: state.typed.len(),
        mistakes: state.mistakes,
        elapsed_secs: elapsed.as_secs_f64(),
    }
}
