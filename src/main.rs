use std::io::stdin;
use std::process;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::tty::IsTty;
use log::{error, info};

use termtyper::{
    config::{Config, CursorStyle, FileConfigStore, Overrides},
    coordinator::{plan_session, Coordinator, SessionOutcome},
    logging,
    runtime::{CancelToken, CrosstermEventSource, FixedTicker, Runner},
    stats::{SqliteStatsStore, StatsStore},
    terminal::{CrosstermTerminal, TerminalDriver},
    ui::stats_report,
    Error, Result,
};

/// inline typing trainer for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type random common words (or your own prompt) right in the terminal, with a live wpm/accuracy line and a per-character history."
)]
pub struct Cli {
    /// number of words to type; overrides timed mode
    #[clap(short = 'w', long)]
    words: Option<usize>,

    /// only draw from the N most common words
    #[clap(short = 'n', long)]
    word_list_size: Option<usize>,

    /// maximum line length (defaults to the terminal width)
    #[clap(short = 'l', long)]
    line_length: Option<usize>,

    /// type for this many seconds instead of a fixed word count
    #[clap(short = 't', long)]
    timed: Option<u64>,

    /// disable backspace
    #[clap(short = 'b', long)]
    no_backspace: bool,

    /// a mistake must be corrected before the cursor moves on
    #[clap(short = 'o', long)]
    correct_only: bool,

    /// cursor shape while typing
    #[clap(short = 'c', long, value_enum)]
    cursor: Option<CursorStyle>,

    /// print the stats history and exit
    #[clap(short = 's', long)]
    stats: bool,

    /// custom text to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,
}

impl Cli {
    fn to_overrides(&self) -> Overrides {
        Overrides {
            word_count: self.words,
            word_list_size: self.word_list_size,
            max_line_length: self.line_length,
            timed_mode: self.timed,
            no_backspace: self.no_backspace,
            correct_only: self.correct_only,
            cursor_shape: self.cursor,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("termtyper: logging disabled: {e}");
    }

    if let Err(e) = run(&cli) {
        error!("{e}");
        eprintln!("termtyper: {e}");
        process::exit(1);
    }
}

/// What this invocation does
#[derive(Debug)]
enum Mode {
    Stats,
    Session(Config),
}

/// Stats mode does not read the config file.
fn select_mode(cli: &Cli, files: &FileConfigStore) -> Result<Mode> {
    if cli.stats {
        return Ok(Mode::Stats);
    }
    let config = files.load()?.merge(cli.to_overrides());
    config.validate()?;
    Ok(Mode::Session(config))
}

fn run(cli: &Cli) -> Result<()> {
    let config = match select_mode(cli, &FileConfigStore::new())? {
        Mode::Stats => {
            let store = SqliteStatsStore::open_default()?;
            let (results, chars) = store.query_all()?;
            println!("{}", stats_report::report(&results, &chars));
            return Ok(());
        }
        Mode::Session(config) => config,
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut term = CrosstermTerminal::new();
    let columns = term.width().map_err(Error::Terminal)?;
    let plan = plan_session(&config, cli.prompt.as_deref(), columns, rand::thread_rng())?;
    // open before typing so a broken database fails fast
    let mut store = SqliteStatsStore::open_default()?;

    let cancel = CancelToken::new();
    let runner = Runner::new(CrosstermEventSource::new(cancel.clone()), FixedTicker::default());
    let coordinator = Coordinator::new(plan.config, config.cursor_shape, cancel);
    let mut generator = plan.generator;

    match coordinator.run(&mut term, runner, plan.text, &mut generator, &mut store)? {
        SessionOutcome::Cancelled => info!("nothing saved"),
        SessionOutcome::Finished { result, .. } => info!("saved result: {result:?}"),
    }
    Ok(())
}
