use std::io;

use thiserror::Error;

/// Everything that can abort a typing session or the stats report.
///
/// User cancellation is not an error; it surfaces as
/// [`crate::coordinator::SessionOutcome::Cancelled`].
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal could not be measured, put into raw mode or restored.
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stats storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to read keyboard input: {0}")]
    InputRead(#[source] io::Error),

    #[error("keyboard input stream closed")]
    InputClosed,

    /// Session state no longer satisfies its own invariants.
    #[error("internal consistency fault: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
