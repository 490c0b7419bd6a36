use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::app_dirs::AppDirs;
use crate::error::Result;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn";

/// Send log records to the log file under the state directory.
///
/// The terminal is in raw mode while typing, so nothing is ever logged to
/// stderr. Without a state directory logging stays off.
pub fn init() -> Result<()> {
    match AppDirs::log_path() {
        Some(path) => init_at(&path),
        None => Ok(()),
    }
}

pub fn init_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    // a second init (tests) keeps the first logger
    let _ = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
    Ok(())
}
