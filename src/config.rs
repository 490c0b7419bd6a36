use clap::ValueEnum;
use crossterm::cursor::SetCursorStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};

pub const DEFAULT_WORD_COUNT: usize = 25;

/// Terminal cursor shape used while typing
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CursorStyle {
    /// leave the terminal's own cursor shape alone
    #[default]
    #[serde(alias = "")]
    Default,
    Block,
    Bar,
    Underline,
}

impl CursorStyle {
    pub fn command(self) -> SetCursorStyle {
        match self {
            CursorStyle::Default => SetCursorStyle::DefaultUserShape,
            CursorStyle::Block => SetCursorStyle::BlinkingBlock,
            CursorStyle::Bar => SetCursorStyle::BlinkingBar,
            CursorStyle::Underline => SetCursorStyle::BlinkingUnderScore,
        }
    }
}

/// Settings read from `config.json`; every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub word_count: usize,
    /// Use only the first N words of the word list. `None` means all of them.
    pub word_list_size: Option<usize>,
    /// Defaults to the terminal width when unset.
    pub max_line_length: Option<usize>,
    /// Seconds; 0 disables timed mode.
    pub timed_mode: u64,
    pub no_backspace: bool,
    pub correct_only: bool,
    pub cursor_shape: CursorStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
            word_list_size: None,
            max_line_length: None,
            timed_mode: 0,
            no_backspace: false,
            correct_only: false,
            cursor_shape: CursorStyle::Default,
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub word_count: Option<usize>,
    pub word_list_size: Option<usize>,
    pub max_line_length: Option<usize>,
    pub timed_mode: Option<u64>,
    pub no_backspace: bool,
    pub correct_only: bool,
    pub cursor_shape: Option<CursorStyle>,
}

impl Config {
    /// Layer command line values over the file config.
    ///
    /// An explicit word count always selects word-count mode, even when the
    /// file (or the command line) asks for timed mode.
    pub fn merge(mut self, o: Overrides) -> Self {
        if let Some(n) = o.word_list_size {
            self.word_list_size = Some(n);
        }
        if let Some(n) = o.max_line_length {
            self.max_line_length = Some(n);
        }
        if let Some(secs) = o.timed_mode {
            self.timed_mode = secs;
        }
        if let Some(n) = o.word_count {
            self.word_count = n;
            self.timed_mode = 0;
        }
        if let Some(shape) = o.cursor_shape {
            self.cursor_shape = shape;
        }
        self.no_backspace |= o.no_backspace;
        self.correct_only |= o.correct_only;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.word_count == 0 {
            return Err(Error::Config("word count must be greater than 0".into()));
        }
        if self.word_list_size == Some(0) {
            return Err(Error::Config("word list size must be greater than 0".into()));
        }
        if self.max_line_length == Some(0) {
            return Err(Error::Config("max line length must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn is_timed(&self) -> bool {
        self.timed_mode > 0
    }
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("termtyper_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice::<Config>(&bytes).map_err(|source| Error::ConfigFile {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timed_mode": 30, "cursor_shape": "bar"}"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load().unwrap();
        assert_eq!(cfg.timed_mode, 30);
        assert_eq!(cfg.cursor_shape, CursorStyle::Bar);
        assert_eq!(cfg.word_count, DEFAULT_WORD_COUNT);
        assert!(!cfg.correct_only);
    }

    #[test]
    fn empty_cursor_shape_means_default() {
        let cfg: Config = serde_json::from_str(r#"{"cursor_shape": ""}"#).unwrap();
        assert_eq!(cfg.cursor_shape, CursorStyle::Default);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_matches!(
            FileConfigStore::with_path(&path).load(),
            Err(Error::ConfigFile { .. })
        );
    }

    #[test]
    fn explicit_word_count_beats_timed_mode() {
        let file = Config {
            timed_mode: 60,
            ..Config::default()
        };
        let merged = file.merge(Overrides {
            word_count: Some(10),
            ..Overrides::default()
        });
        assert_eq!(merged.word_count, 10);
        assert_eq!(merged.timed_mode, 0);
        assert!(!merged.is_timed());
    }

    #[test]
    fn timed_flag_overrides_file() {
        let merged = Config::default().merge(Overrides {
            timed_mode: Some(15),
            no_backspace: true,
            cursor_shape: Some(CursorStyle::Underline),
            ..Overrides::default()
        });
        assert!(merged.is_timed());
        assert!(merged.no_backspace);
        assert_eq!(merged.cursor_shape, CursorStyle::Underline);
    }

    #[test]
    fn flags_do_not_clear_file_booleans() {
        let file = Config {
            correct_only: true,
            ..Config::default()
        };
        let merged = file.merge(Overrides::default());
        assert!(merged.correct_only);
    }

    #[test]
    fn validate_rejects_zero_values() {
        let cfg = Config {
            word_count: 0,
            ..Config::default()
        };
        assert_matches!(cfg.validate(), Err(Error::Config(_)));

        let cfg = Config {
            max_line_length: Some(0),
            ..Config::default()
        };
        assert_matches!(cfg.validate(), Err(Error::Config(_)));

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn cursor_style_display() {
        assert_eq!(CursorStyle::Block.to_string(), "block");
        assert_eq!(CursorStyle::Default.to_string(), "default");
    }
}
