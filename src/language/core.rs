use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;

use crate::error::{Error, Result};

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

/// A word list shipped with the binary, most common words first.
#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Language {
    pub fn new(name: &str) -> Result<Self> {
        let file_name = format!("{name}.json");
        let file = LANG_DIR
            .get_file(&file_name)
            .ok_or_else(|| Error::Config(format!("unknown word list '{name}'")))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| Error::Config(format!("word list '{name}' is not valid UTF-8")))?;
        from_str(contents).map_err(|e| Error::Config(format!("word list '{name}': {e}")))
    }

    pub fn english() -> Result<Self> {
        Self::new("english")
    }

    /// The first `limit` words, or all of them when `limit` is `None` or too large.
    pub fn top(&self, limit: Option<usize>) -> Vec<String> {
        let n = limit.map_or(self.words.len(), |n| n.min(self.words.len()));
        self.words[..n].to_vec()
    }
}
