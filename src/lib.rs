// Library surface for the binary and for headless integration tests.
pub mod app_dirs;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod language;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod terminal;
pub mod typing_policy;
pub mod ui;
pub mod util;
pub mod word_generator;

pub use error::{Error, Result};
