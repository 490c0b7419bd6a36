use chrono::Local;
use log::{debug, info};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::session::CharTally;
use crate::util::{mean, std_dev};

/// Final numbers of one finished session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionResult {
    pub wpm: f64,
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
    pub mistakes: usize,
    pub elapsed_secs: f64,
}

/// Historical accuracy of one character across all sessions
#[derive(Debug, Clone, PartialEq)]
pub struct CharStat {
    pub character: char,
    pub correct: u64,
    pub incorrect: u64,
    pub accuracy: f64,
}

/// Where finished sessions are kept
pub trait StatsStore {
    /// Persist a result together with its character tally, as one unit.
    fn append(&mut self, result: &SessionResult, tally: &CharTally) -> Result<()>;

    /// All results in insertion order, and char stats by descending accuracy.
    fn query_all(&self) -> Result<(Vec<SessionResult>, Vec<CharStat>)>;
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteStatsStore {
    conn: Connection,
}

impl SqliteStatsStore {
    /// Open the default database under the state directory
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("termtyper_stats.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("opening stats database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wpm REAL NOT NULL,
                accuracy REAL NOT NULL,
                correct INTEGER NOT NULL,
                total INTEGER NOT NULL,
                mistakes INTEGER NOT NULL,
                time REAL NOT NULL,
                created TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chars (
                char TEXT PRIMARY KEY,
                correct INTEGER NOT NULL DEFAULT 0,
                incorrect INTEGER NOT NULL DEFAULT 0,
                accuracy REAL NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(Self { conn })
    }
}

impl StatsStore for SqliteStatsStore {
    fn append(&mut self, result: &SessionResult, tally: &CharTally) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO stats (wpm, accuracy, correct, total, mistakes, time, created)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                result.wpm,
                result.accuracy,
                result.correct as i64,
                result.total as i64,
                result.mistakes as i64,
                result.elapsed_secs,
                Local::now().to_rfc3339(),
            ],
        )?;

        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO chars (char, correct, incorrect) VALUES (?1, ?2, ?3)
                ON CONFLICT(char) DO UPDATE SET
                    correct = correct + excluded.correct,
                    incorrect = incorrect + excluded.incorrect
                "#,
            )?;
            for (character, t) in tally {
                upsert.execute(params![
                    character.to_string(),
                    t.correct as i64,
                    t.incorrect as i64
                ])?;
            }
        }

        tx.execute(
            "UPDATE chars SET accuracy = correct * 100.0 / (correct + incorrect) WHERE correct + incorrect > 0",
            [],
        )?;

        tx.commit()?;
        info!(
            "saved session: {:.0} wpm, {:.2}% accuracy, {} chars tallied",
            result.wpm,
            result.accuracy,
            tally.len()
        );
        Ok(())
    }

    fn query_all(&self) -> Result<(Vec<SessionResult>, Vec<CharStat>)> {
        let mut stmt = self
            .conn
            .prepare("SELECT wpm, accuracy, correct, total, mistakes, time FROM stats ORDER BY id")?;
        let results = stmt
            .query_map([], |row| {
                Ok(SessionResult {
                    wpm: row.get(0)?,
                    accuracy: row.get(1)?,
                    correct: row.get::<_, i64>(2)? as usize,
                    total: row.get::<_, i64>(3)? as usize,
                    mistakes: row.get::<_, i64>(4)? as usize,
                    elapsed_secs: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT char, correct, incorrect, accuracy FROM chars ORDER BY accuracy DESC, char ASC",
        )?;
        let chars = stmt
            .query_map([], |row| {
                let char_str: String = row.get(0)?;
                Ok(CharStat {
                    character: char_str.chars().next().unwrap_or('\0'),
                    correct: row.get::<_, i64>(1)? as u64,
                    incorrect: row.get::<_, i64>(2)? as u64,
                    accuracy: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((results, chars))
    }
}

/// Store that keeps everything in memory, for headless runs and tests
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    pub results: Vec<SessionResult>,
    pub tallies: Vec<CharTally>,
}

impl StatsStore for MemoryStatsStore {
    fn append(&mut self, result: &SessionResult, tally: &CharTally) -> Result<()> {
        self.results.push(*result);
        self.tallies.push(tally.clone());
        Ok(())
    }

    fn query_all(&self) -> Result<(Vec<SessionResult>, Vec<CharStat>)> {
        let mut merged = CharTally::new();
        for tally in &self.tallies {
            for (c, t) in tally {
                let entry = merged.entry(*c).or_default();
                entry.correct += t.correct;
                entry.incorrect += t.incorrect;
            }
        }
        let mut chars: Vec<CharStat> = merged
            .into_iter()
            .map(|(character, t)| CharStat {
                character,
                correct: t.correct,
                incorrect: t.incorrect,
                accuracy: t.accuracy(),
            })
            .collect();
        chars.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy).then(a.character.cmp(&b.character)));
        Ok((self.results.clone(), chars))
    }
}

/// Averages over every recorded session
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub sessions: usize,
    pub avg_wpm: f64,
    pub best_wpm: f64,
    pub wpm_std_dev: f64,
    pub avg_accuracy: f64,
    pub avg_mistakes: f64,
    pub time_spent: Duration,
}

impl StatsSummary {
    /// `None` when nothing has been recorded yet
    pub fn from_results(results: &[SessionResult]) -> Option<Self> {
        let wpms: Vec<f64> = results.iter().map(|r| r.wpm).collect();
        let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();
        let mistakes: Vec<f64> = results.iter().map(|r| r.mistakes as f64).collect();

        Some(Self {
            sessions: results.len(),
            avg_wpm: mean(&wpms)?,
            best_wpm: wpms.iter().copied().fold(0.0, f64::max),
            wpm_std_dev: std_dev(&wpms)?,
            avg_accuracy: mean(&accuracies)?,
            avg_mistakes: mean(&mistakes)?,
            time_spent: Duration::from_secs_f64(
                results.iter().map(|r| r.elapsed_secs.max(0.0)).sum(),
            ),
        })
    }
}
