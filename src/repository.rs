//! Raw-score storage
//!
//! Submitted share results live in a small CSV, one row per (day, player).
//! Every write is a read-modify-write of the whole file, so writers take an
//! exclusive lock file next to the CSV and replace the file by renaming a
//! fully written temporary.

use crate::submission::ShareResult;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One player's submitted result for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Timeguessr Day")]
    pub day: u32,
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "Total Score")]
    pub total: f64,
    /// Five space-separated patterns, e.g. `"OO% OOO %XX OOO O%X"`
    #[serde(rename = "Geography")]
    pub geography: String,
    #[serde(rename = "Time")]
    pub time: String,
}

impl RawScore {
    pub fn from_share(share: &ShareResult, date: NaiveDate, player: &str) -> Self {
        RawScore {
            date,
            day: share.day,
            player: player.to_string(),
            total: share.total,
            geography: share.geography_patterns(),
            time: share.time_patterns(),
        }
    }

    /// Pattern for a 1-based round, if recorded.
    pub fn geography_pattern(&self, round: u8) -> Option<&str> {
        nth_pattern(&self.geography, round)
    }

    pub fn time_pattern(&self, round: u8) -> Option<&str> {
        nth_pattern(&self.time, round)
    }

    fn same_slot(&self, other: &RawScore) -> bool {
        self.day == other.day && self.player == other.player
    }
}

fn nth_pattern(patterns: &str, round: u8) -> Option<&str> {
    let index = usize::from(round).checked_sub(1)?;
    patterns.split_whitespace().nth(index)
}

/// Storage for raw scores.
pub trait ScoreRepository {
    /// All stored scores, in file order.
    fn read_all(&self) -> Result<Vec<RawScore>>;

    /// Add a new score. Fails if the (day, player) slot is already taken.
    fn append(&self, score: RawScore) -> Result<()>;

    /// Replace the score in the same (day, player) slot. Returns `false`
    /// (and writes nothing) if there was no such score.
    fn update(&self, score: RawScore) -> Result<bool>;
}

/// Exclusive lock held for the duration of a read-modify-write.
struct FileLock {
    path: PathBuf,
}

impl FileLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        for attempt in 1..=LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(FileLock { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt == 1 {
                        log::info!("Waiting for lock {}", path.display());
                    }
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create lock {}", path.display()))
                }
            }
        }
        bail!(
            "Timed out waiting for lock {} (remove it if no other writer is running)",
            path.display()
        )
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

/// Raw scores kept in a CSV file.
#[derive(Debug, Clone)]
pub struct CsvScoreRepository {
    path: PathBuf,
}

impl CsvScoreRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvScoreRepository { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.sibling(".lock"))
    }

    fn read_unlocked(&self) -> Result<Vec<RawScore>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
        let mut scores = Vec::new();
        for (i, row) in reader.deserialize().enumerate() {
            let score: RawScore =
                row.with_context(|| format!("{}: bad row {}", self.path.display(), i + 2))?;
            scores.push(score);
        }
        Ok(scores)
    }

    fn write_unlocked(&self, scores: &[RawScore]) -> Result<()> {
        let tmp = self.sibling(".tmp");
        {
            let mut writer = WriterBuilder::new()
                .from_path(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            for score in scores {
                writer.serialize(score)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path).with_context(|| {
            format!("Failed to replace {} with {}", self.path.display(), tmp.display())
        })?;
        log::debug!("Wrote {} raw scores to {}", scores.len(), self.path.display());
        Ok(())
    }
}

impl ScoreRepository for CsvScoreRepository {
    fn read_all(&self) -> Result<Vec<RawScore>> {
        self.read_unlocked()
    }

    fn append(&self, score: RawScore) -> Result<()> {
        let _lock = self.lock()?;
        let mut scores = self.read_unlocked()?;
        if scores.iter().any(|s| s.same_slot(&score)) {
            bail!(
                "{} already has a score for day {}; use correct to change it",
                score.player,
                score.day
            );
        }
        log::info!("Recording day {} for {}: {}", score.day, score.player, score.total);
        scores.push(score);
        self.write_unlocked(&scores)
    }

    fn update(&self, score: RawScore) -> Result<bool> {
        let _lock = self.lock()?;
        let mut scores = self.read_unlocked()?;
        let Some(existing) = scores.iter_mut().find(|s| s.same_slot(&score)) else {
            return Ok(false);
        };
        log::info!(
            "Correcting day {} for {}: {} -> {}",
            score.day,
            score.player,
            existing.total,
            score.total
        );
        *existing = score;
        self.write_unlocked(&scores)?;
        Ok(true)
    }
}
