//! User settings in `~/.tg-stats.conf`
//!
//! Plain `key=value` lines. Unknown keys are ignored and bad values fall
//! back to the defaults with a warning, so a hand-edited file never stops
//! the tools from starting.

use crate::awards::AwardThresholds;
use crate::news::NewsConfig;
use crate::rounds::Roster;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".tg-stats.conf";
pub const DEFAULT_STATS_CSV: &str = "timeguessr_stats.csv";
pub const DEFAULT_RAW_SCORES_CSV: &str = "timeguessr_raw_scores.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub roster: Roster,
    pub stats_csv: PathBuf,
    pub raw_scores_csv: PathBuf,
    pub thresholds: AwardThresholds,
    pub news: NewsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            roster: Roster::default(),
            stats_csv: PathBuf::from(DEFAULT_STATS_CSV),
            raw_scores_csv: PathBuf::from(DEFAULT_RAW_SCORES_CSV),
            thresholds: AwardThresholds::default(),
            news: NewsConfig::default(),
        }
    }
}

/// `"2/3"` -> `(2, 3)`; the fraction must be in (0, 1].
fn parse_fraction(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once('/')?;
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    (num > 0 && den > 0 && num <= den).then_some((num, den))
}

impl Settings {
    /// Parse config file content on top of the defaults.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            let applied = match key.trim() {
                "players" => Roster::parse(value).map(|r| settings.roster = r).is_ok(),
                "stats_csv" => {
                    settings.stats_csv = PathBuf::from(value);
                    !value.is_empty()
                }
                "raw_scores_csv" => {
                    settings.raw_scores_csv = PathBuf::from(value);
                    !value.is_empty()
                }
                "gold_margin" => match value.parse::<f64>() {
                    Ok(m) if m.is_finite() && m >= 0.0 => {
                        settings.thresholds.gold_margin = m;
                        true
                    }
                    _ => false,
                },
                "dominance" => parse_fraction(value)
                    .map(|d| settings.thresholds.dominance = d)
                    .is_some(),
                "min_streak" => match value.parse::<u32>() {
                    Ok(n) if n >= 2 => {
                        settings.news.min_streak = n;
                        true
                    }
                    _ => false,
                },
                _ => true,
            };
            if !applied {
                log::warn!("Ignoring invalid config value {}={}", key.trim(), value);
            }
        }

        let defaults = Settings::default();
        if settings.stats_csv.as_os_str().is_empty() {
            settings.stats_csv = defaults.stats_csv;
        }
        if settings.raw_scores_csv.as_os_str().is_empty() {
            settings.raw_scores_csv = defaults.raw_scores_csv;
        }
        settings
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "players={}\nstats_csv={}\nraw_scores_csv={}\ngold_margin={}\ndominance={}/{}\nmin_streak={}\n",
            self.roster.to_config_string(),
            self.stats_csv.display(),
            self.raw_scores_csv.display(),
            self.thresholds.gold_margin,
            self.thresholds.dominance.0,
            self.thresholds.dominance.1,
            self.news.min_streak
        )
    }

    /// Load from `path`; a missing or unreadable file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Settings::parse(&content),
            Err(_) => Settings::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_config_string())
            .with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Load from `~/.tg-stats.conf`.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Settings::load_from(&path),
            None => Settings::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path().ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
        self.save_to(&path)
    }
}

pub fn config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides_and_defaults() {
        let settings = Settings::parse(
            "# comment\nplayers = Ann, Bob\nstats_csv=/tmp/s.csv\ngold_margin=0.2\ndominance=3/4\nmin_streak=4\nunknown=1\n",
        );
        assert_eq!(settings.roster, Roster::new("Ann", "Bob"));
        assert_eq!(settings.stats_csv, PathBuf::from("/tmp/s.csv"));
        assert_eq!(settings.raw_scores_csv, PathBuf::from(DEFAULT_RAW_SCORES_CSV));
        assert_eq!(settings.thresholds.gold_margin, 0.2);
        assert_eq!(settings.thresholds.dominance, (3, 4));
        assert_eq!(settings.news.min_streak, 4);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::parse("players=Solo\ndominance=5/4\nmin_streak=1\ngold_margin=-1\nstats_csv=\n");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tg.conf");
        assert_eq!(Settings::load_from(&path), Settings::default());

        let mut settings = Settings::default();
        settings.roster = Roster::new("Ann", "Bob");
        settings.thresholds.dominance = (3, 5);
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
