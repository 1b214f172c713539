//! Pipeline functions for programmatic use by both CLI and GUI.
//!
//! Each operation loads what it needs from the paths in [`Settings`] and
//! returns a printable summary or report string.

use crate::awards::{hall_of_fame, hall_of_shame, AwardLists, Hall};
use crate::config::Settings;
use crate::consolidate::consolidate_files;
use crate::daily::{aggregate_daily, DailyRecord};
use crate::news::{detect_news, head_to_head, latest_news, HeadToHead};
use crate::periods::bucket_all;
use crate::render::{
    awards_text, dashboard_html, format_date, format_points, news_text, rolling_chart_spec,
    summary_text, DashboardView,
};
use crate::repository::{CsvScoreRepository, RawScore, ScoreRepository};
use crate::rounds::{load_rounds, Category, Player, Roster};
use crate::submission::parse_share_text;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Default number of news items shown.
pub const NEWS_LIMIT: usize = 20;

/// Default rolling-average window for charts.
pub const CHART_WINDOW: usize = 7;

// ============================================================================
// Dataset loading
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    path: PathBuf,
    modified: Option<SystemTime>,
    /// Catches rewrites within one mtime tick
    len: u64,
    roster: Roster,
}

lazy_static::lazy_static! {
    static ref DATASET_CACHE: Mutex<Option<(CacheKey, Arc<Vec<DailyRecord>>)>> = Mutex::new(None);
}

/// Load the stats CSV and aggregate it into mutual days.
///
/// A missing file yields an empty dataset. Results are cached by path,
/// modification time, size and roster, so repeated GUI refreshes don't
/// re-read the CSV.
pub fn load_dataset(path: &Path, roster: &Roster) -> Result<Arc<Vec<DailyRecord>>> {
    if !path.exists() {
        log::warn!("Stats CSV {} not found; no data to show", path.display());
        return Ok(Arc::new(Vec::new()));
    }

    let metadata = std::fs::metadata(path).ok();
    let key = CacheKey {
        path: path.to_path_buf(),
        modified: metadata.as_ref().and_then(|m| m.modified().ok()),
        len: metadata.map(|m| m.len()).unwrap_or(0),
        roster: roster.clone(),
    };

    if let Some((cached_key, days)) = DATASET_CACHE
        .lock()
        .map_err(|_| anyhow::anyhow!("Dataset cache lock poisoned"))?
        .as_ref()
    {
        if *cached_key == key && key.modified.is_some() {
            log::debug!("Dataset cache hit for {}", path.display());
            return Ok(Arc::clone(days));
        }
    }

    let rounds = load_rounds(path, roster)?;
    let days = Arc::new(aggregate_daily(&rounds));
    log::info!(
        "Loaded {} rounds, {} mutual days from {}",
        rounds.len(),
        days.len(),
        path.display()
    );

    *DATASET_CACHE
        .lock()
        .map_err(|_| anyhow::anyhow!("Dataset cache lock poisoned"))? = Some((key, Arc::clone(&days)));
    Ok(days)
}

/// Both halls for the given days.
pub fn compute_awards(
    days: &[DailyRecord],
    settings: &Settings,
    today: NaiveDate,
) -> (AwardLists, AwardLists) {
    let buckets = bucket_all(days, today);
    (
        hall_of_fame(&buckets, &settings.roster, &settings.thresholds),
        hall_of_shame(&buckets, &settings.roster, &settings.thresholds),
    )
}

// ============================================================================
// Reports
// ============================================================================

pub fn hall_report(settings: &Settings, hall: Hall, today: NaiveDate) -> Result<String> {
    let days = load_dataset(&settings.stats_csv, &settings.roster)?;
    let buckets = bucket_all(&days, today);
    let awards = match hall {
        Hall::Fame => hall_of_fame(&buckets, &settings.roster, &settings.thresholds),
        Hall::Shame => hall_of_shame(&buckets, &settings.roster, &settings.thresholds),
    };
    awards_text(hall, &settings.roster, &awards)
}

pub fn hall_of_fame_report(settings: &Settings, today: NaiveDate) -> Result<String> {
    hall_report(settings, Hall::Fame, today)
}

pub fn hall_of_shame_report(settings: &Settings, today: NaiveDate) -> Result<String> {
    hall_report(settings, Hall::Shame, today)
}

pub fn news_report(settings: &Settings, category: Category, limit: usize) -> Result<String> {
    let days = load_dataset(&settings.stats_csv, &settings.roster)?;
    let events = detect_news(&days, category, &settings.news);
    news_text(&latest_news(&events, limit), &settings.roster, category)
}

pub fn summary_report(settings: &Settings) -> Result<String> {
    let days = load_dataset(&settings.stats_csv, &settings.roster)?;
    let summaries: Vec<HeadToHead> = Category::ALL
        .iter()
        .map(|c| head_to_head(&days, *c))
        .collect();
    summary_text(&summaries, &settings.roster)
}

// ============================================================================
// Dashboard
// ============================================================================

/// Configuration for the dashboard command.
pub struct DashboardConfig {
    /// Output HTML path
    pub output: PathBuf,
    pub today: NaiveDate,
    /// Maximum news items
    pub news_limit: usize,
    /// Rolling-average window (games)
    pub chart_window: usize,
}

/// Write the static HTML dashboard. Returns a summary string.
pub fn write_dashboard(settings: &Settings, config: &DashboardConfig) -> Result<String> {
    let days = load_dataset(&settings.stats_csv, &settings.roster)?;
    let (fame, shame) = compute_awards(&days, settings, config.today);
    let events = detect_news(&days, Category::Total, &settings.news);
    let news = latest_news(&events, config.news_limit);
    let summary = head_to_head(&days, Category::Total);
    let charts = Category::ALL
        .iter()
        .map(|c| rolling_chart_spec(&days, &settings.roster, *c, config.chart_window))
        .collect();

    let html = dashboard_html(&DashboardView {
        roster: &settings.roster,
        generated: format_date(config.today),
        summary: &summary,
        news: &news,
        fame: &fame,
        shame: &shame,
        charts,
    })?;
    std::fs::write(&config.output, html)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    Ok(format!(
        "Dashboard written to {} ({} days, {} fame / {} shame awards, {} news items)",
        config.output.display(),
        days.len(),
        fame.len(),
        shame.len(),
        news.len()
    ))
}

// ============================================================================
// Export Workbook
// ============================================================================

/// Export daily scores and both halls to an Excel workbook.
///
/// Produces Daily, Hall of Fame and Hall of Shame sheets.
pub fn export_workbook(settings: &Settings, output: &Path, today: NaiveDate) -> Result<String> {
    use rust_xlsxwriter::{Format, Workbook};

    let days = load_dataset(&settings.stats_csv, &settings.roster)?;
    let (fame, shame) = compute_awards(&days, settings, today);
    let roster = &settings.roster;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let gold_fmt = Format::new().set_background_color("#FFF2CC");

    // -- Daily sheet --
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Daily")?;

        let mut headers = vec!["Date".to_string(), "Timeguessr Day".to_string()];
        for player in Player::BOTH {
            for category in Category::ALL {
                headers.push(format!("{} {}", roster.name(player), category.label()));
            }
        }
        headers.push("Winner".to_string());
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &bold)?;
        }

        for (i, day) in days.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, day.date.format("%Y-%m-%d").to_string())?;
            sheet.write_number(row, 1, day.day as f64)?;
            let mut col: u16 = 2;
            for player in Player::BOTH {
                for category in Category::ALL {
                    sheet.write_number(row, col, day.score(player, category))?;
                    col += 1;
                }
            }
            let winner = day
                .winner(Category::Total)
                .map(|p| roster.name(p))
                .unwrap_or("Tie");
            sheet.write_string(row, col, winner)?;
        }
        sheet.set_column_width(0, 12)?;
    }

    // -- Hall sheets --
    for (hall, awards) in [(Hall::Fame, &fame), (Hall::Shame, &shame)] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(hall.title())?;

        for (col, header) in ["Player", "Period", "Award", "Gold", "Tie", "Ongoing", "Details"]
            .iter()
            .enumerate()
        {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        let mut row: u32 = 1;
        for player in Player::BOTH {
            for award in awards.for_player(player) {
                let yes_no = |b: bool| if b { "yes" } else { "" };
                sheet.write_string(row, 0, roster.name(player))?;
                sheet.write_string(row, 1, &award.title)?;
                if award.is_gold {
                    sheet.write_string_with_format(row, 2, &award.name, &gold_fmt)?;
                } else {
                    sheet.write_string(row, 2, &award.name)?;
                }
                sheet.write_string(row, 3, yes_no(award.is_gold))?;
                sheet.write_string(row, 4, yes_no(award.is_tie))?;
                sheet.write_string(row, 5, yes_no(award.is_ongoing))?;
                sheet.write_string(row, 6, &award.description)?;
                row += 1;
            }
        }
        sheet.set_column_width(1, 16)?;
        sheet.set_column_width(2, 26)?;
        sheet.set_column_width(6, 60)?;
    }

    workbook
        .save(output)
        .with_context(|| format!("Failed to save workbook {}", output.display()))?;

    Ok(format!(
        "Exported {} days, {} fame and {} shame awards to {}",
        days.len(),
        fame.len(),
        shame.len(),
        output.display()
    ))
}

// ============================================================================
// Score submission
// ============================================================================

fn raw_score_from_text(
    settings: &Settings,
    player: &str,
    share_text: &str,
    date: NaiveDate,
) -> Result<RawScore> {
    let player = settings
        .roster
        .find(player)
        .ok_or_else(|| anyhow::anyhow!("Unknown player '{}'", player))?;
    let share = parse_share_text(share_text).map_err(|e| anyhow::anyhow!(e))?;
    Ok(RawScore::from_share(&share, date, settings.roster.name(player)))
}

/// Record a new share result for `player`.
pub fn submit_share(
    settings: &Settings,
    player: &str,
    share_text: &str,
    date: NaiveDate,
) -> Result<String> {
    let score = raw_score_from_text(settings, player, share_text, date)?;
    let summary = format!(
        "Recorded day {} for {}: {} points",
        score.day,
        score.player,
        format_points(score.total)
    );
    CsvScoreRepository::new(&settings.raw_scores_csv).append(score)?;
    Ok(summary)
}

/// Replace an existing share result for `player`.
pub fn correct_score(
    settings: &Settings,
    player: &str,
    share_text: &str,
    date: NaiveDate,
) -> Result<String> {
    let score = raw_score_from_text(settings, player, share_text, date)?;
    let summary = format!(
        "Corrected day {} for {}: {} points",
        score.day,
        score.player,
        format_points(score.total)
    );
    let (day, name) = (score.day, score.player.clone());
    if !CsvScoreRepository::new(&settings.raw_scores_csv).update(score)? {
        bail!("No score recorded for {} on day {}; submit it first", name, day);
    }
    Ok(summary)
}

// ============================================================================
// Consolidation
// ============================================================================

/// Configuration for rebuilding the stats CSV.
pub struct ConsolidateConfig {
    /// Actual answers per (day, round)
    pub actuals: Option<PathBuf>,
    /// Per-player guess CSVs, in roster order
    pub guesses: [Option<PathBuf>; 2],
    /// Output path; defaults to the configured stats CSV
    pub output: Option<PathBuf>,
}

pub fn consolidate(settings: &Settings, config: &ConsolidateConfig) -> Result<String> {
    let raw_scores = CsvScoreRepository::new(&settings.raw_scores_csv).read_all()?;
    let output = config.output.as_deref().unwrap_or(&settings.stats_csv);
    let rows = consolidate_files(
        config.actuals.as_deref(),
        [config.guesses[0].as_deref(), config.guesses[1].as_deref()],
        &raw_scores,
        &settings.roster,
        output,
    )?;
    Ok(format!(
        "Wrote {} rounds from {} raw scores to {}",
        rows,
        raw_scores.len(),
        output.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STATS: &str = "\
Date,Timeguessr Day,Timeguessr Round,Michael Total Score,Sarah Total Score
2024-06-01,300,1,40000,40000
2024-06-02,301,1,45000,42000
";

    const SHARE: &str = "TimeGuessr #302 41,133/50,000
OOO OO%
OOO OOO
%XX O%X
OO% XXX
OOO OOO";

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            stats_csv: dir.path().join("stats.csv"),
            raw_scores_csv: dir.path().join("raw.csv"),
            ..Settings::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn test_missing_stats_is_empty() {
        let dir = TempDir::new().unwrap();
        let days = load_dataset(&dir.path().join("nope.csv"), &Roster::default()).unwrap();
        assert!(days.is_empty());
        let report = hall_of_fame_report(&settings(&dir), today()).unwrap();
        assert!(report.contains("Michael (0 awards)"));
    }

    #[test]
    fn test_reports_from_csv() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        std::fs::write(&settings.stats_csv, STATS).unwrap();

        let fame = hall_of_fame_report(&settings, today()).unwrap();
        assert!(fame.contains("Total Champion"));
        assert!(fame.contains("June 2024"));

        let summary = summary_report(&settings).unwrap();
        assert!(summary.contains("Days played together: 2"));

        let news = news_report(&settings, Category::Total, NEWS_LIMIT).unwrap();
        assert!(news.contains("Total News"));
    }

    #[test]
    fn test_rewritten_stats_are_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        let roster = Roster::default();

        std::fs::write(&path, STATS).unwrap();
        let before = load_dataset(&path, &roster).unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(before[1].winner(Category::Total), Some(Player::First));

        // Same file rewritten with Sarah ahead and a third day
        let rewritten = "\
Date,Timeguessr Day,Timeguessr Round,Michael Total Score,Sarah Total Score
2024-06-01,300,1,40000,40000
2024-06-02,301,1,41000,47000
2024-06-03,302,1,30000,35000
";
        std::fs::write(&path, rewritten).unwrap();
        let after = load_dataset(&path, &roster).unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(after[1].winner(Category::Total), Some(Player::Second));
        assert_eq!(after[1].score(Player::Second, Category::Total), 47000.0);
    }

    #[test]
    fn test_roster_change_is_not_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.csv");
        std::fs::write(&path, STATS).unwrap();

        let days = load_dataset(&path, &Roster::default()).unwrap();
        assert_eq!(days.len(), 2);
        // Nobody named Ann or Bob has totals in this sheet
        let days = load_dataset(&path, &Roster::new("Ann", "Bob")).unwrap();
        assert!(days.is_empty());
        let days = load_dataset(&path, &Roster::default()).unwrap();
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn test_dashboard_and_workbook_written() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        std::fs::write(&settings.stats_csv, STATS).unwrap();

        let html_path = dir.path().join("dash.html");
        let msg = write_dashboard(
            &settings,
            &DashboardConfig {
                output: html_path.clone(),
                today: today(),
                news_limit: NEWS_LIMIT,
                chart_window: 1,
            },
        )
        .unwrap();
        assert!(msg.contains("2 days"));
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Hall of Fame"));
        assert!(html.contains("vegaEmbed('#chart-0'"));

        let xlsx = dir.path().join("stats.xlsx");
        export_workbook(&settings, &xlsx, today()).unwrap();
        assert!(xlsx.exists());
    }

    #[test]
    fn test_submit_then_correct() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let msg = submit_share(&settings, "michael", SHARE, date).unwrap();
        assert_eq!(msg, "Recorded day 302 for Michael: 41,133 points");
        assert!(submit_share(&settings, "Michael", SHARE, date).is_err());
        assert!(submit_share(&settings, "Nobody", SHARE, date).is_err());

        let fixed = SHARE.replace("41,133", "41,200");
        correct_score(&settings, "Michael", &fixed, date).unwrap();
        let err = correct_score(&settings, "Sarah", &fixed, date).unwrap_err();
        assert!(err.to_string().contains("submit it first"));

        let raw = CsvScoreRepository::new(&settings.raw_scores_csv).read_all().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].total, 41200.0);
    }

    #[test]
    fn test_consolidate_from_raw_scores() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        submit_share(&settings, "Michael", SHARE, date).unwrap();
        submit_share(&settings, "Sarah", &SHARE.replace("41,133", "38,000"), date).unwrap();

        let msg = consolidate(
            &settings,
            &ConsolidateConfig {
                actuals: None,
                guesses: [None, None],
                output: None,
            },
        )
        .unwrap();
        assert!(msg.contains("Wrote 5 rounds from 2 raw scores"));

        let days = load_dataset(&settings.stats_csv, &settings.roster).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].winner(Category::Total), Some(Player::First));
    }
}
