//! tg-stats: Timeguessr score tracker
//!
//! Reports, score submission and exports over the stats CSV. Paths and
//! player names come from `~/.tg-stats.conf`, overridable per run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use timeguessr_stats::config::Settings;
use timeguessr_stats::pipeline::{self, ConsolidateConfig, DashboardConfig};
use timeguessr_stats::rounds::{parse_date, Category, Roster};

#[derive(Parser)]
#[command(name = "tg-stats")]
#[command(about = "Track two players' Timeguessr scores: trophies, streaks and dashboards")]
struct Cli {
    /// Stats CSV (one row per round)
    #[arg(long, global = true, env = "TG_STATS_CSV")]
    stats_csv: Option<PathBuf>,

    /// Raw-score CSV that submissions are written to
    #[arg(long, global = true, env = "TG_RAW_SCORES_CSV")]
    raw_scores_csv: Option<PathBuf>,

    /// The two players, e.g. "Michael,Sarah"
    #[arg(long, global = true, env = "TG_PLAYERS")]
    players: Option<String>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List Hall of Fame trophies for every visible period
    HallOfFame,

    /// List Hall of Shame awards for every visible period
    HallOfShame,

    /// Show recent streaks, lead changes and milestones
    News {
        /// total, geography or time
        #[arg(short, long, default_value = "total")]
        category: String,

        /// Maximum number of items
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Head-to-head summary across all categories
    Summary,

    /// Write the static HTML dashboard
    Dashboard {
        /// Output HTML file
        #[arg(short, long, default_value = "timeguessr.html")]
        output: PathBuf,

        /// Rolling-average window in games
        #[arg(long, default_value = "7")]
        window: usize,
    },

    /// Export daily scores and both halls to an Excel workbook
    Export {
        /// Output .xlsx file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Record a share result. Reads the share text from stdin unless --text is given.
    Submit {
        /// Player name as configured
        #[arg(short, long)]
        player: String,

        /// Share text (as copied from the game)
        #[arg(short, long)]
        text: Option<String>,

        /// Date played (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Replace a previously submitted share result
    Correct {
        #[arg(short, long)]
        player: String,

        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Rebuild the stats CSV from actual answers, guesses and raw scores
    Consolidate {
        /// Actual answers CSV
        #[arg(short, long)]
        actuals: Option<PathBuf>,

        /// First player's guesses CSV
        #[arg(long)]
        first_guesses: Option<PathBuf>,

        /// Second player's guesses CSV
        #[arg(long)]
        second_guesses: Option<PathBuf>,

        /// Output CSV (default: the configured stats CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_day(value: Option<&str>, fallback: chrono::NaiveDate) -> Result<chrono::NaiveDate> {
    match value {
        Some(s) => parse_date(s).ok_or_else(|| anyhow::anyhow!("Invalid date '{}'", s)),
        None => Ok(fallback),
    }
}

fn share_text(text: Option<String>) -> Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read share text from stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::load();
    if let Some(path) = cli.stats_csv {
        settings.stats_csv = path;
    }
    if let Some(path) = cli.raw_scores_csv {
        settings.raw_scores_csv = path;
    }
    if let Some(players) = cli.players.as_deref() {
        settings.roster = Roster::parse(players).map_err(|e| anyhow::anyhow!(e))?;
    }
    let today = parse_day(cli.today.as_deref(), chrono::Local::now().date_naive())?;

    let report = match cli.command {
        Commands::HallOfFame => pipeline::hall_of_fame_report(&settings, today)?,
        Commands::HallOfShame => pipeline::hall_of_shame_report(&settings, today)?,
        Commands::News { category, limit } => {
            let category = Category::parse(&category).map_err(|e| anyhow::anyhow!(e))?;
            pipeline::news_report(&settings, category, limit)?
        }
        Commands::Summary => pipeline::summary_report(&settings)?,
        Commands::Dashboard { output, window } => pipeline::write_dashboard(
            &settings,
            &DashboardConfig {
                output,
                today,
                news_limit: pipeline::NEWS_LIMIT,
                chart_window: window.max(1),
            },
        )?,
        Commands::Export { output } => pipeline::export_workbook(&settings, &output, today)?,
        Commands::Submit { player, text, date } => {
            let date = parse_day(date.as_deref(), today)?;
            pipeline::submit_share(&settings, &player, &share_text(text)?, date)?
        }
        Commands::Correct { player, text, date } => {
            let date = parse_day(date.as_deref(), today)?;
            pipeline::correct_score(&settings, &player, &share_text(text)?, date)?
        }
        Commands::Consolidate {
            actuals,
            first_guesses,
            second_guesses,
            output,
        } => pipeline::consolidate(
            &settings,
            &ConsolidateConfig {
                actuals,
                guesses: [first_guesses, second_guesses],
                output,
            },
        )?,
    };

    print!("{}", report);
    if !report.ends_with('\n') {
        println!();
    }
    Ok(())
}
