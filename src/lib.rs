//! Timeguessr Stats
//!
//! Score tracking for two players of the daily Timeguessr game.
//!
//! This library provides:
//! - `rounds`: Stats CSV schema and loader (one row per round)
//! - `daily`: Per-day aggregation of both players' scores
//! - `periods`: Year / quarter / month bucketing with running extremes
//! - `awards`: Hall of Fame and Hall of Shame rule tables
//! - `news`: Streaks, lead changes, personal bests and milestones
//! - `render`: Text reports, HTML dashboard and chart specifications
//! - `submission`, `repository`, `consolidate`: Getting scores into the CSV
//! - `pipeline`: Operations shared by the binaries
//!
//! Binaries:
//! - `tg-stats`: Command-line reports, submission and export
//! - `tg-ui`: Desktop GUI over the same pipeline

pub mod awards;
pub mod config;
pub mod consolidate;
pub mod daily;
pub mod news;
pub mod periods;
pub mod pipeline;
pub mod render;
pub mod repository;
pub mod rounds;
pub mod submission;

pub use awards::{AwardLists, AwardRecord, AwardThresholds, Hall};
pub use config::Settings;
pub use daily::DailyRecord;
pub use rounds::{Category, Player, Roster};
