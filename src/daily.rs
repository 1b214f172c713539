//! Daily aggregation
//!
//! Collapses the five round rows of a day into one record per date holding
//! both players' totals and per-category subtotals. Only days both players
//! played are kept, so every downstream comparison is head-to-head.

use crate::rounds::{Category, Player, RoundRecord, MAX_ROUND_SCORE};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Geography rounds scoring below this count as failed.
pub const GEOGRAPHY_FAIL_THRESHOLD: f64 = 2500.0;

/// One player's aggregates for one day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerDay {
    pub total: f64,
    pub geography: f64,
    pub time: f64,
    pub geography_failed: u32,
    pub time_failed: u32,
    pub geography_perfect: u32,
    pub time_perfect: u32,
    /// Number of round rows that went into this day
    pub rounds: u32,
    /// Rounds with a recorded geography score or pattern
    pub geography_rounds: u32,
    pub time_rounds: u32,
}

impl PlayerDay {
    pub fn score(&self, category: Category) -> f64 {
        match category {
            Category::Total => self.total,
            Category::Geography => self.geography,
            Category::Time => self.time,
        }
    }

    pub fn failed(&self, category: Category) -> u32 {
        match category {
            Category::Total => self.geography_failed + self.time_failed,
            Category::Geography => self.geography_failed,
            Category::Time => self.time_failed,
        }
    }

    /// Rounds that carry data for `category`.
    pub fn known_rounds(&self, category: Category) -> u32 {
        match category {
            Category::Total => self.rounds,
            Category::Geography => self.geography_rounds,
            Category::Time => self.time_rounds,
        }
    }

    pub fn perfect(&self, category: Category) -> u32 {
        match category {
            Category::Total => self.geography_perfect + self.time_perfect,
            Category::Geography => self.geography_perfect,
            Category::Time => self.time_perfect,
        }
    }
}

/// Both players' aggregates for one mutually played date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Timeguessr day number (0 if the sheet didn't record one)
    pub day: u32,
    pub players: [PlayerDay; 2],
}

impl DailyRecord {
    pub fn player(&self, player: Player) -> &PlayerDay {
        &self.players[player.index()]
    }

    pub fn score(&self, player: Player, category: Category) -> f64 {
        self.player(player).score(category)
    }

    /// First player's score minus second player's score.
    pub fn margin(&self, category: Category) -> f64 {
        self.score(Player::First, category) - self.score(Player::Second, category)
    }

    /// Strictly higher score wins; equal scores are a tie (`None`).
    pub fn winner(&self, category: Category) -> Option<Player> {
        let margin = self.margin(category);
        if margin > 0.0 {
            Some(Player::First)
        } else if margin < 0.0 {
            Some(Player::Second)
        } else {
            None
        }
    }
}

fn aggregate_player(rows: &[&RoundRecord], player: Player) -> PlayerDay {
    let mut day = PlayerDay::default();
    let mut round_sum = 0.0;
    let mut recorded_total: Option<f64> = None;

    for row in rows {
        let pr = row.player(player);
        day.rounds += 1;

        if recorded_total.is_none() {
            recorded_total = pr.total_score.filter(|t| *t > 0.0);
        }
        round_sum += pr.round_total();

        // Rounds without sub-score data are neither failed nor perfect
        if let Some(range) = pr.geography {
            let geography = range.midpoint();
            day.geography += geography;
            day.geography_rounds += 1;
            if geography < GEOGRAPHY_FAIL_THRESHOLD {
                day.geography_failed += 1;
            }
            if geography == MAX_ROUND_SCORE {
                day.geography_perfect += 1;
            }
        }
        if let Some(range) = pr.time {
            let time = range.midpoint();
            day.time += time;
            day.time_rounds += 1;
            if time == 0.0 {
                day.time_failed += 1;
            }
            if time == MAX_ROUND_SCORE {
                day.time_perfect += 1;
            }
        }
    }

    day.total = recorded_total.unwrap_or(round_sum);
    day
}

/// Aggregate round rows into daily records, keeping only dates where both
/// players have a non-zero total. Output is sorted by date.
pub fn aggregate_daily(rounds: &[RoundRecord]) -> Vec<DailyRecord> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&RoundRecord>> = BTreeMap::new();
    for round in rounds {
        by_date.entry(round.date).or_default().push(round);
    }

    let mut days = Vec::with_capacity(by_date.len());
    let mut solo_days = 0usize;

    for (date, rows) in by_date {
        let first = aggregate_player(&rows, Player::First);
        let second = aggregate_player(&rows, Player::Second);

        if first.total <= 0.0 || second.total <= 0.0 {
            solo_days += 1;
            continue;
        }

        let day = rows.iter().map(|r| r.day).max().unwrap_or(0);
        days.push(DailyRecord {
            date,
            day,
            players: [first, second],
        });
    }

    log::debug!(
        "Aggregated {} mutual days ({} days without both players)",
        days.len(),
        solo_days
    );
    days
}
