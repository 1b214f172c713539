//! Period bucketing
//!
//! Re-groups daily records by calendar year, quarter and month. The three
//! partitionings are independent; a day belongs to exactly one bucket of
//! each kind. Alongside the sums each bucket keeps the day-level extremes
//! (best/worst day, biggest win, largest margin) needed by the award rules.

use crate::daily::{DailyRecord, PlayerDay};
use crate::rounds::{Category, Player};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKind {
    Year,
    Quarter,
    Month,
}

impl PeriodKind {
    pub const ALL: [PeriodKind; 3] = [PeriodKind::Year, PeriodKind::Quarter, PeriodKind::Month];

    pub fn label(self) -> &'static str {
        match self {
            PeriodKind::Year => "Year",
            PeriodKind::Quarter => "Quarter",
            PeriodKind::Month => "Month",
        }
    }
}

fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// A calendar period. `index` is the month (1-12), the quarter (1-4), or 0
/// for a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub kind: PeriodKind,
    pub year: i32,
    pub index: u32,
}

impl Period {
    pub fn containing(kind: PeriodKind, date: NaiveDate) -> Self {
        let index = match kind {
            PeriodKind::Year => 0,
            PeriodKind::Quarter => quarter_of(date),
            PeriodKind::Month => date.month(),
        };
        Period {
            kind,
            year: date.year(),
            index,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Period::containing(self.kind, date) == *self
    }

    /// Display label: `"2024"`, `"Q3 2024"`, `"August 2024"`.
    pub fn label(&self) -> String {
        match self.kind {
            PeriodKind::Year => self.year.to_string(),
            PeriodKind::Quarter => format!("Q{} {}", self.index, self.year),
            PeriodKind::Month => NaiveDate::from_ymd_opt(self.year, self.index, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| format!("{}-{:02}", self.year, self.index)),
        }
    }
}

/// A value reached on a specific day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayValue {
    pub value: f64,
    pub date: NaiveDate,
}

/// The day with the largest absolute score gap between the players.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginDay {
    pub date: NaiveDate,
    pub margin: f64,
    pub winner: Option<Player>,
}

/// One player's statistics for one category within a bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub sum: f64,
    pub days_won: u32,
    pub best_day: Option<DayValue>,
    pub worst_day: Option<DayValue>,
    /// Largest margin on a day this player won
    pub biggest_win: Option<DayValue>,
    pub perfect: u32,
    pub failed: u32,
    /// Rounds with recorded data for the category
    pub known_rounds: u32,
}

impl CategoryStats {
    fn add_day(
        &mut self,
        date: NaiveDate,
        score: f64,
        margin: f64,
        day: &PlayerDay,
        category: Category,
    ) {
        self.sum += score;
        self.perfect += day.perfect(category);
        self.failed += day.failed(category);
        self.known_rounds += day.known_rounds(category);

        // Strict comparisons: on equal values the earliest day is kept
        if self.best_day.is_none_or(|b| score > b.value) {
            self.best_day = Some(DayValue { value: score, date });
        }
        if self.worst_day.is_none_or(|w| score < w.value) {
            self.worst_day = Some(DayValue { value: score, date });
        }
        if margin > 0.0 {
            self.days_won += 1;
            if self.biggest_win.is_none_or(|b| margin > b.value) {
                self.biggest_win = Some(DayValue {
                    value: margin,
                    date,
                });
            }
        }
    }
}

/// Aggregates for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBucket {
    pub period: Period,
    /// Mutually played days in the period
    pub days: u32,
    /// Tied days per category, indexed by `Category::index`
    pub tie_days: [u32; 3],
    /// `players[player][category]`
    pub players: [[CategoryStats; 3]; 2],
    pub largest_margin: [Option<MarginDay>; 3],
    /// Distinct quarters (year buckets), months (quarter buckets) or days
    /// (month buckets) covered by the data
    pub sub_periods: usize,
    /// The bucket contains today
    pub is_ongoing: bool,
}

impl PeriodBucket {
    pub fn stats(&self, player: Player, category: Category) -> &CategoryStats {
        &self.players[player.index()][category.index()]
    }

    pub fn tie_days(&self, category: Category) -> u32 {
        self.tie_days[category.index()]
    }

    pub fn largest_margin(&self, category: Category) -> Option<MarginDay> {
        self.largest_margin[category.index()]
    }

    /// Either player has rounds with data for `category`.
    pub fn has_data(&self, category: Category) -> bool {
        Player::BOTH
            .iter()
            .any(|p| self.stats(*p, category).known_rounds > 0)
    }

    /// A year needs data from two quarters and a quarter from two months
    /// before it is shown; months are always shown.
    pub fn is_visible(&self) -> bool {
        match self.period.kind {
            PeriodKind::Year | PeriodKind::Quarter => self.sub_periods >= 2,
            PeriodKind::Month => true,
        }
    }
}

fn build_bucket(period: Period, days: &[&DailyRecord], today: NaiveDate) -> Option<PeriodBucket> {
    if days.is_empty() {
        return None;
    }

    let mut players: [[CategoryStats; 3]; 2] = Default::default();
    let mut tie_days = [0u32; 3];
    let mut largest_margin: [Option<MarginDay>; 3] = [None; 3];

    for day in days {
        for category in Category::ALL {
            let c = category.index();
            let margin = day.margin(category);
            if margin == 0.0 {
                tie_days[c] += 1;
            }
            if largest_margin[c].is_none_or(|m| margin.abs() > m.margin) {
                largest_margin[c] = Some(MarginDay {
                    date: day.date,
                    margin: margin.abs(),
                    winner: day.winner(category),
                });
            }

            for player in Player::BOTH {
                let pd = day.player(player);
                let signed = if player == Player::First { margin } else { -margin };
                players[player.index()][c].add_day(
                    day.date,
                    pd.score(category),
                    signed,
                    pd,
                    category,
                );
            }
        }
    }

    let sub_periods = match period.kind {
        PeriodKind::Year => days
            .iter()
            .map(|d| quarter_of(d.date))
            .collect::<BTreeSet<_>>()
            .len(),
        PeriodKind::Quarter => days
            .iter()
            .map(|d| d.date.month())
            .collect::<BTreeSet<_>>()
            .len(),
        PeriodKind::Month => days.iter().map(|d| d.date).collect::<BTreeSet<_>>().len(),
    };

    Some(PeriodBucket {
        period,
        days: days.len() as u32,
        tie_days,
        players,
        largest_margin,
        sub_periods,
        is_ongoing: period.contains(today),
    })
}

/// Partition daily records into buckets of one kind, in chronological order.
pub fn bucket_daily(days: &[DailyRecord], kind: PeriodKind, today: NaiveDate) -> Vec<PeriodBucket> {
    let mut groups: BTreeMap<Period, Vec<&DailyRecord>> = BTreeMap::new();
    for day in days {
        groups
            .entry(Period::containing(kind, day.date))
            .or_default()
            .push(day);
    }

    groups
        .into_iter()
        .filter_map(|(period, mut group)| {
            group.sort_by_key(|d| d.date);
            build_bucket(period, &group, today)
        })
        .collect()
}

/// All three partitionings, concatenated year -> quarter -> month.
pub fn bucket_all(days: &[DailyRecord], today: NaiveDate) -> Vec<PeriodBucket> {
    let per_kind: Vec<Vec<PeriodBucket>> = PeriodKind::ALL
        .par_iter()
        .map(|kind| bucket_daily(days, *kind, today))
        .collect();
    per_kind.into_iter().flatten().collect()
}
