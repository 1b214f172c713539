//! Round records and the stats CSV loader
//!
//! One row of the stats CSV is one round (1-5) of one Timeguessr day. Each
//! row carries the actual answer and, for both tracked players, what they
//! guessed and what they scored. Scores are kept as ranges because older
//! rows only recorded the coarse share-text pattern instead of the exact
//! score.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Maximum score for one category of one round.
pub const MAX_ROUND_SCORE: f64 = 5000.0;

/// Rounds played per day.
pub const ROUNDS_PER_DAY: u8 = 5;

/// Maximum total for a day (five rounds, two categories).
pub const MAX_DAY_SCORE: f64 = MAX_ROUND_SCORE * 2.0 * ROUNDS_PER_DAY as f64;

// ============================================================================
// Players and categories
// ============================================================================

/// One of the two tracked players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    First,
    Second,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::First, Player::Second];

    pub fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    pub fn other(self) -> Player {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }
}

/// Display names of the two players, also used to build CSV column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: [String; 2],
}

impl Default for Roster {
    fn default() -> Self {
        Roster::new("Michael", "Sarah")
    }
}

impl Roster {
    pub fn new(first: &str, second: &str) -> Self {
        Roster {
            names: [first.trim().to_string(), second.trim().to_string()],
        }
    }

    /// Parse a roster from `"First,Second"`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() => {
                if a.eq_ignore_ascii_case(b) {
                    Err(format!("Players must have different names: '{}'", s))
                } else {
                    Ok(Roster::new(a, b))
                }
            }
            _ => Err(format!("Expected two comma-separated player names, got '{}'", s)),
        }
    }

    pub fn name(&self, player: Player) -> &str {
        &self.names[player.index()]
    }

    /// Case-insensitive lookup of a player by name.
    pub fn find(&self, name: &str) -> Option<Player> {
        let name = name.trim();
        Player::BOTH
            .into_iter()
            .find(|p| self.name(*p).eq_ignore_ascii_case(name))
    }

    pub fn to_config_string(&self) -> String {
        format!("{},{}", self.names[0], self.names[1])
    }
}

/// Scoring category. `Total` is geography + time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Total,
    Geography,
    Time,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Total, Category::Geography, Category::Time];

    pub fn index(self) -> usize {
        match self {
            Category::Total => 0,
            Category::Geography => 1,
            Category::Time => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Total => "Total",
            Category::Geography => "Geography",
            Category::Time => "Time",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Category::Total => "\u{1F31F}",
            Category::Geography => "\u{1F30E}",
            Category::Time => "\u{1F4C5}",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "total" | "all" => Ok(Category::Total),
            "geography" | "geo" => Ok(Category::Geography),
            "time" | "year" => Ok(Category::Time),
            other => Err(format!("Unknown category '{}'", other)),
        }
    }
}

// ============================================================================
// Scores and patterns
// ============================================================================

/// Inclusive score range for one category of one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub const ZERO: ScoreRange = ScoreRange { min: 0.0, max: 0.0 };

    /// Build a range, clamping both ends to [0, 5000] and ordering them.
    pub fn new(a: f64, b: f64) -> Self {
        let a = a.clamp(0.0, MAX_ROUND_SCORE);
        let b = b.clamp(0.0, MAX_ROUND_SCORE);
        ScoreRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn exact(score: f64) -> Self {
        ScoreRange::new(score, score)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn is_exact(&self) -> bool {
        self.min == self.max
    }
}

lazy_static::lazy_static! {
    static ref PATTERN_RE: Regex = Regex::new(r"^[OX%]{3}$").unwrap();
}

/// Normalize a pattern string (`"oox"` -> `"OOX"`), returning `None` if it
/// is not three of `O`, `%`, `X`.
pub fn normalize_pattern(pattern: &str) -> Option<String> {
    let upper = pattern.trim().to_uppercase();
    if PATTERN_RE.is_match(&upper) {
        Some(upper)
    } else {
        None
    }
}

/// Score range implied by a share-text pattern.
///
/// Each green mark (`O`) is worth two tiers and each yellow mark (`%`) one,
/// giving a tier from 0 (`XXX`) to 6 (`OOO`). A time `OOO` is the exact
/// year; a time `XXX` scores nothing.
pub fn pattern_range(pattern: &str, category: Category) -> Option<ScoreRange> {
    let pattern = normalize_pattern(pattern)?;
    let tier: usize = pattern
        .chars()
        .map(|c| match c {
            'O' => 2,
            '%' => 1,
            _ => 0,
        })
        .sum();

    const GEOGRAPHY_TIERS: [(f64, f64); 7] = [
        (0.0, 249.0),
        (250.0, 999.0),
        (1000.0, 1999.0),
        (2000.0, 2999.0),
        (3000.0, 3999.0),
        (4000.0, 4749.0),
        (4750.0, 5000.0),
    ];
    const TIME_TIERS: [(f64, f64); 7] = [
        (0.0, 0.0),
        (1.0, 999.0),
        (1000.0, 1999.0),
        (2000.0, 2999.0),
        (3000.0, 3999.0),
        (4000.0, 4999.0),
        (5000.0, 5000.0),
    ];

    let (min, max) = match category {
        Category::Geography => GEOGRAPHY_TIERS[tier],
        Category::Time => TIME_TIERS[tier],
        Category::Total => return None,
    };
    Some(ScoreRange::new(min, max))
}

/// Fill-safe numeric coercion: trims, drops thousands separators and
/// returns `None` for anything that isn't a finite number.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date in any of the formats found in the stats sheets.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

// ============================================================================
// Round records
// ============================================================================

/// The correct answer for a round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    pub year: Option<i32>,
    pub country: String,
    pub subdivision: String,
    pub city: String,
}

/// One player's result for one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRound {
    /// Day total as recorded on this row (repeated on every round of a day)
    pub total_score: Option<f64>,
    /// Round score (geography + time) if recorded
    pub round_score: Option<f64>,
    /// `None` when the row records neither a range nor a pattern
    pub geography: Option<ScoreRange>,
    pub time: Option<ScoreRange>,
    pub geography_pattern: Option<String>,
    pub time_pattern: Option<String>,
    /// Distance of the location guess (km)
    pub geography_distance: Option<f64>,
    pub time_guessed: Option<i32>,
    /// Years between guess and answer
    pub time_distance: Option<f64>,
}

impl PlayerRound {
    /// Known score range for a sub-category. `Total` has no range.
    pub fn range(&self, category: Category) -> Option<ScoreRange> {
        match category {
            Category::Geography => self.geography,
            Category::Time => self.time,
            Category::Total => None,
        }
    }

    /// Category score for this round, taken as the range midpoint. Unknown
    /// sub-scores count as zero.
    pub fn score(&self, category: Category) -> f64 {
        match category {
            Category::Total => self.round_total(),
            _ => self.range(category).map(|r| r.midpoint()).unwrap_or(0.0),
        }
    }

    /// Recorded round score, or the sum of the category midpoints.
    pub fn round_total(&self) -> f64 {
        match self.round_score {
            Some(score) if score > 0.0 => score,
            _ => self.score(Category::Geography) + self.score(Category::Time),
        }
    }
}

/// One row of the stats CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub date: NaiveDate,
    /// Timeguessr day number
    pub day: u32,
    /// Round within the day (1-5)
    pub round: u8,
    pub answer: Answer,
    pub players: [PlayerRound; 2],
}

impl RoundRecord {
    pub fn player(&self, player: Player) -> &PlayerRound {
        &self.players[player.index()]
    }
}

// ============================================================================
// CSV loading
// ============================================================================

/// Column name for a per-player field, e.g. `"Sarah Time Score (Min)"`.
pub fn player_column(name: &str, field: &str) -> String {
    format!("{} {}", name, field)
}

/// Per-player field names, in stats CSV order.
pub const PLAYER_FIELDS: [&str; 11] = [
    "Total Score",
    "Round Score",
    "Geography",
    "Time",
    "Geography Score (Min)",
    "Geography Score (Max)",
    "Time Score (Min)",
    "Time Score (Max)",
    "Geography Distance",
    "Time Guessed",
    "Time Distance",
];

/// Shared (non-player) columns, in stats CSV order.
pub const SHARED_FIELDS: [&str; 7] = [
    "Date",
    "Timeguessr Day",
    "Timeguessr Round",
    "City",
    "Subdivision",
    "Country",
    "Year",
];

/// Full stats CSV header for a roster.
pub fn stats_headers(roster: &Roster) -> Vec<String> {
    let mut headers: Vec<String> = SHARED_FIELDS.iter().map(|s| s.to_string()).collect();
    for player in Player::BOTH {
        for field in PLAYER_FIELDS {
            headers.push(player_column(roster.name(player), field));
        }
    }
    headers
}

struct PlayerColumns {
    total: Option<usize>,
    round_score: Option<usize>,
    geography_pattern: Option<usize>,
    time_pattern: Option<usize>,
    geography_min: Option<usize>,
    geography_max: Option<usize>,
    time_min: Option<usize>,
    time_max: Option<usize>,
    geography_distance: Option<usize>,
    time_guessed: Option<usize>,
    time_distance: Option<usize>,
}

struct ColumnIndices {
    date: usize,
    day: Option<usize>,
    round: Option<usize>,
    city: Option<usize>,
    subdivision: Option<usize>,
    country: Option<usize>,
    year: Option<usize>,
    players: [PlayerColumns; 2],
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn find_player_columns(headers: &StringRecord, name: &str) -> PlayerColumns {
    let col = |field: &str| find_column(headers, &player_column(name, field));
    PlayerColumns {
        total: col("Total Score"),
        round_score: col("Round Score"),
        geography_pattern: col("Geography"),
        time_pattern: col("Time"),
        geography_min: col("Geography Score (Min)"),
        geography_max: col("Geography Score (Max)"),
        time_min: col("Time Score (Min)"),
        time_max: col("Time Score (Max)"),
        geography_distance: col("Geography Distance"),
        time_guessed: col("Time Guessed"),
        time_distance: col("Time Distance"),
    }
}

fn find_columns(headers: &StringRecord, roster: &Roster) -> Result<ColumnIndices> {
    let date = find_column(headers, "Date")
        .ok_or_else(|| anyhow::anyhow!("Column 'Date' not found in stats CSV"))?;

    for player in Player::BOTH {
        let total = player_column(roster.name(player), "Total Score");
        if find_column(headers, &total).is_none() {
            log::warn!("Column '{}' not found; totals fall back to round sums", total);
        }
    }

    Ok(ColumnIndices {
        date,
        day: find_column(headers, "Timeguessr Day"),
        round: find_column(headers, "Timeguessr Round"),
        city: find_column(headers, "City"),
        subdivision: find_column(headers, "Subdivision"),
        country: find_column(headers, "Country"),
        year: find_column(headers, "Year"),
        players: [
            find_player_columns(headers, roster.name(Player::First)),
            find_player_columns(headers, roster.name(Player::Second)),
        ],
    })
}

fn field<'a>(record: &'a StringRecord, idx: Option<usize>) -> &'a str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn number(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    parse_number(field(record, idx))
}

fn text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = field(record, idx);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn resolve_range(
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<&str>,
    category: Category,
) -> Option<ScoreRange> {
    match (min, max) {
        (Some(a), Some(b)) => Some(ScoreRange::new(a, b)),
        (Some(a), None) | (None, Some(a)) => Some(ScoreRange::exact(a)),
        (None, None) => pattern.and_then(|p| pattern_range(p, category)),
    }
}

fn extract_player_round(record: &StringRecord, cols: &PlayerColumns) -> PlayerRound {
    let geography_pattern = text(record, cols.geography_pattern).and_then(|p| normalize_pattern(&p));
    let time_pattern = text(record, cols.time_pattern).and_then(|p| normalize_pattern(&p));

    PlayerRound {
        total_score: number(record, cols.total),
        round_score: number(record, cols.round_score),
        geography: resolve_range(
            number(record, cols.geography_min),
            number(record, cols.geography_max),
            geography_pattern.as_deref(),
            Category::Geography,
        ),
        time: resolve_range(
            number(record, cols.time_min),
            number(record, cols.time_max),
            time_pattern.as_deref(),
            Category::Time,
        ),
        geography_pattern,
        time_pattern,
        geography_distance: number(record, cols.geography_distance),
        time_guessed: number(record, cols.time_guessed).map(|v| v.round() as i32),
        time_distance: number(record, cols.time_distance),
    }
}

/// Read round records from any CSV source.
pub fn read_rounds<R: Read>(source: R, roster: &Roster) -> Result<Vec<RoundRecord>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let cols = find_columns(&headers, roster)?;

    let mut rounds = Vec::new();
    let mut skipped = 0usize;

    for (row_num, result) in reader.records().enumerate() {
        let record = result.context("Failed to read CSV row")?;

        let date = match parse_date(field(&record, Some(cols.date))) {
            Some(d) => d,
            None => {
                // Blank trailing rows are common in the sheet export
                if record.iter().any(|f| !f.trim().is_empty()) {
                    log::warn!(
                        "Row {}: unparseable date '{}', skipping",
                        row_num + 2,
                        field(&record, Some(cols.date))
                    );
                }
                skipped += 1;
                continue;
            }
        };

        let round = number(&record, cols.round)
            .map(|r| r.clamp(0.0, 255.0) as u8)
            .unwrap_or(0);

        rounds.push(RoundRecord {
            date,
            day: number(&record, cols.day).map(|d| d.max(0.0) as u32).unwrap_or(0),
            round,
            answer: Answer {
                year: number(&record, cols.year).map(|y| y.round() as i32),
                country: field(&record, cols.country).to_string(),
                subdivision: field(&record, cols.subdivision).to_string(),
                city: field(&record, cols.city).to_string(),
            },
            players: [
                extract_player_round(&record, &cols.players[0]),
                extract_player_round(&record, &cols.players[1]),
            ],
        });
    }

    log::debug!("Loaded {} round rows ({} skipped)", rounds.len(), skipped);
    Ok(rounds)
}

/// Load round records from the stats CSV at `path`.
pub fn load_rounds(path: &Path, roster: &Roster) -> Result<Vec<RoundRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open stats CSV {}", path.display()))?;
    read_rounds(file, roster)
}
