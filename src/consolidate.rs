//! Building the stats CSV
//!
//! The stats CSV is derived from three sources: the actual answers for each
//! (day, round), each player's guesses (distance off and year guessed), and
//! the submitted raw scores with their coarse patterns. Where a guess is
//! known the round score is computed exactly; otherwise the pattern range
//! stands in.

use crate::repository::RawScore;
use crate::rounds::{
    parse_date, parse_number, pattern_range, stats_headers, Category, Player, Roster,
    ScoreRange, MAX_ROUND_SCORE, ROUNDS_PER_DAY,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

// ============================================================================
// Scoring
// ============================================================================

/// Time score for a guess `years_off` from the actual year.
pub fn time_score(years_off: u32) -> f64 {
    match years_off {
        0 => 5000.0,
        1 => 4950.0,
        2 => 4800.0,
        3 => 4600.0,
        4 => 4300.0,
        5 => 3900.0,
        6..=7 => 3000.0,
        8..=10 => 2000.0,
        11..=15 => 1000.0,
        16..=20 => 500.0,
        _ => 0.0,
    }
}

/// Geography score for a guess `km` away from the actual location.
pub fn geography_score(km: f64) -> f64 {
    if !km.is_finite() || km < 0.0 {
        return 0.0;
    }
    if km <= 0.05 {
        return MAX_ROUND_SCORE;
    }
    (MAX_ROUND_SCORE * (-km / 2000.0).exp()).round()
}

// ============================================================================
// Inputs
// ============================================================================

/// The real answer for one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualRound {
    pub date: Option<NaiveDate>,
    pub city: String,
    pub subdivision: String,
    pub country: String,
    pub year: Option<i32>,
}

/// One player's guess for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Guess {
    pub geography_distance: Option<f64>,
    pub time_guessed: Option<i32>,
}

type RoundKey = (u32, u8);

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn cell<'a>(record: &'a StringRecord, idx: Option<usize>) -> &'a str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn round_key(record: &StringRecord, day: Option<usize>, round: Option<usize>) -> Option<RoundKey> {
    let day = parse_number(cell(record, day))?;
    let round = parse_number(cell(record, round))?;
    if day < 1.0 || !(1.0..=ROUNDS_PER_DAY as f64).contains(&round) {
        return None;
    }
    Some((day as u32, round as u8))
}

fn key_columns(headers: &StringRecord, what: &str) -> Result<(usize, usize)> {
    let day = column(headers, "Timeguessr Day")
        .ok_or_else(|| anyhow::anyhow!("Column 'Timeguessr Day' not found in {}", what))?;
    let round = column(headers, "Timeguessr Round")
        .ok_or_else(|| anyhow::anyhow!("Column 'Timeguessr Round' not found in {}", what))?;
    Ok((day, round))
}

pub fn read_actuals<R: Read>(source: R) -> Result<BTreeMap<RoundKey, ActualRound>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let (day, round) = key_columns(&headers, "actuals CSV")?;
    let date = column(&headers, "Date");
    let city = column(&headers, "City");
    let subdivision = column(&headers, "Subdivision");
    let country = column(&headers, "Country");
    let year = column(&headers, "Year");

    let mut actuals = BTreeMap::new();
    for result in reader.records() {
        let record = result.context("Failed to read actuals row")?;
        let Some(key) = round_key(&record, Some(day), Some(round)) else {
            continue;
        };
        actuals.insert(
            key,
            ActualRound {
                date: parse_date(cell(&record, date)),
                city: cell(&record, city).to_string(),
                subdivision: cell(&record, subdivision).to_string(),
                country: cell(&record, country).to_string(),
                year: parse_number(cell(&record, year)).map(|y| y.round() as i32),
            },
        );
    }
    Ok(actuals)
}

pub fn read_guesses<R: Read>(source: R) -> Result<HashMap<RoundKey, Guess>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();
    let (day, round) = key_columns(&headers, "guesses CSV")?;
    let distance = column(&headers, "Geography Distance");
    let guessed = column(&headers, "Time Guessed");

    let mut guesses = HashMap::new();
    for result in reader.records() {
        let record = result.context("Failed to read guesses row")?;
        if let Some(key) = round_key(&record, Some(day), Some(round)) {
            guesses.insert(
                key,
                Guess {
                    geography_distance: parse_number(cell(&record, distance)),
                    time_guessed: parse_number(cell(&record, guessed)).map(|y| y.round() as i32),
                },
            );
        }
    }
    Ok(guesses)
}

// ============================================================================
// Merge
// ============================================================================

fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn range_from(exact: Option<f64>, pattern: Option<&str>, category: Category) -> Option<ScoreRange> {
    exact
        .map(ScoreRange::exact)
        .or_else(|| pattern.and_then(|p| pattern_range(p, category)))
}

fn player_cells(
    key: RoundKey,
    actual: Option<&ActualRound>,
    guess: Option<&Guess>,
    raw: Option<&RawScore>,
) -> Vec<String> {
    let (_, round) = key;
    let geography_pattern = raw.and_then(|r| r.geography_pattern(round));
    let time_pattern = raw.and_then(|r| r.time_pattern(round));

    let distance = guess.and_then(|g| g.geography_distance);
    let guessed = guess.and_then(|g| g.time_guessed);
    let years_off = guessed
        .zip(actual.and_then(|a| a.year))
        .map(|(g, a)| g.abs_diff(a));

    let geography = range_from(distance.map(geography_score), geography_pattern, Category::Geography);
    let time = range_from(years_off.map(time_score), time_pattern, Category::Time);
    let round_score = match (geography, time) {
        (Some(g), Some(t)) if g.is_exact() && t.is_exact() => Some(g.min + t.min),
        _ => None,
    };

    vec![
        fmt_opt(raw.map(|r| r.total)),
        fmt_opt(round_score),
        geography_pattern.unwrap_or("").to_string(),
        time_pattern.unwrap_or("").to_string(),
        fmt_opt(geography.map(|r| r.min)),
        fmt_opt(geography.map(|r| r.max)),
        fmt_opt(time.map(|r| r.min)),
        fmt_opt(time.map(|r| r.max)),
        fmt_opt(distance),
        fmt_opt(guessed),
        fmt_opt(years_off),
    ]
}

/// Merge the three sources into stats CSV rows (without header), sorted by
/// (day, round). Rounds with no known date are dropped.
pub fn merge_rows(
    actuals: &BTreeMap<RoundKey, ActualRound>,
    guesses: &[HashMap<RoundKey, Guess>; 2],
    raw_scores: &[RawScore],
    roster: &Roster,
) -> Vec<Vec<String>> {
    let mut raw_by_slot: HashMap<(u32, Player), &RawScore> = HashMap::new();
    for score in raw_scores {
        match roster.find(&score.player) {
            Some(player) => {
                raw_by_slot.insert((score.day, player), score);
            }
            None => log::warn!(
                "Raw score for unknown player '{}' on day {} ignored",
                score.player,
                score.day
            ),
        }
    }

    let mut keys: Vec<RoundKey> = actuals.keys().copied().collect();
    for (day, _) in raw_by_slot.keys() {
        keys.extend((1..=ROUNDS_PER_DAY).map(|r| (*day, r)));
    }
    keys.sort_unstable();
    keys.dedup();

    let mut rows = Vec::with_capacity(keys.len());
    for key in keys {
        let (day, round) = key;
        let actual = actuals.get(&key);
        let raw = |p: Player| raw_by_slot.get(&(day, p)).copied();

        let date = actual
            .and_then(|a| a.date)
            .or_else(|| Player::BOTH.iter().find_map(|p| raw(*p).map(|r| r.date)));
        let Some(date) = date else {
            log::warn!("Day {} round {}: no date known, skipping", day, round);
            continue;
        };

        let mut row = vec![
            date.format("%Y-%m-%d").to_string(),
            day.to_string(),
            round.to_string(),
            actual.map(|a| a.city.clone()).unwrap_or_default(),
            actual.map(|a| a.subdivision.clone()).unwrap_or_default(),
            actual.map(|a| a.country.clone()).unwrap_or_default(),
            fmt_opt(actual.and_then(|a| a.year)),
        ];
        for player in Player::BOTH {
            row.extend(player_cells(
                key,
                actual,
                guesses[player.index()].get(&key),
                raw(player),
            ));
        }
        rows.push(row);
    }
    rows
}

pub fn write_stats<W: Write>(sink: W, roster: &Roster, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    writer.write_record(stats_headers(roster))?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn open(path: &Path, what: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {} {}", what, path.display()))
}

/// Build the stats CSV at `output` from files on disk. Returns the number of
/// round rows written.
pub fn consolidate_files(
    actuals: Option<&Path>,
    guesses: [Option<&Path>; 2],
    raw_scores: &[RawScore],
    roster: &Roster,
    output: &Path,
) -> Result<usize> {
    let actuals = match actuals {
        Some(path) => read_actuals(open(path, "actuals CSV")?)?,
        None => BTreeMap::new(),
    };
    let mut guess_maps = [HashMap::new(), HashMap::new()];
    for player in Player::BOTH {
        if let Some(path) = guesses[player.index()] {
            guess_maps[player.index()] = read_guesses(open(path, "guesses CSV")?)?;
        }
    }

    let rows = merge_rows(&actuals, &guess_maps, raw_scores, roster);
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    write_stats(file, roster, &rows)?;

    log::info!(
        "Wrote {} rounds ({} actuals, {} raw scores) to {}",
        rows.len(),
        actuals.len(),
        raw_scores.len(),
        output.display()
    );
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::aggregate_daily;
    use crate::rounds::read_rounds;

    const ACTUALS: &str = "\
Timeguessr Day,Timeguessr Round,Date,City,Subdivision,Country,Year
300,2,2024-06-01,Lima,Lima,Peru,1990
300,1,2024-06-01,Paris,Ile-de-France,France,1968
";

    const MICHAEL_GUESSES: &str = "\
Timeguessr Day,Timeguessr Round,Geography Distance,Time Guessed
300,1,0,1968
300,2,2000,1985
";

    fn raw(player: &str, total: f64) -> RawScore {
        RawScore {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            day: 300,
            player: player.to_string(),
            total,
            geography: "OOO OO% OOO OOO OOO".to_string(),
            time: "OOO XXX OOO OOO OOO".to_string(),
        }
    }

    #[test]
    fn test_scoring_tables() {
        assert_eq!(time_score(0), 5000.0);
        assert_eq!(time_score(7), 3000.0);
        assert_eq!(time_score(21), 0.0);
        assert_eq!(geography_score(0.0), 5000.0);
        assert_eq!(geography_score(2000.0), (5000.0 * (-1.0f64).exp()).round());
        assert_eq!(geography_score(-1.0), 0.0);
        assert!(geography_score(100.0) < 5000.0);
    }

    #[test]
    fn test_merge_prefers_exact_scores() {
        let roster = Roster::default();
        let actuals = read_actuals(ACTUALS.as_bytes()).unwrap();
        let guesses = [
            read_guesses(MICHAEL_GUESSES.as_bytes()).unwrap(),
            HashMap::new(),
        ];
        let raws = vec![raw("Michael", 44000.0), raw("Sarah", 40000.0)];
        let rows = merge_rows(&actuals, &guesses, &raws, &roster);

        // Actual rounds 1-2 plus raw-only rounds 3-5, sorted
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][2], "1");
        assert_eq!(rows[0][3], "Paris");
        assert_eq!(rows[4][3], "");

        let headers = stats_headers(&roster);
        let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
        // Exact from the guess
        assert_eq!(rows[0][col("Michael Round Score")], "10000");
        assert_eq!(rows[1][col("Michael Time Distance")], "5");
        assert_eq!(rows[1][col("Michael Time Score (Min)")], "3900");
        // No guess for Sarah: pattern range, no round score
        assert_eq!(rows[1][col("Sarah Round Score")], "");
        assert_eq!(rows[1][col("Sarah Time")], "XXX");
        assert_eq!(rows[1][col("Sarah Time Score (Max)")], "0");
    }

    #[test]
    fn test_output_loads_back_into_daily_totals() {
        let roster = Roster::default();
        let actuals = read_actuals(ACTUALS.as_bytes()).unwrap();
        let guesses = [HashMap::new(), HashMap::new()];
        let raws = vec![raw("Michael", 44000.0), raw("Sarah", 40000.0)];
        let rows = merge_rows(&actuals, &guesses, &raws, &roster);

        let mut buf = Vec::new();
        write_stats(&mut buf, &roster, &rows).unwrap();
        let rounds = read_rounds(buf.as_slice(), &roster).unwrap();
        assert_eq!(rounds.len(), 5);

        let days = aggregate_daily(&rounds);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day, 300);
        assert_eq!(days[0].score(Player::First, Category::Total), 44000.0);
        assert_eq!(days[0].score(Player::Second, Category::Total), 40000.0);
    }

    #[test]
    fn test_unknown_player_and_undated_rounds_skipped() {
        let roster = Roster::default();
        let actuals = read_actuals("Timeguessr Day,Timeguessr Round\n7,1\n".as_bytes()).unwrap();
        let mut stranger = raw("Zed", 1.0);
        stranger.day = 8;
        let rows = merge_rows(&actuals, &[HashMap::new(), HashMap::new()], &[stranger], &roster);
        assert!(rows.is_empty());
    }
}
