//! Integration test for awards and news against a sample stats CSV
//!
//! The fixture holds seven mutual days across January, February and April
//! 2024, one day only the first player played, and a blank trailing row.
//! Michael wins four in a row (Jan 11 - Feb 7) before Sarah takes April.

use chrono::NaiveDate;
use std::path::Path;
use timeguessr_stats::awards::{hall_of_fame, hall_of_shame, AwardLists, AwardThresholds};
use timeguessr_stats::daily::aggregate_daily;
use timeguessr_stats::news::{detect_news, head_to_head, NewsConfig, NewsEvent};
use timeguessr_stats::periods::bucket_all;
use timeguessr_stats::rounds::{load_rounds, read_rounds, Category, Player, Roster};
use timeguessr_stats::DailyRecord;

const FIXTURE: &str = "tests/fixtures/input/timeguessr_sample.csv";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn load_days() -> Vec<DailyRecord> {
    let rounds = load_rounds(Path::new(FIXTURE), &Roster::default()).expect("fixture loads");
    aggregate_daily(&rounds)
}

fn fame(days: &[DailyRecord]) -> AwardLists {
    hall_of_fame(
        &bucket_all(days, today()),
        &Roster::default(),
        &AwardThresholds::default(),
    )
}

#[test]
fn test_fixture_daily_totals() {
    let days = load_days();
    // Feb 8 (Sarah absent) and the blank row are dropped
    assert_eq!(days.len(), 7);
    assert!(days.windows(2).all(|w| w[0].date < w[1].date));

    let total = |p: Player| days.iter().map(|d| d.score(p, Category::Total)).sum::<f64>();
    assert_eq!(total(Player::First), 281000.0);
    assert_eq!(total(Player::Second), 262000.0);

    let h2h = head_to_head(&days, Category::Total);
    assert_eq!(h2h.wins, [4, 2]);
    assert_eq!(h2h.ties, 1);
    assert_eq!(h2h.longest[0].map(|s| s.length), Some(4));
}

#[test]
fn test_visible_periods_only() {
    let days = load_days();
    let awards = fame(&days);

    let titles: Vec<&str> = Player::BOTH
        .iter()
        .flat_map(|p| awards.for_player(*p))
        .map(|a| a.title.as_str())
        .collect();

    for expected in ["2024", "Q1 2024", "January 2024", "February 2024", "April 2024"] {
        assert!(titles.contains(&expected), "missing {}", expected);
    }
    // Q2 only has April
    assert!(!titles.contains(&"Q2 2024"));
}

#[test]
fn test_gold_qualifiers() {
    let days = load_days();
    let awards = fame(&days);
    let michael = awards.for_player(Player::First);

    let find = |title: &str, name: &str| {
        michael
            .iter()
            .find(|a| a.title == title && a.name == name)
            .unwrap_or_else(|| panic!("no {} {} award", title, name))
    };

    // 213,000 vs 178,000 in Q1 is a 19.7% margin, 4 of 5 days won
    assert!(find("Q1 2024", "Total Champion").is_gold);
    assert!(find("Q1 2024", "Total Wins").is_gold);
    // 7.3% for the year, 4 of 7 days
    assert!(!find("2024", "Total Champion").is_gold);
    assert!(!find("2024", "Total Wins").is_gold);
    assert!(find("2024", "Total Champion").is_ongoing);

    assert!(michael
        .iter()
        .any(|a| a.title == "February 2024" && a.name == "Geography Perfect Rounds"));
}

#[test]
fn test_awards_are_deterministic() {
    let days = load_days();
    let buckets = bucket_all(&days, today());
    let roster = Roster::default();
    let thresholds = AwardThresholds::default();

    assert_eq!(fame(&days), fame(&days));
    assert_eq!(
        hall_of_shame(&buckets, &roster, &thresholds),
        hall_of_shame(&buckets, &roster, &thresholds)
    );

    // Shame never carries gold
    let shame = hall_of_shame(&buckets, &roster, &thresholds);
    assert!(Player::BOTH
        .iter()
        .flat_map(|p| shame.for_player(*p))
        .all(|a| !a.is_gold));
}

#[test]
fn test_streak_broken_news() {
    let days = load_days();
    let events = detect_news(&days, Category::Total, &NewsConfig::default());

    let broken = events.iter().find_map(|e| match e {
        NewsEvent::StreakBroken {
            date,
            player,
            length,
            broken_by,
        } => Some((*date, *player, *length, *broken_by)),
        _ => None,
    });
    assert_eq!(
        broken,
        Some((
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            Player::First,
            4,
            Some(Player::Second)
        ))
    );
    assert!(events.windows(2).all(|w| w[0].date() <= w[1].date()));
}

#[test]
fn test_tie_then_win_scenario() {
    let csv = "\
Date,Michael Total Score,Sarah Total Score
2024-06-01,40000,40000
2024-06-02,45000,42000
";
    let roster = Roster::default();
    let days = aggregate_daily(&read_rounds(csv.as_bytes(), &roster).unwrap());
    let awards = fame(&days);

    let june: Vec<_> = awards
        .for_player(Player::First)
        .iter()
        .filter(|a| a.title == "June 2024")
        .collect();
    let champion = june.iter().find(|a| a.name == "Total Champion").unwrap();
    let wins = june.iter().find(|a| a.name == "Total Wins").unwrap();
    assert!(!champion.is_gold);
    assert!(!wins.is_gold);
    assert!(!wins.is_tie);
    assert_eq!(wins.description, "Won 1 of 2 days (Sarah: 0)");

    // The tie day counts for neither player
    assert!(awards
        .for_player(Player::Second)
        .iter()
        .all(|a| a.name != "Total Wins"));
}

#[test]
fn test_totals_only_sheet_has_no_sub_category_awards() {
    let csv = "\
Date,Michael Total Score,Sarah Total Score
2024-06-01,40000,40000
2024-06-02,45000,42000
";
    let roster = Roster::default();
    let days = aggregate_daily(&read_rounds(csv.as_bytes(), &roster).unwrap());
    assert_eq!(days.len(), 2);
    let buckets = bucket_all(&days, today());

    let shame = hall_of_shame(&buckets, &roster, &AwardThresholds::default());
    let all_shame: Vec<_> = Player::BOTH
        .iter()
        .flat_map(|p| shame.for_player(*p))
        .collect();
    assert!(all_shame.iter().all(|a| a.rule != "failed_rounds"));
    assert!(all_shame.iter().all(|a| a.category == Category::Total));
    // The 40,000 each on June 1 is still a shared worst total day
    assert!(all_shame
        .iter()
        .any(|a| a.name == "Total Worst Day" && a.title == "June 2024"));

    let trophies = fame(&days);
    assert!(Player::BOTH
        .iter()
        .flat_map(|p| trophies.for_player(*p))
        .all(|a| a.category == Category::Total));
}
