//! Hall of Fame / Hall of Shame award generation
//!
//! Every award is one row of a rule table: a measure read off a period
//! bucket for each player, a direction saying which end of the comparison
//! gets the award, and a gold policy. Buckets are evaluated independently;
//! nothing carries over from one period to the next.

use crate::periods::{Period, PeriodBucket};
use crate::render::{format_date, format_points, format_relative};
use crate::rounds::{Category, Player, Roster};
use chrono::NaiveDate;
use std::cmp::Reverse;

/// Relative margin of victory that earns a gold rim.
pub const GOLD_MARGIN: f64 = 0.10;

/// Share of a period's days (numerator, denominator) a player must win for
/// a day-count award to be gold.
pub const DOMINANCE: (u32, u32) = (2, 3);

/// Thresholds for the gold qualifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AwardThresholds {
    pub gold_margin: f64,
    pub dominance: (u32, u32),
}

impl Default for AwardThresholds {
    fn default() -> Self {
        AwardThresholds {
            gold_margin: GOLD_MARGIN,
            dominance: DOMINANCE,
        }
    }
}

impl AwardThresholds {
    /// `(winner - loser) / loser >= gold_margin`, or any positive win over zero.
    pub fn is_gold_margin(&self, winner: f64, loser: f64) -> bool {
        if loser == 0.0 {
            winner > 0.0
        } else {
            (winner - loser) / loser >= self.gold_margin
        }
    }

    /// Winner took at least the dominance share of `days`.
    pub fn is_dominant(&self, count: u32, days: u32) -> bool {
        let (num, den) = self.dominance;
        days > 0 && u64::from(count) * u64::from(den) >= u64::from(days) * u64::from(num)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hall {
    Fame,
    Shame,
}

impl Hall {
    pub fn title(self) -> &'static str {
        match self {
            Hall::Fame => "Hall of Fame",
            Hall::Shame => "Hall of Shame",
        }
    }
}

/// One generated award.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardRecord {
    pub icon: String,
    /// Period label, e.g. `"Q2 2024"`
    pub title: String,
    /// Award name, e.g. `"Total Champion"`
    pub name: String,
    pub description: String,
    pub category: Category,
    /// Stable rule key, e.g. `"champion"`
    pub rule: &'static str,
    pub period: Period,
    pub is_tie: bool,
    pub is_gold: bool,
    pub is_ongoing: bool,
}

/// Awards per player, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardLists {
    lists: [Vec<AwardRecord>; 2],
}

impl AwardLists {
    pub fn for_player(&self, player: Player) -> &[AwardRecord] {
        &self.lists[player.index()]
    }

    pub fn len(&self) -> usize {
        self.lists[0].len() + self.lists[1].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, player: Player, award: AwardRecord) {
        self.lists[player.index()].push(award);
    }

    fn extend(&mut self, other: AwardLists) {
        let [first, second] = other.lists;
        self.lists[0].extend(first);
        self.lists[1].extend(second);
    }
}

// ============================================================================
// Rule table
// ============================================================================

/// A value a rule compares, with the day it happened if it is a single-day
/// extreme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
    pub value: f64,
    pub date: Option<NaiveDate>,
}

impl Measure {
    fn total(value: f64) -> Self {
        Measure { value, date: None }
    }

    fn count(value: u32) -> Self {
        Measure {
            value: f64::from(value),
            date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Higher,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GoldRule {
    RelativeMargin,
    Dominance,
    Never,
}

/// Inputs to a description template.
struct Outcome<'a> {
    rival: &'a str,
    mine: Measure,
    theirs: Option<Measure>,
    days: u32,
    category: Category,
    is_tie: bool,
}

impl Outcome<'_> {
    fn cat(&self) -> String {
        self.category.label().to_lowercase()
    }

    fn theirs_value(&self) -> f64 {
        self.theirs.map(|m| m.value).unwrap_or(0.0)
    }

    fn on_date(&self) -> String {
        self.mine
            .date
            .map(|d| format!(" on {}", format_date(d)))
            .unwrap_or_default()
    }
}

type MeasureFn = fn(&PeriodBucket, Player, Category) -> Option<Measure>;
type DescribeFn = fn(&Outcome) -> String;

struct AwardRule {
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    category: Category,
    direction: Direction,
    gold: GoldRule,
    /// Skip when no player has a non-zero measure
    skip_zero: bool,
    measure: MeasureFn,
    describe: DescribeFn,
}

fn period_sum(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    Some(Measure::total(b.stats(p, c).sum))
}

fn days_won(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    Some(Measure::count(b.stats(p, c).days_won))
}

fn days_lost(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    Some(Measure::count(b.stats(p.other(), c).days_won))
}

fn best_day(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    b.stats(p, c).best_day.map(|d| Measure {
        value: d.value,
        date: Some(d.date),
    })
}

fn worst_day(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    b.stats(p, c).worst_day.map(|d| Measure {
        value: d.value,
        date: Some(d.date),
    })
}

fn biggest_win(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    b.stats(p, c).biggest_win.map(|d| Measure {
        value: d.value,
        date: Some(d.date),
    })
}

fn largest_margin(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    b.largest_margin(c)
        .filter(|m| m.winner == Some(p))
        .map(|m| Measure {
            value: m.margin,
            date: Some(m.date),
        })
}

fn heaviest_defeat(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    biggest_win(b, p.other(), c)
}

fn perfect_rounds(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    Some(Measure::count(b.stats(p, c).perfect))
}

fn failed_rounds(b: &PeriodBucket, p: Player, c: Category) -> Option<Measure> {
    Some(Measure::count(b.stats(p, c).failed))
}

fn describe_champion(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Level with {} on {} {} points",
            o.rival,
            format_points(o.mine.value),
            o.cat()
        );
    }
    format!(
        "{} {} points, {} ahead of {} ({})",
        format_points(o.mine.value),
        o.cat(),
        format_points(o.mine.value - o.theirs_value()),
        o.rival,
        format_relative(o.mine.value, o.theirs_value())
    )
}

fn describe_days_won(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Won {} of {} days, same as {}",
            o.mine.value, o.days, o.rival
        );
    }
    format!(
        "Won {} of {} days ({}: {})",
        o.mine.value,
        o.days,
        o.rival,
        o.theirs_value()
    )
}

fn describe_best_day(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Best {} day of {}, matched by {}",
            o.cat(),
            format_points(o.mine.value),
            o.rival
        );
    }
    format!(
        "{}{} ({}'s best: {})",
        format_points(o.mine.value),
        o.on_date(),
        o.rival,
        format_points(o.theirs_value())
    )
}

fn describe_biggest_win(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Biggest win of {}, same as {}",
            format_points(o.mine.value),
            o.rival
        );
    }
    format!(
        "Beat {} by {}{}",
        o.rival,
        format_points(o.mine.value),
        o.on_date()
    )
}

fn describe_largest_margin(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Largest {} margin of {}, same as {}",
            o.cat(),
            format_points(o.mine.value),
            o.rival
        );
    }
    format!(
        "Largest {} margin: beat {} by {}{}",
        o.cat(),
        o.rival,
        format_points(o.mine.value),
        o.on_date()
    )
}

fn describe_perfect(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "{} perfect {} rounds, same as {}",
            o.mine.value,
            o.cat(),
            o.rival
        );
    }
    format!(
        "{} perfect {} rounds ({}: {})",
        o.mine.value,
        o.cat(),
        o.rival,
        o.theirs_value()
    )
}

fn describe_worst_day(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Worst {} day of {}, matched by {}",
            o.cat(),
            format_points(o.mine.value),
            o.rival
        );
    }
    format!(
        "{}{} ({}'s worst: {})",
        format_points(o.mine.value),
        o.on_date(),
        o.rival,
        format_points(o.theirs_value())
    )
}

fn describe_days_lost(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Lost {} of {} days, same as {}",
            o.mine.value, o.days, o.rival
        );
    }
    format!(
        "Lost {} of {} days ({} lost {})",
        o.mine.value,
        o.days,
        o.rival,
        o.theirs_value()
    )
}

fn describe_heaviest_defeat(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "Heaviest defeat of {}, same as {}",
            format_points(o.mine.value),
            o.rival
        );
    }
    format!(
        "Lost to {} by {}{}",
        o.rival,
        format_points(o.mine.value),
        o.on_date()
    )
}

fn describe_failed(o: &Outcome) -> String {
    if o.is_tie {
        return format!(
            "{} failed {} rounds, same as {}",
            o.mine.value,
            o.cat(),
            o.rival
        );
    }
    format!(
        "{} failed {} rounds ({}: {})",
        o.mine.value,
        o.cat(),
        o.rival,
        o.theirs_value()
    )
}

fn fame_rules() -> Vec<AwardRule> {
    let mut rules = Vec::new();
    for category in Category::ALL {
        rules.push(AwardRule {
            key: "champion",
            name: "Champion",
            icon: "\u{1F3C6}",
            category,
            direction: Direction::Higher,
            gold: GoldRule::RelativeMargin,
            skip_zero: true,
            measure: period_sum,
            describe: describe_champion,
        });
        rules.push(AwardRule {
            key: "days_won",
            name: "Wins",
            icon: "\u{1F4C8}",
            category,
            direction: Direction::Higher,
            gold: GoldRule::Dominance,
            skip_zero: true,
            measure: days_won,
            describe: describe_days_won,
        });
        rules.push(AwardRule {
            key: "best_day",
            name: "Best Day",
            icon: "\u{2B50}",
            category,
            direction: Direction::Higher,
            gold: GoldRule::Never,
            skip_zero: true,
            measure: best_day,
            describe: describe_best_day,
        });
        if category == Category::Total {
            rules.push(AwardRule {
                key: "biggest_win",
                name: "Biggest Win",
                icon: "\u{1F4A5}",
                category,
                direction: Direction::Higher,
                gold: GoldRule::Never,
                skip_zero: true,
                measure: biggest_win,
                describe: describe_biggest_win,
            });
        } else {
            rules.push(AwardRule {
                key: "largest_margin",
                name: "Largest Margin",
                icon: "\u{1F4CF}",
                category,
                direction: Direction::Higher,
                gold: GoldRule::Never,
                skip_zero: true,
                measure: largest_margin,
                describe: describe_largest_margin,
            });
            rules.push(AwardRule {
                key: "perfect_rounds",
                name: "Perfect Rounds",
                icon: "\u{1F3AF}",
                category,
                direction: Direction::Higher,
                gold: GoldRule::Never,
                skip_zero: true,
                measure: perfect_rounds,
                describe: describe_perfect,
            });
        }
    }
    rules
}

fn shame_rules() -> Vec<AwardRule> {
    let mut rules = Vec::new();
    for category in Category::ALL {
        rules.push(AwardRule {
            key: "worst_day",
            name: "Worst Day",
            icon: "\u{1F4A9}",
            category,
            direction: Direction::Lower,
            gold: GoldRule::Never,
            skip_zero: false,
            measure: worst_day,
            describe: describe_worst_day,
        });
        rules.push(AwardRule {
            key: "days_lost",
            name: "Losses",
            icon: "\u{1F4C9}",
            category,
            direction: Direction::Higher,
            gold: GoldRule::Never,
            skip_zero: true,
            measure: days_lost,
            describe: describe_days_lost,
        });
        if category == Category::Total {
            rules.push(AwardRule {
                key: "heaviest_defeat",
                name: "Heaviest Defeat",
                icon: "\u{1F94A}",
                category,
                direction: Direction::Higher,
                gold: GoldRule::Never,
                skip_zero: true,
                measure: heaviest_defeat,
                describe: describe_heaviest_defeat,
            });
        } else {
            rules.push(AwardRule {
                key: "failed_rounds",
                name: "Failed Rounds",
                icon: "\u{274C}",
                category,
                direction: Direction::Higher,
                gold: GoldRule::Never,
                skip_zero: true,
                measure: failed_rounds,
                describe: describe_failed,
            });
        }
    }
    rules
}

lazy_static::lazy_static! {
    static ref FAME_RULES: Vec<AwardRule> = fame_rules();
    static ref SHAME_RULES: Vec<AwardRule> = shame_rules();
}

fn rules_for(hall: Hall) -> &'static [AwardRule] {
    match hall {
        Hall::Fame => &FAME_RULES,
        Hall::Shame => &SHAME_RULES,
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Strict comparison; `None` on a tie.
fn decide(direction: Direction, first: f64, second: f64) -> Option<Player> {
    let first_ahead = match direction {
        Direction::Higher => first > second,
        Direction::Lower => first < second,
    };
    let second_ahead = match direction {
        Direction::Higher => second > first,
        Direction::Lower => second < first,
    };
    if first_ahead {
        Some(Player::First)
    } else if second_ahead {
        Some(Player::Second)
    } else {
        None
    }
}

fn make_award(
    rule: &AwardRule,
    bucket: &PeriodBucket,
    description: String,
    is_tie: bool,
    is_gold: bool,
) -> AwardRecord {
    AwardRecord {
        icon: rule.icon.to_string(),
        title: bucket.period.label(),
        name: format!("{} {}", rule.category.label(), rule.name),
        description,
        category: rule.category,
        rule: rule.key,
        period: bucket.period,
        is_tie,
        is_gold,
        is_ongoing: bucket.is_ongoing,
    }
}

/// Evaluate one hall's rules against one bucket, ignoring visibility.
pub fn evaluate_bucket(
    bucket: &PeriodBucket,
    hall: Hall,
    roster: &Roster,
    thresholds: &AwardThresholds,
) -> AwardLists {
    let mut awards = AwardLists::default();

    for rule in rules_for(hall) {
        // Totals-only sheets carry no geography or time data to judge
        if !bucket.has_data(rule.category) {
            continue;
        }
        let first = (rule.measure)(bucket, Player::First, rule.category);
        let second = (rule.measure)(bucket, Player::Second, rule.category);

        let winner = match (first, second) {
            (None, None) => continue,
            (Some(a), Some(b)) => {
                if rule.skip_zero && a.value == 0.0 && b.value == 0.0 {
                    continue;
                }
                decide(rule.direction, a.value, b.value)
            }
            (Some(a), None) => {
                if rule.skip_zero && a.value == 0.0 {
                    continue;
                }
                Some(Player::First)
            }
            (None, Some(b)) => {
                if rule.skip_zero && b.value == 0.0 {
                    continue;
                }
                Some(Player::Second)
            }
        };
        let measure_of = |p: Player| if p == Player::First { first } else { second };

        match winner {
            Some(winner) => {
                let Some(mine) = measure_of(winner) else {
                    continue;
                };
                let theirs = measure_of(winner.other());
                let loser_value = theirs.map(|m| m.value).unwrap_or(0.0);
                let is_gold = match rule.gold {
                    GoldRule::RelativeMargin => thresholds.is_gold_margin(mine.value, loser_value),
                    GoldRule::Dominance => thresholds.is_dominant(mine.value as u32, bucket.days),
                    GoldRule::Never => false,
                };
                let description = (rule.describe)(&Outcome {
                    rival: roster.name(winner.other()),
                    mine,
                    theirs,
                    days: bucket.days,
                    category: rule.category,
                    is_tie: false,
                });
                awards.push(winner, make_award(rule, bucket, description, false, is_gold));
            }
            None => {
                for player in Player::BOTH {
                    let Some(mine) = measure_of(player) else {
                        continue;
                    };
                    let description = (rule.describe)(&Outcome {
                        rival: roster.name(player.other()),
                        mine,
                        theirs: measure_of(player.other()),
                        days: bucket.days,
                        category: rule.category,
                        is_tie: true,
                    });
                    awards.push(player, make_award(rule, bucket, description, true, false));
                }
            }
        }
    }

    awards
}

/// Evaluate a hall over all visible buckets, ordered year -> quarter ->
/// month and newest first within each kind.
pub fn evaluate_hall(
    buckets: &[PeriodBucket],
    hall: Hall,
    roster: &Roster,
    thresholds: &AwardThresholds,
) -> AwardLists {
    let mut visible: Vec<&PeriodBucket> = buckets.iter().filter(|b| b.is_visible()).collect();
    visible.sort_by_key(|b| (b.period.kind, Reverse((b.period.year, b.period.index))));

    let mut awards = AwardLists::default();
    for bucket in visible {
        awards.extend(evaluate_bucket(bucket, hall, roster, thresholds));
    }
    log::debug!(
        "{}: {} awards from {} buckets",
        hall.title(),
        awards.len(),
        buckets.len()
    );
    awards
}

pub fn hall_of_fame(
    buckets: &[PeriodBucket],
    roster: &Roster,
    thresholds: &AwardThresholds,
) -> AwardLists {
    evaluate_hall(buckets, Hall::Fame, roster, thresholds)
}

pub fn hall_of_shame(
    buckets: &[PeriodBucket],
    roster: &Roster,
    thresholds: &AwardThresholds,
) -> AwardLists {
    evaluate_hall(buckets, Hall::Shame, roster, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::{DailyRecord, PlayerDay};
    use crate::periods::{bucket_all, bucket_daily, PeriodKind};

    fn day(m: u32, d: u32, first: f64, second: f64) -> DailyRecord {
        let pd = |total: f64| PlayerDay {
            total,
            geography: total * 0.6,
            time: total * 0.4,
            rounds: 5,
            geography_rounds: 5,
            time_rounds: 5,
            ..Default::default()
        };
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, m, d).unwrap(),
            day: 0,
            players: [pd(first), pd(second)],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    fn find<'a>(list: &'a [AwardRecord], rule: &str, category: Category) -> Option<&'a AwardRecord> {
        list.iter().find(|a| a.rule == rule && a.category == category)
    }

    #[test]
    fn test_tie_then_narrow_win() {
        let days = vec![day(3, 1, 40000.0, 40000.0), day(3, 2, 45000.0, 42000.0)];
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        let roster = Roster::default();
        let awards = evaluate_bucket(bucket, Hall::Fame, &roster, &AwardThresholds::default());

        let michael = awards.for_player(Player::First);
        let sarah = awards.for_player(Player::Second);

        let wins = find(michael, "days_won", Category::Total).unwrap();
        assert_eq!(wins.name, "Total Wins");
        assert!(!wins.is_gold);
        assert!(!wins.is_tie);
        assert_eq!(wins.description, "Won 1 of 2 days (Sarah: 0)");
        assert!(find(sarah, "days_won", Category::Total).is_none());

        let champion = find(michael, "champion", Category::Total).unwrap();
        assert!(!champion.is_gold);
        assert_eq!(champion.title, "March 2024");
        assert_eq!(
            champion.description,
            "85,000 total points, 3,000 ahead of Sarah (+3.7%)"
        );

        // Both players' best days are 45,000 vs 42,000
        assert!(find(michael, "best_day", Category::Total).is_some());
    }

    #[test]
    fn test_tie_awarded_to_both_with_mirrored_text() {
        let days = vec![day(4, 1, 40000.0, 41000.0), day(4, 2, 41000.0, 40000.0)];
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        let roster = Roster::default();
        let awards = evaluate_bucket(bucket, Hall::Fame, &roster, &AwardThresholds::default());

        let m = find(awards.for_player(Player::First), "champion", Category::Total).unwrap();
        let s = find(awards.for_player(Player::Second), "champion", Category::Total).unwrap();
        assert!(m.is_tie && s.is_tie);
        assert!(!m.is_gold && !s.is_gold);
        assert_eq!(
            m.description.replace("Sarah", "RIVAL"),
            s.description.replace("Michael", "RIVAL")
        );
    }

    #[test]
    fn test_gold_margin_boundary() {
        let t = AwardThresholds::default();
        assert!(t.is_gold_margin(110.0, 100.0));
        assert!(!t.is_gold_margin(109.9, 100.0));
        assert!(t.is_gold_margin(1.0, 0.0));
        assert!(!t.is_gold_margin(0.0, 0.0));

        let days = vec![day(5, 1, 44000.0, 40000.0), day(5, 2, 44000.0, 40000.0)];
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        let awards = evaluate_bucket(bucket, Hall::Fame, &Roster::default(), &t);
        let champion = find(awards.for_player(Player::First), "champion", Category::Total).unwrap();
        assert!(champion.is_gold);
        // Two of two days is dominant
        let wins = find(awards.for_player(Player::First), "days_won", Category::Total).unwrap();
        assert!(wins.is_gold);
    }

    #[test]
    fn test_dominance_share() {
        let t = AwardThresholds::default();
        assert!(t.is_dominant(2, 3));
        assert!(!t.is_dominant(1, 2));
        assert!(t.is_dominant(20, 30));
        assert!(!t.is_dominant(19, 30));
        assert!(!t.is_dominant(0, 0));
    }

    #[test]
    fn test_shame_worst_day_goes_to_lower_score() {
        let days = vec![day(6, 1, 20000.0, 30000.0), day(6, 2, 45000.0, 31000.0)];
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        let awards = evaluate_bucket(bucket, Hall::Shame, &Roster::default(), &AwardThresholds::default());

        let worst = find(awards.for_player(Player::First), "worst_day", Category::Total).unwrap();
        assert_eq!(worst.description, "20,000 on Jun 1, 2024 (Sarah's worst: 30,000)");
        assert!(!worst.is_gold);

        let defeat = find(awards.for_player(Player::Second), "heaviest_defeat", Category::Total).unwrap();
        assert_eq!(defeat.description, "Lost to Michael by 14,000 on Jun 2, 2024");
        // No failed rounds recorded, so those rules are skipped
        assert!(find(awards.for_player(Player::First), "failed_rounds", Category::Time).is_none());
    }

    #[test]
    fn test_largest_margin_per_category() {
        // Geography is 60% of the total: gaps of 2,400 and 6,000
        let days = vec![day(7, 1, 40000.0, 36000.0), day(7, 2, 30000.0, 40000.0)];
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        let awards = evaluate_bucket(bucket, Hall::Fame, &Roster::default(), &AwardThresholds::default());

        let geo = find(awards.for_player(Player::Second), "largest_margin", Category::Geography).unwrap();
        assert_eq!(geo.name, "Geography Largest Margin");
        assert_eq!(geo.description, "Largest geography margin: beat Michael by 6,000 on Jul 2, 2024");
        assert!(!geo.is_tie);
        assert!(find(awards.for_player(Player::First), "largest_margin", Category::Geography).is_none());
        // Total keeps its own biggest-win rule
        assert!(find(awards.for_player(Player::Second), "largest_margin", Category::Total).is_none());
    }

    #[test]
    fn test_no_sub_category_awards_without_data() {
        let mut days = vec![day(8, 1, 40000.0, 40000.0), day(8, 2, 45000.0, 42000.0)];
        for d in days.iter_mut() {
            for pd in d.players.iter_mut() {
                pd.geography = 0.0;
                pd.time = 0.0;
                pd.geography_rounds = 0;
                pd.time_rounds = 0;
            }
        }
        let bucket = &bucket_daily(&days, PeriodKind::Month, today())[0];
        for hall in [Hall::Fame, Hall::Shame] {
            let awards = evaluate_bucket(bucket, hall, &Roster::default(), &AwardThresholds::default());
            assert!(Player::BOTH
                .iter()
                .flat_map(|p| awards.for_player(*p))
                .all(|a| a.category == Category::Total));
        }
    }

    #[test]
    fn test_rule_table_sizes() {
        assert_eq!(rules_for(Hall::Fame).len(), 14);
        assert_eq!(rules_for(Hall::Shame).len(), 9);
    }

    #[test]
    fn test_hidden_year_produces_no_awards() {
        // Single quarter: the year bucket stays hidden
        let days = vec![day(1, 10, 45000.0, 30000.0), day(2, 10, 45000.0, 30000.0)];
        let buckets = bucket_all(&days, today());
        let awards = hall_of_fame(&buckets, &Roster::default(), &AwardThresholds::default());
        let michael = awards.for_player(Player::First);
        assert!(michael.iter().all(|a| a.period.kind != PeriodKind::Year));
        assert!(michael.iter().any(|a| a.period.kind == PeriodKind::Quarter));

        // Second quarter makes the year visible
        let mut days = days;
        days.push(day(4, 10, 45000.0, 30000.0));
        let buckets = bucket_all(&days, today());
        let awards = hall_of_fame(&buckets, &Roster::default(), &AwardThresholds::default());
        let first = &awards.for_player(Player::First)[0];
        assert_eq!(first.period.kind, PeriodKind::Year);
    }

    #[test]
    fn test_deterministic_output() {
        let days = vec![
            day(1, 3, 41000.0, 38000.0),
            day(2, 3, 36000.0, 39000.0),
            day(4, 3, 40000.0, 40000.0),
        ];
        let run = || {
            let buckets = bucket_all(&days, today());
            hall_of_fame(&buckets, &Roster::default(), &AwardThresholds::default())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_months_newest_first() {
        let days = vec![day(1, 3, 41000.0, 38000.0), day(2, 3, 42000.0, 38000.0)];
        let buckets = bucket_daily(&days, PeriodKind::Month, today());
        let awards = hall_of_fame(&buckets, &Roster::default(), &AwardThresholds::default());
        assert_eq!(awards.for_player(Player::First)[0].title, "February 2024");
    }
}
