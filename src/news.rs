//! News page: streaks, lead flips, personal bests and milestones
//!
//! A single chronological pass over the daily records. The only state kept
//! between days is the active streak, each player's longest streak so far,
//! the rolling score-difference windows and running personal bests.

use crate::daily::DailyRecord;
use crate::render::{format_date, format_points};
use crate::rounds::{Category, Player, Roster};
use chrono::NaiveDate;

/// Shortest streak that makes the news when it ends or sets a record.
pub const MIN_REPORTED_STREAK: u32 = 3;

/// Rolling windows (in games) watched for lead changes.
pub const LEAD_WINDOWS: [usize; 2] = [5, 10];

pub const GAMES_MILESTONE: u32 = 100;
pub const WINS_MILESTONE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsConfig {
    pub min_streak: u32,
    pub lead_windows: [usize; 2],
    pub games_milestone: u32,
    pub wins_milestone: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        NewsConfig {
            min_streak: MIN_REPORTED_STREAK,
            lead_windows: LEAD_WINDOWS,
            games_milestone: GAMES_MILESTONE,
            wins_milestone: WINS_MILESTONE,
        }
    }
}

/// A run of consecutive days won by one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub player: Player,
    pub length: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewsEvent {
    /// A reportable streak ended; `broken_by` is `None` when a tie ended it
    StreakBroken {
        date: NaiveDate,
        player: Player,
        length: u32,
        broken_by: Option<Player>,
    },
    /// The active streak matched or beat the player's longest
    StreakRecord {
        date: NaiveDate,
        player: Player,
        length: u32,
        matched: bool,
    },
    /// The rolling average difference changed sign
    LeadFlip {
        date: NaiveDate,
        window: usize,
        leader: Player,
        average: f64,
    },
    PersonalBest {
        date: NaiveDate,
        player: Player,
        score: f64,
        previous: f64,
    },
    GamesMilestone {
        date: NaiveDate,
        games: u32,
    },
    WinsMilestone {
        date: NaiveDate,
        player: Player,
        wins: u32,
    },
}

impl NewsEvent {
    pub fn date(&self) -> NaiveDate {
        match self {
            NewsEvent::StreakBroken { date, .. }
            | NewsEvent::StreakRecord { date, .. }
            | NewsEvent::LeadFlip { date, .. }
            | NewsEvent::PersonalBest { date, .. }
            | NewsEvent::GamesMilestone { date, .. }
            | NewsEvent::WinsMilestone { date, .. } => *date,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NewsEvent::StreakBroken { .. } => "\u{1F494}",
            NewsEvent::StreakRecord { .. } => "\u{1F525}",
            NewsEvent::LeadFlip { .. } => "\u{1F504}",
            NewsEvent::PersonalBest { .. } => "\u{1F947}",
            NewsEvent::GamesMilestone { .. } | NewsEvent::WinsMilestone { .. } => "\u{1F389}",
        }
    }

    pub fn headline(&self, roster: &Roster, category: Category) -> String {
        let cat = match category {
            Category::Total => String::new(),
            other => format!(" {}", other.label().to_lowercase()),
        };
        match self {
            NewsEvent::StreakBroken {
                player,
                length,
                broken_by: Some(by),
                ..
            } => format!(
                "{} snapped {}'s {}-day{} winning streak",
                roster.name(*by),
                roster.name(*player),
                length,
                cat
            ),
            NewsEvent::StreakBroken {
                player,
                length,
                broken_by: None,
                ..
            } => format!(
                "A tie ended {}'s {}-day{} winning streak",
                roster.name(*player),
                length,
                cat
            ),
            NewsEvent::StreakRecord {
                player,
                length,
                matched: true,
                ..
            } => format!(
                "{} matched their longest{} winning streak: {} days",
                roster.name(*player),
                cat,
                length
            ),
            NewsEvent::StreakRecord { player, length, .. } => format!(
                "{} set a new longest{} winning streak: {} days",
                roster.name(*player),
                cat,
                length
            ),
            NewsEvent::LeadFlip {
                window,
                leader,
                average,
                ..
            } => format!(
                "{} takes the {}-game{} lead (average margin {})",
                roster.name(*leader),
                window,
                cat,
                format_points(average.abs())
            ),
            NewsEvent::PersonalBest {
                player,
                score,
                previous,
                ..
            } => format!(
                "{} set a{} personal best of {} (previous {})",
                roster.name(*player),
                cat,
                format_points(*score),
                format_points(*previous)
            ),
            NewsEvent::GamesMilestone { games, .. } => {
                format!("{} games played head to head", games)
            }
            NewsEvent::WinsMilestone { player, wins, .. } => {
                format!("{} reached {}{} wins", roster.name(*player), wins, cat)
            }
        }
    }
}

// ============================================================================
// Streak tracker
// ============================================================================

/// Incremental streak state. Feed one day at a time in date order.
#[derive(Debug, Clone)]
pub struct StreakTracker {
    current: Option<Streak>,
    best: [u32; 2],
    /// The active player's longest streak before the current one began
    best_at_start: u32,
    min_streak: u32,
}

impl StreakTracker {
    pub fn new(min_streak: u32) -> Self {
        StreakTracker {
            current: None,
            best: [0; 2],
            best_at_start: 0,
            min_streak: min_streak.max(1),
        }
    }

    pub fn current(&self) -> Option<Streak> {
        self.current
    }

    pub fn best(&self, player: Player) -> u32 {
        self.best[player.index()]
    }

    /// Record one day's winner (`None` for a tie) and return any events.
    pub fn push(&mut self, date: NaiveDate, winner: Option<Player>) -> Vec<NewsEvent> {
        let mut events = Vec::new();

        let extends = matches!((self.current, winner), (Some(s), Some(w)) if s.player == w);
        if extends {
            if let Some(streak) = self.current.as_mut() {
                streak.length += 1;
                streak.end = date;
            }
        } else {
            if let Some(ended) = self.current.take() {
                if ended.length >= self.min_streak {
                    events.push(NewsEvent::StreakBroken {
                        date,
                        player: ended.player,
                        length: ended.length,
                        broken_by: winner,
                    });
                }
            }
            self.current = winner.map(|w| Streak {
                player: w,
                length: 1,
                start: date,
                end: date,
            });
            self.best_at_start = winner.map(|w| self.best[w.index()]).unwrap_or(0);
        }

        if let Some(streak) = self.current {
            let previous = self.best_at_start;
            if previous >= self.min_streak && streak.length == previous {
                events.push(NewsEvent::StreakRecord {
                    date,
                    player: streak.player,
                    length: streak.length,
                    matched: true,
                });
            } else if streak.length == (previous + 1).max(self.min_streak) {
                events.push(NewsEvent::StreakRecord {
                    date,
                    player: streak.player,
                    length: streak.length,
                    matched: false,
                });
            }
            let best = &mut self.best[streak.player.index()];
            *best = (*best).max(streak.length);
        }

        events
    }
}

// ============================================================================
// Detection
// ============================================================================

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Scan daily records for news in one category. Events come out in date order.
pub fn detect_news(days: &[DailyRecord], category: Category, config: &NewsConfig) -> Vec<NewsEvent> {
    let mut ordered: Vec<&DailyRecord> = days.iter().collect();
    ordered.sort_by_key(|d| d.date);

    let mut events = Vec::new();
    let mut tracker = StreakTracker::new(config.min_streak);
    let mut diffs: Vec<f64> = Vec::with_capacity(ordered.len());
    let mut lead_sign = [0i8; 2];
    let mut personal_best: [Option<f64>; 2] = [None; 2];
    let mut wins = [0u32; 2];

    for (i, day) in ordered.iter().enumerate() {
        let winner = day.winner(category);
        events.extend(tracker.push(day.date, winner));

        diffs.push(day.margin(category));
        for (slot, &window) in config.lead_windows.iter().enumerate() {
            if window == 0 || diffs.len() < window {
                continue;
            }
            let average = diffs[diffs.len() - window..].iter().sum::<f64>() / window as f64;
            let s = sign(average);
            if s == 0 {
                continue;
            }
            if lead_sign[slot] != 0 && s != lead_sign[slot] {
                events.push(NewsEvent::LeadFlip {
                    date: day.date,
                    window,
                    leader: if s > 0 { Player::First } else { Player::Second },
                    average,
                });
            }
            lead_sign[slot] = s;
        }

        for player in Player::BOTH {
            let score = day.score(player, category);
            let best = &mut personal_best[player.index()];
            match *best {
                Some(previous) if score > previous => {
                    events.push(NewsEvent::PersonalBest {
                        date: day.date,
                        player,
                        score,
                        previous,
                    });
                    *best = Some(score);
                }
                None => *best = Some(score),
                _ => {}
            }
        }

        let games = (i + 1) as u32;
        if config.games_milestone > 0 && games % config.games_milestone == 0 {
            events.push(NewsEvent::GamesMilestone {
                date: day.date,
                games,
            });
        }
        if let Some(w) = winner {
            wins[w.index()] += 1;
            let count = wins[w.index()];
            if config.wins_milestone > 0 && count % config.wins_milestone == 0 {
                events.push(NewsEvent::WinsMilestone {
                    date: day.date,
                    player: w,
                    wins: count,
                });
            }
        }
    }

    events
}

/// The most recent `limit` events, newest first.
pub fn latest_news(events: &[NewsEvent], limit: usize) -> Vec<&NewsEvent> {
    events.iter().rev().take(limit).collect()
}

/// Every maximal winning run in date order. Ties end a run.
pub fn streaks(days: &[DailyRecord], category: Category) -> Vec<Streak> {
    let mut ordered: Vec<&DailyRecord> = days.iter().collect();
    ordered.sort_by_key(|d| d.date);

    let mut runs = Vec::new();
    let mut current: Option<Streak> = None;
    for day in ordered {
        let winner = day.winner(category);
        match current.as_mut() {
            Some(run) if Some(run.player) == winner => {
                run.length += 1;
                run.end = day.date;
            }
            _ => {
                runs.extend(current.take());
                current = winner.map(|w| Streak {
                    player: w,
                    length: 1,
                    start: day.date,
                    end: day.date,
                });
            }
        }
    }
    runs.extend(current);
    runs
}

/// A player's longest run. Equal lengths resolve to the later run.
pub fn longest_streak(days: &[DailyRecord], category: Category, player: Player) -> Option<Streak> {
    streaks(days, category)
        .into_iter()
        .filter(|s| s.player == player)
        .max_by_key(|s| s.length)
}

/// Trailing mean over `window` values; `None` until the window is full.
pub fn rolling_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Overall head-to-head numbers for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadToHead {
    pub category: Category,
    pub days: u32,
    pub wins: [u32; 2],
    pub ties: u32,
    pub averages: [f64; 2],
    pub best: [f64; 2],
    pub current: Option<Streak>,
    pub longest: [Option<Streak>; 2],
}

pub fn head_to_head(days: &[DailyRecord], category: Category) -> HeadToHead {
    let mut wins = [0u32; 2];
    let mut ties = 0u32;
    let mut sums = [0.0f64; 2];
    let mut best = [0.0f64; 2];

    for day in days {
        match day.winner(category) {
            Some(w) => wins[w.index()] += 1,
            None => ties += 1,
        }
        for player in Player::BOTH {
            let score = day.score(player, category);
            sums[player.index()] += score;
            best[player.index()] = best[player.index()].max(score);
        }
    }

    let n = days.len();
    let average = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };
    let runs = streaks(days, category);
    let longest = Player::BOTH.map(|p| {
        runs.iter()
            .filter(|s| s.player == p)
            .max_by_key(|s| s.length)
            .copied()
    });

    // The last run is only current if the latest day wasn't a tie
    let last_date = days.iter().map(|d| d.date).max();
    let current = runs.last().copied().filter(|s| Some(s.end) == last_date);

    HeadToHead {
        category,
        days: n as u32,
        wins,
        ties,
        averages: [average(sums[0]), average(sums[1])],
        best,
        current,
        longest,
    }
}

impl HeadToHead {
    pub fn describe_current(&self, roster: &Roster) -> String {
        match self.current {
            Some(s) => format!(
                "{} has won {} in a row (since {})",
                roster.name(s.player),
                s.length,
                format_date(s.start)
            ),
            None => "No active streak".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::PlayerDay;

    fn date(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n as u64)
    }

    fn day(n: u32, first: f64, second: f64) -> DailyRecord {
        let pd = |total: f64| PlayerDay {
            total,
            ..Default::default()
        };
        DailyRecord {
            date: date(n),
            day: n,
            players: [pd(first), pd(second)],
        }
    }

    /// `'A'` first wins, `'B'` second wins, `'='` tie.
    fn series(pattern: &str) -> Vec<DailyRecord> {
        pattern
            .chars()
            .enumerate()
            .map(|(i, c)| match c {
                'A' => day(i as u32, 40000.0, 30000.0),
                'B' => day(i as u32, 30000.0, 40000.0),
                _ => day(i as u32, 35000.0, 35000.0),
            })
            .collect()
    }

    #[test]
    fn test_streak_length_counts_consecutive_wins() {
        let mut tracker = StreakTracker::new(3);
        for k in 1..=6u32 {
            tracker.push(date(k), Some(Player::Second));
            let current = tracker.current().unwrap();
            assert_eq!(current.player, Player::Second);
            assert_eq!(current.length, k);
        }
        assert_eq!(tracker.best(Player::Second), 6);
    }

    #[test]
    fn test_tie_resets_without_credit() {
        let mut tracker = StreakTracker::new(2);
        tracker.push(date(1), Some(Player::First));
        tracker.push(date(2), Some(Player::First));
        let events = tracker.push(date(3), None);
        assert!(tracker.current().is_none());
        assert_eq!(tracker.best(Player::Second), 0);
        assert_eq!(
            events,
            vec![NewsEvent::StreakBroken {
                date: date(3),
                player: Player::First,
                length: 2,
                broken_by: None,
            }]
        );
    }

    #[test]
    fn test_record_set_then_matched() {
        let days = series("AAAB=AAA");
        let events = detect_news(&days, Category::Total, &NewsConfig::default());
        let records: Vec<(u32, bool)> = events
            .iter()
            .filter_map(|e| match e {
                NewsEvent::StreakRecord { length, matched, .. } => Some((*length, *matched)),
                _ => None,
            })
            .collect();
        assert_eq!(records, vec![(3, false), (3, true)]);

        let broken: Vec<&NewsEvent> = events
            .iter()
            .filter(|e| matches!(e, NewsEvent::StreakBroken { .. }))
            .collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].date(), date(3));
    }

    #[test]
    fn test_short_streaks_stay_quiet() {
        let days = series("ABABAB");
        let events = detect_news(&days, Category::Total, &NewsConfig::default());
        assert!(events
            .iter()
            .all(|e| !matches!(e, NewsEvent::StreakBroken { .. } | NewsEvent::StreakRecord { .. })));
    }

    #[test]
    fn test_lead_flip_on_full_window() {
        let config = NewsConfig {
            lead_windows: [5, 0],
            ..Default::default()
        };
        // A leads the 5-game average, then B wins enough to take over
        let days = series("AAAAABBBBBB");
        let events = detect_news(&days, Category::Total, &config);
        let flips: Vec<&NewsEvent> = events
            .iter()
            .filter(|e| matches!(e, NewsEvent::LeadFlip { .. }))
            .collect();
        assert_eq!(flips.len(), 1);
        match flips[0] {
            NewsEvent::LeadFlip { leader, window, date: d, .. } => {
                assert_eq!(*leader, Player::Second);
                assert_eq!(*window, 5);
                assert_eq!(*d, date(7));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_insufficient_data_no_flip() {
        let days = series("ABAB");
        let events = detect_news(&days, Category::Total, &NewsConfig::default());
        assert!(!events.iter().any(|e| matches!(e, NewsEvent::LeadFlip { .. })));
    }

    #[test]
    fn test_personal_best_and_milestones() {
        let config = NewsConfig {
            games_milestone: 2,
            wins_milestone: 2,
            ..Default::default()
        };
        let days = vec![day(0, 30000.0, 20000.0), day(1, 35000.0, 10000.0)];
        let events = detect_news(&days, Category::Total, &config);
        assert!(events.contains(&NewsEvent::PersonalBest {
            date: date(1),
            player: Player::First,
            score: 35000.0,
            previous: 30000.0,
        }));
        assert!(events.contains(&NewsEvent::GamesMilestone {
            date: date(1),
            games: 2
        }));
        assert!(events.contains(&NewsEvent::WinsMilestone {
            date: date(1),
            player: Player::First,
            wins: 2
        }));
    }

    #[test]
    fn test_longest_streak_prefers_later_run() {
        let days = series("AAB=AAB");
        let longest = longest_streak(&days, Category::Total, Player::First).unwrap();
        assert_eq!(longest.length, 2);
        assert_eq!(longest.start, date(4));
    }

    #[test]
    fn test_rolling_average() {
        let avg = rolling_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(avg, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert_eq!(rolling_average(&[1.0], 0), vec![None]);
    }

    #[test]
    fn test_head_to_head() {
        let days = series("AB=AA");
        let h2h = head_to_head(&days, Category::Total);
        assert_eq!(h2h.wins, [3, 1]);
        assert_eq!(h2h.ties, 1);
        assert_eq!(h2h.wins[0] + h2h.wins[1] + h2h.ties, h2h.days);
        assert_eq!(h2h.current.unwrap().length, 2);

        let ended_on_tie = series("AA=");
        assert!(head_to_head(&ended_on_tie, Category::Total).current.is_none());
    }

    #[test]
    fn test_headlines() {
        let roster = Roster::default();
        let event = NewsEvent::StreakBroken {
            date: date(1),
            player: Player::First,
            length: 4,
            broken_by: Some(Player::Second),
        };
        assert_eq!(
            event.headline(&roster, Category::Total),
            "Sarah snapped Michael's 4-day winning streak"
        );
        assert_eq!(
            event.headline(&roster, Category::Time),
            "Sarah snapped Michael's 4-day time winning streak"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_news(&[], Category::Total, &NewsConfig::default()).is_empty());
        assert!(streaks(&[], Category::Total).is_empty());
    }
}
