//! Share-text parsing
//!
//! Timeguessr's "share" button produces a header line with the day number
//! and total, followed by one line per round of colored squares:
//!
//! ```text
//! TimeGuessr #268 41,133/50,000
//! 🌎🟩🟨⬛ 📅🟩🟩🟨
//! ...
//! ```
//!
//! The squares are the coarse score patterns stored in the raw-score CSV.
//! Players without emoji keyboards can type the same thing as `OO% OOX`.

use crate::rounds::{parse_number, MAX_DAY_SCORE, ROUNDS_PER_DAY};
use regex::Regex;

lazy_static::lazy_static! {
    static ref HEADER: Regex =
        Regex::new(r"(?i)time\s*guessr\s*#\s*(\d+)\s+([\d,]+)\s*/\s*([\d,]+)").unwrap();
    static ref ASCII_ROUND: Regex = Regex::new(r"^[OX%][OX%\s]*$").unwrap();
}

/// Geography and time patterns for one round, each three of `O`, `%`, `X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPattern {
    pub geography: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareResult {
    pub day: u32,
    pub total: f64,
    pub rounds: Vec<RoundPattern>,
}

impl ShareResult {
    /// Space-joined geography patterns, as stored in the raw-score CSV.
    pub fn geography_patterns(&self) -> String {
        self.rounds
            .iter()
            .map(|r| r.geography.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn time_patterns(&self) -> String {
        self.rounds
            .iter()
            .map(|r| r.time.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn mark(c: char) -> Option<char> {
    match c {
        '\u{1F7E9}' | 'O' => Some('O'),
        '\u{1F7E8}' | '%' => Some('%'),
        '\u{2B1B}' | '\u{2B1C}' | 'X' => Some('X'),
        _ => None,
    }
}

/// Emoji rounds carry the globe/calendar markers or colored squares; typed
/// rounds are nothing but `O`, `%`, `X` and spaces.
fn is_round_line(line: &str) -> bool {
    line.chars().any(|c| {
        matches!(
            c,
            '\u{1F30E}' | '\u{1F4C5}' | '\u{1F7E9}' | '\u{1F7E8}' | '\u{2B1B}' | '\u{2B1C}'
        )
    }) || ASCII_ROUND.is_match(line)
}

fn marks(line: &str) -> String {
    line.chars()
        .filter(|c| *c != '\u{FE0F}')
        .filter_map(mark)
        .collect()
}

/// Parse pasted share text into day, total and per-round patterns.
pub fn parse_share_text(text: &str) -> Result<ShareResult, String> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines
        .by_ref()
        .find(|l| HEADER.is_match(l))
        .ok_or_else(|| "No 'TimeGuessr #<day> <score>/50,000' line found".to_string())?;
    let caps = HEADER
        .captures(header)
        .ok_or_else(|| format!("Unreadable header: {}", header))?;

    let day: u32 = caps[1]
        .parse()
        .map_err(|_| format!("Invalid day number: {}", &caps[1]))?;
    if day == 0 {
        return Err("Day number must be positive".to_string());
    }
    let total = parse_number(&caps[2]).ok_or_else(|| format!("Invalid score: {}", &caps[2]))?;
    let out_of = parse_number(&caps[3]).unwrap_or(0.0);
    if out_of != MAX_DAY_SCORE {
        return Err(format!(
            "Score must be out of {}, got {}",
            MAX_DAY_SCORE, &caps[3]
        ));
    }
    if total > MAX_DAY_SCORE {
        return Err(format!("Score {} exceeds {}", total, MAX_DAY_SCORE));
    }

    let mut rounds = Vec::new();
    for line in lines.filter(|l| is_round_line(l)) {
        let m = marks(line);
        if m.chars().count() != 6 {
            return Err(format!(
                "Round {}: expected 3 geography and 3 time marks, got '{}'",
                rounds.len() + 1,
                line
            ));
        }
        let (geography, time) = m.split_at(3);
        rounds.push(RoundPattern {
            geography: geography.to_string(),
            time: time.to_string(),
        });
    }

    if rounds.len() != ROUNDS_PER_DAY as usize {
        return Err(format!(
            "Expected {} rounds, found {}",
            ROUNDS_PER_DAY,
            rounds.len()
        ));
    }

    Ok(ShareResult { day, total, rounds })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMOJI: &str = "TimeGuessr #268 41,133/50,000
🌎🟩🟨⬛ 📅🟩🟩🟨
🌎🟩🟩🟩 📅🟩🟩🟩
🌎🟨⬛️⬛️ 📅🟩🟨⬛️
🌎🟩🟩🟨 📅⬛️⬛️⬛️
🌎🟩🟩🟩 📅🟩🟩🟩
https://timeguessr.com";

    #[test]
    fn test_emoji_share_text() {
        let result = parse_share_text(EMOJI).unwrap();
        assert_eq!(result.day, 268);
        assert_eq!(result.total, 41133.0);
        assert_eq!(result.rounds.len(), 5);
        assert_eq!(result.rounds[0].geography, "O%X");
        assert_eq!(result.rounds[0].time, "OO%");
        assert_eq!(result.rounds[2].geography, "%XX");
        assert_eq!(result.geography_patterns(), "O%X OOO %XX OO% OOO");
        assert_eq!(result.time_patterns(), "OO% OOO O%X XXX OOO");
    }

    #[test]
    fn test_ascii_share_text() {
        let text = "timeguessr #12 30000/50000\nOOO XXX\nO%X %%%\nXXX XXX\nOOO OOO\n%%% OOX\n";
        let result = parse_share_text(text).unwrap();
        assert_eq!(result.day, 12);
        assert_eq!(result.total, 30000.0);
        assert_eq!(result.rounds[4].time, "OOX");
    }

    #[test]
    fn test_footer_text_is_not_a_round() {
        let text = "TimeGuessr #12 30,000/50,000\nOOO XXX\nO%X %%%\nXXX XXX\nOOO OOO\n%%% OOX\nPLAY AT TIMEGUESSR.COM\n";
        let result = parse_share_text(text).unwrap();
        assert_eq!(result.rounds.len(), 5);

        let emoji = format!("{}\nCAN YOU BEAT MY SCORE? XOXO", EMOJI);
        assert_eq!(parse_share_text(&emoji).unwrap().rounds.len(), 5);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_share_text("hello").is_err());
        assert!(parse_share_text("TimeGuessr #5 50,001/50,000\nOOO OOO").is_err());
        // Four rounds
        let short = "TimeGuessr #5 20,000/50,000\nOOO OOO\nOOO OOO\nOOO OOO\nOOO OOO";
        assert!(parse_share_text(short).unwrap_err().contains("Expected 5 rounds"));
        // Half a round
        let partial = "TimeGuessr #5 20,000/50,000\nOOO OO";
        assert!(parse_share_text(partial).unwrap_err().contains("Round 1"));
    }
}
