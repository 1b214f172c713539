//! Rendering: number formatting, text reports, HTML fragments and charts
//!
//! Text reports are fixed-width tables for the terminal and the GUI's
//! monospace panes. HTML output is self-contained; chart specifications are
//! Vega-Lite JSON so the dashboard page can hand them to vega-embed.

use crate::awards::{AwardLists, AwardRecord, Hall};
use crate::daily::DailyRecord;
use crate::news::{rolling_average, HeadToHead, NewsEvent};
use crate::rounds::{Category, Player, Roster};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;

// ============================================================================
// Formatting helpers
// ============================================================================

/// Round to whole points and group thousands: `45000.4` -> `"45,000"`.
pub fn format_points(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Relative margin of `winner` over `loser` as a signed percentage.
pub fn format_relative(winner: f64, loser: f64) -> String {
    if loser == 0.0 {
        "n/a".to_string()
    } else {
        format!("{:+.1}%", (winner - loser) / loser * 100.0)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}~", cut)
    }
}

fn award_flags(award: &AwardRecord) -> String {
    let mut flags = Vec::new();
    if award.is_gold {
        flags.push("GOLD");
    }
    if award.is_tie {
        flags.push("TIE");
    }
    if award.is_ongoing {
        flags.push("ONGOING");
    }
    flags.join(",")
}

// ============================================================================
// Text reports
// ============================================================================

/// Fixed-width listing of a hall's awards, one section per player.
pub fn awards_text(hall: Hall, roster: &Roster, awards: &AwardLists) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^100}", format!(" {} ", hall.title()))?;

    for player in Player::BOTH {
        let list = awards.for_player(player);
        writeln!(
            out,
            "\n{} ({} award{})",
            roster.name(player),
            list.len(),
            if list.len() == 1 { "" } else { "s" }
        )?;
        writeln!(out, "{:-<100}", "")?;
        if list.is_empty() {
            writeln!(out, "  (none)")?;
            continue;
        }
        writeln!(
            out,
            "{:<16} {:<26} {:<16} {}",
            "Period", "Award", "Flags", "Details"
        )?;
        for award in list {
            writeln!(
                out,
                "{:<16} {:<26} {:<16} {}",
                truncate(&award.title, 16),
                truncate(&award.name, 26),
                award_flags(award),
                award.description
            )?;
        }
    }

    writeln!(out, "\n{:=^100}", "")?;
    Ok(out)
}

/// Newest-first news listing.
pub fn news_text(
    events: &[&NewsEvent],
    roster: &Roster,
    category: Category,
) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^80}", format!(" {} News ", category.label()))?;
    if events.is_empty() {
        writeln!(out, "Nothing to report yet.")?;
    }
    for event in events {
        writeln!(
            out,
            "{:<14} {}",
            format_date(event.date()),
            event.headline(roster, category)
        )?;
    }
    writeln!(out, "{:=^80}", "")?;
    Ok(out)
}

/// Head-to-head table across categories.
pub fn summary_text(summaries: &[HeadToHead], roster: &Roster) -> Result<String> {
    let first = roster.name(Player::First);
    let second = roster.name(Player::Second);

    let mut out = String::new();
    writeln!(out, "{:=^80}", " Head to Head ")?;
    if let Some(total) = summaries.first() {
        writeln!(out, "Days played together: {}", total.days)?;
    }
    writeln!(
        out,
        "\n{:<12} {:>8} {:>8} {:>6} {:>12} {:>12} {:>9} {:>9}",
        "Category",
        format!("{} W", truncate(first, 6)),
        format!("{} W", truncate(second, 6)),
        "Ties",
        format!("{} Avg", truncate(first, 6)),
        format!("{} Avg", truncate(second, 6)),
        "Long A",
        "Long B"
    )?;
    writeln!(out, "{:-<80}", "")?;

    for h2h in summaries {
        let longest = |p: Player| {
            h2h.longest[p.index()]
                .map(|s| s.length.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        writeln!(
            out,
            "{:<12} {:>8} {:>8} {:>6} {:>12} {:>12} {:>9} {:>9}",
            h2h.category.label(),
            h2h.wins[0],
            h2h.wins[1],
            h2h.ties,
            format_points(h2h.averages[0]),
            format_points(h2h.averages[1]),
            longest(Player::First),
            longest(Player::Second)
        )?;
    }

    if let Some(total) = summaries.first() {
        writeln!(out, "\nCurrent streak: {}", total.describe_current(roster))?;
        writeln!(
            out,
            "Best day: {} {} / {} {}",
            first,
            format_points(total.best[0]),
            second,
            format_points(total.best[1])
        )?;
    }
    writeln!(out, "{:=^80}", "")?;
    Ok(out)
}

// ============================================================================
// HTML fragments
// ============================================================================

/// One award card. Classes `gold`, `tie` and `ongoing` mirror the flags.
pub fn award_card_html(award: &AwardRecord) -> String {
    let mut classes = vec!["award"];
    if award.is_gold {
        classes.push("gold");
    }
    if award.is_tie {
        classes.push("tie");
    }
    if award.is_ongoing {
        classes.push("ongoing");
    }

    format!(
        r#"<div class="{classes}" data-category="{category}"><span class="icon">{icon}</span><div class="award-body"><div class="award-title">{title} &middot; {name}</div><div class="award-desc">{desc}</div></div></div>"#,
        classes = classes.join(" "),
        category = award.category.label().to_lowercase(),
        icon = html_escape(&award.icon),
        title = html_escape(&award.title),
        name = html_escape(&award.name),
        desc = html_escape(&award.description),
    )
}

/// Two-column hall: one column of cards per player.
pub fn hall_html(hall: Hall, roster: &Roster, awards: &AwardLists) -> String {
    let mut columns = String::new();
    for player in Player::BOTH {
        let cards: String = awards
            .for_player(player)
            .iter()
            .map(award_card_html)
            .collect::<Vec<_>>()
            .join("\n");
        let body = if cards.is_empty() {
            r#"<p class="empty">No awards yet</p>"#.to_string()
        } else {
            cards
        };
        columns.push_str(&format!(
            r#"<div class="hall-column"><h3>{name}</h3>{body}</div>"#,
            name = html_escape(roster.name(player)),
            body = body,
        ));
    }
    format!(
        r#"<section class="hall"><h2>{title}</h2><div class="hall-columns">{columns}</div></section>"#,
        title = hall.title(),
        columns = columns,
    )
}

pub fn news_html(events: &[&NewsEvent], roster: &Roster, category: Category) -> String {
    let heading = format!("{} {} News", category.icon(), category.label());
    if events.is_empty() {
        return format!(
            r#"<section class="news"><h2>{heading}</h2><p class="empty">Nothing to report yet</p></section>"#,
            heading = heading
        );
    }
    let items: String = events
        .iter()
        .map(|e| {
            format!(
                r#"<li><span class="icon">{icon}</span><span class="date">{date}</span> {headline}</li>"#,
                icon = e.icon(),
                date = format_date(e.date()),
                headline = html_escape(&e.headline(roster, category)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<section class="news"><h2>{heading}</h2><ul>{items}</ul></section>"#,
        heading = heading,
        items = items
    )
}

fn summary_html(h2h: &HeadToHead, roster: &Roster) -> String {
    let rows: String = Player::BOTH
        .iter()
        .map(|p| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(roster.name(*p)),
                h2h.wins[p.index()],
                format_points(h2h.averages[p.index()]),
                format_points(h2h.best[p.index()])
            )
        })
        .collect();
    format!(
        r#"<section class="summary"><h2>Head to Head</h2><p>{days} days played together, {ties} ties. {current}.</p><table><tr><th>Player</th><th>Wins</th><th>Average</th><th>Best</th></tr>{rows}</table></section>"#,
        days = h2h.days,
        ties = h2h.ties,
        current = html_escape(&h2h.describe_current(roster)),
        rows = rows,
    )
}

// ============================================================================
// Charts
// ============================================================================

#[derive(Debug, Serialize)]
struct ChartPoint<'a> {
    date: String,
    player: &'a str,
    average: f64,
}

/// Vega-Lite line chart of each player's rolling average daily score.
pub fn rolling_chart_spec(
    days: &[DailyRecord],
    roster: &Roster,
    category: Category,
    window: usize,
) -> serde_json::Value {
    let mut ordered: Vec<&DailyRecord> = days.iter().collect();
    ordered.sort_by_key(|d| d.date);

    let mut points = Vec::new();
    for player in Player::BOTH {
        let scores: Vec<f64> = ordered.iter().map(|d| d.score(player, category)).collect();
        for (day, avg) in ordered.iter().zip(rolling_average(&scores, window)) {
            if let Some(average) = avg {
                points.push(ChartPoint {
                    date: day.date.format("%Y-%m-%d").to_string(),
                    player: roster.name(player),
                    average: (average * 10.0).round() / 10.0,
                });
            }
        }
    }

    json!({
        "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
        "title": format!("{} score, {}-game rolling average", category.label(), window),
        "width": "container",
        "height": 300,
        "data": { "values": points },
        "mark": { "type": "line", "interpolate": "monotone" },
        "encoding": {
            "x": { "field": "date", "type": "temporal", "title": "Date" },
            "y": { "field": "average", "type": "quantitative", "title": "Average", "scale": { "zero": false } },
            "color": { "field": "player", "type": "nominal", "title": "Player" }
        }
    })
}

// ============================================================================
// Dashboard page
// ============================================================================

/// Everything the static dashboard shows.
pub struct DashboardView<'a> {
    pub roster: &'a Roster,
    pub generated: String,
    pub summary: &'a HeadToHead,
    pub news: &'a [&'a NewsEvent],
    pub fame: &'a AwardLists,
    pub shame: &'a AwardLists,
    pub charts: Vec<serde_json::Value>,
}

fn inline_css() -> &'static str {
    r#"
body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; background: #f4f1ea; color: #222; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
h1 { margin-bottom: 4px; }
.generated { color: #777; font-size: 13px; }
section { background: #fff; border-radius: 8px; padding: 16px 20px; margin: 16px 0; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
table { border-collapse: collapse; }
td, th { padding: 4px 12px; text-align: right; }
td:first-child, th:first-child { text-align: left; }
.hall-columns { display: flex; gap: 24px; }
.hall-column { flex: 1; }
.award { display: flex; gap: 10px; align-items: flex-start; border: 2px solid #ddd; border-radius: 6px; padding: 8px; margin: 6px 0; }
.award.gold { border-color: #d4af37; background: #fffbea; }
.award.tie { border-style: dashed; }
.award.ongoing .award-title::after { content: " (ongoing)"; color: #888; font-weight: normal; }
.award .icon { font-size: 24px; }
.award-title { font-weight: 600; }
.award-desc { font-size: 14px; color: #444; }
.news ul { list-style: none; padding: 0; }
.news li { padding: 4px 0; }
.news .date { color: #777; margin: 0 8px; font-size: 13px; }
.empty { color: #999; }
.chart { width: 100%; }
"#
}

/// Full HTML page with embedded styles and chart specs.
pub fn dashboard_html(view: &DashboardView) -> Result<String> {
    let mut chart_divs = String::new();
    let mut chart_js = String::new();
    for (i, spec) in view.charts.iter().enumerate() {
        chart_divs.push_str(&format!(r#"<div class="chart" id="chart-{}"></div>"#, i));
        chart_js.push_str(&format!(
            "vegaEmbed('#chart-{}', {}, {{actions: false}});\n",
            i,
            serde_json::to_string(spec)?
        ));
    }

    let title = format!(
        "{} vs {}",
        view.roster.name(Player::First),
        view.roster.name(Player::Second)
    );

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Timeguessr - {title}</title>
    <style>{css}</style>
    <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
    <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
    <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
    <div class="container">
        <h1>Timeguessr: {title}</h1>
        <div class="generated">Generated {generated}</div>
        {summary}
        <section class="charts"><h2>Form</h2>{chart_divs}</section>
        {news}
        {fame}
        {shame}
    </div>
    <script>
{chart_js}    </script>
</body>
</html>
"#,
        title = html_escape(&title),
        css = inline_css(),
        generated = html_escape(&view.generated),
        summary = summary_html(view.summary, view.roster),
        chart_divs = chart_divs,
        news = news_html(view.news, view.roster, view.summary.category),
        fame = hall_html(Hall::Fame, view.roster, view.fame),
        shame = hall_html(Hall::Shame, view.roster, view.shame),
        chart_js = chart_js,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::PlayerDay;
    use crate::periods::{Period, PeriodKind};

    fn award(description: &str) -> AwardRecord {
        AwardRecord {
            icon: "\u{1F3C6}".to_string(),
            title: "Q1 2024".to_string(),
            name: "Total Champion".to_string(),
            description: description.to_string(),
            category: Category::Total,
            rule: "champion",
            period: Period::containing(PeriodKind::Quarter, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            is_tie: false,
            is_gold: true,
            is_ongoing: false,
        }
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(0.0), "0");
        assert_eq!(format_points(999.0), "999");
        assert_eq!(format_points(1000.0), "1,000");
        assert_eq!(format_points(45000.4), "45,000");
        assert_eq!(format_points(1234567.0), "1,234,567");
        assert_eq!(format_points(-3000.0), "-3,000");
    }

    #[test]
    fn test_format_relative_and_date() {
        assert_eq!(format_relative(110.0, 100.0), "+10.0%");
        assert_eq!(format_relative(5.0, 0.0), "n/a");
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_date(d), "Mar 7, 2024");
    }

    #[test]
    fn test_award_card_escapes_and_flags() {
        let html = award_card_html(&award("<b>Tom & Jerry</b>"));
        assert!(html.contains(r#"class="award gold""#));
        assert!(html.contains("&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_news_html_heading_names_category() {
        let html = news_html(&[], &Roster::default(), Category::Geography);
        assert!(html.contains("<h2>\u{1F30E} Geography News</h2>"));
        assert!(html.contains("Nothing to report yet"));
    }

    #[test]
    fn test_awards_text_lists_both_players() {
        let roster = Roster::default();
        let lists = AwardLists::default();
        let text = awards_text(Hall::Shame, &roster, &lists).unwrap();
        assert!(text.contains("Hall of Shame"));
        assert!(text.contains("Michael (0 awards)"));
        assert!(text.contains("Sarah (0 awards)"));
    }

    #[test]
    fn test_chart_spec_skips_partial_windows() {
        let days: Vec<DailyRecord> = (1..=4)
            .map(|d| DailyRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                day: d,
                players: [
                    PlayerDay {
                        total: 1000.0 * d as f64,
                        ..Default::default()
                    },
                    PlayerDay {
                        total: 500.0,
                        ..Default::default()
                    },
                ],
            })
            .collect();
        let spec = rolling_chart_spec(&days, &Roster::default(), Category::Total, 3);
        let values = spec["data"]["values"].as_array().unwrap();
        // Two full windows per player
        assert_eq!(values.len(), 4);
        assert_eq!(values[0]["player"], "Michael");
        assert_eq!(values[0]["average"], 2000.0);
        assert_eq!(values[0]["date"], "2024-01-03");
    }
}
