//! Free-form match report parsing.
//!
//! Reports are loosely structured, for example:
//!
//! ```text
//! Ligue 1 – PSG vs Lorient
//! 1.45 4.60 6.50
//! xg_home: 2.1  xg_away: 0.9
//! classement_home: 1  classement_away: 15
//! forme_home: ★★★★☆  forme_away: ★★☆☆☆
//! ```
//!
//! Anything unreadable is left as `None` and recorded as an issue; the
//! feature extractor fills the gap from its defaults.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::engine::error::EngineError;
use crate::engine::features::MatchAttributes;
use crate::engine::odds::BookOdds;

/// Form value of one filled star.
const STAR_VALUE: f64 = 0.2;

// Home side runs back to the nearest standalone dash or pipe; away side stops
// at the first token holding a digit, `:` or `@` (kick-off time, venue).
static TEAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)((?:[^\s\-–—|][^\s–—|]*\s+)*?[^\s\-–—|][^\s–—|]*)\s+(?:vs\.?|v)\s+([^\s\d:@]+(?:\s+[^\s\d:@]+)*)",
    )
    .expect("valid team regex")
});

static ODDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s|,;])([0-9]+\.[0-9]+)[\s|,;]+([0-9]+\.[0-9]+)[\s|,;]+([0-9]+\.[0-9]+)(?:$|[\s|,;])")
        .expect("valid odds regex")
});

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(xg|classement|ranking|rank|forme|form)_([^\s:,;]+)\s*:\s*([^\s,;]+)")
        .expect("valid attribute regex")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReport {
    pub home_team: String,
    pub away_team: String,
    /// False when the placeholder names were used.
    pub teams_found: bool,
    pub attributes: MatchAttributes,
    pub book_odds: Option<BookOdds>,
    /// Values that were present but unreadable.
    pub issues: Vec<EngineError>,
}

impl ParsedReport {
    pub fn match_name(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Attribute {
    Xg,
    Rank,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Home,
    Away,
}

/// Parse a report. Never fails: missing or malformed values become `None`.
pub fn parse_report(content: &str) -> ParsedReport {
    let mut report = ParsedReport::default();
    let mut teams: Option<(String, String)> = None;

    for line in content.lines() {
        if teams.is_none() {
            teams = parse_teams(line);
        }
        if report.book_odds.is_none() {
            report.book_odds = parse_odds_line(line);
        }
        for caps in KEY_VALUE.captures_iter(line) {
            let prefix = caps[1].to_lowercase();
            let suffix = caps[2].to_lowercase();
            let attribute = match prefix.as_str() {
                "xg" => Attribute::Xg,
                "classement" | "ranking" | "rank" => Attribute::Rank,
                _ => Attribute::Form,
            };
            let key = format!("{}_{}", prefix, suffix);
            let side = side_for(attribute, &suffix, &report.attributes);
            if let Err(e) = assign(&mut report.attributes, attribute, side, &key, &caps[3]) {
                warn!("{}", e);
                report.issues.push(e);
            }
        }
    }

    report.teams_found = teams.is_some();
    let (home, away) = teams.unwrap_or_else(|| ("Home".to_string(), "Away".to_string()));
    report.home_team = home;
    report.away_team = away;
    report
}

/// `"<A> vs <B>"` on one line, competition prefix dropped.
fn parse_teams(line: &str) -> Option<(String, String)> {
    let caps = TEAMS.captures(line)?;
    let home = clean_team(&caps[1]);
    let away = clean_team(&caps[2]);
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

fn clean_team(s: &str) -> String {
    s.trim_matches(|c: char| !c.is_alphanumeric()).to_string()
}

/// First three consecutive decimal numbers on the line, as home/draw/away.
fn parse_odds_line(line: &str) -> Option<BookOdds> {
    let caps = ODDS.captures(line)?;
    let price = |i: usize| caps[i].parse::<f64>().ok();
    Some(BookOdds::new(price(1)?, price(2)?, price(3)?))
}

/// Explicit side suffixes win; anything else fills home first, then away.
fn side_for(attribute: Attribute, suffix: &str, attrs: &MatchAttributes) -> Side {
    match suffix {
        "home" | "dom" | "domicile" | "h" => Side::Home,
        "away" | "ext" | "exterieur" | "extérieur" | "a" => Side::Away,
        _ => {
            let home_filled = match attribute {
                Attribute::Xg => attrs.xg_home.is_some(),
                Attribute::Rank => attrs.rank_home.is_some(),
                Attribute::Form => attrs.form_home.is_some(),
            };
            if home_filled {
                Side::Away
            } else {
                Side::Home
            }
        }
    }
}

fn assign(
    attrs: &mut MatchAttributes,
    attribute: Attribute,
    side: Side,
    key: &str,
    value: &str,
) -> Result<(), EngineError> {
    let malformed = |reason: &str| EngineError::FeatureExtraction {
        attribute: key.to_string(),
        reason: format!("{} ('{}')", reason, value),
    };
    match attribute {
        Attribute::Xg => {
            let xg: f64 = value
                .parse()
                .map_err(|_| malformed("expected a decimal"))?;
            if !xg.is_finite() || xg < 0.0 {
                return Err(malformed("expected a non-negative decimal"));
            }
            match side {
                Side::Home => attrs.xg_home = Some(xg),
                Side::Away => attrs.xg_away = Some(xg),
            }
        }
        Attribute::Rank => {
            let rank: u32 = value
                .parse()
                .map_err(|_| malformed("expected a table position"))?;
            if rank == 0 {
                return Err(malformed("table positions start at 1"));
            }
            match side {
                Side::Home => attrs.rank_home = Some(rank),
                Side::Away => attrs.rank_away = Some(rank),
            }
        }
        Attribute::Form => {
            let form = parse_form(value).ok_or_else(|| malformed("expected stars or 0–1"))?;
            match side {
                Side::Home => attrs.form_home = Some(form),
                Side::Away => attrs.form_away = Some(form),
            }
        }
    }
    Ok(())
}

/// `★★★☆☆` → 0.6 (0.2 per filled star), or a plain 0–1 decimal.
fn parse_form(value: &str) -> Option<f64> {
    if value.chars().all(|c| matches!(c, '★' | '☆' | '*' | '-')) {
        let filled = value.chars().filter(|c| matches!(c, '★' | '*')).count();
        return Some(filled as f64 * STAR_VALUE);
    }
    let v: f64 = value.parse().ok()?;
    (0.0..=1.0).contains(&v).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const REPORT: &str = "Ligue 1 – PSG vs Lorient\n\
        Cotes: 1.45 4.60 6.50\n\
        xg_home: 2.1  xg_away: 0.9\n\
        classement_home: 1  classement_away: 15\n\
        forme_home: ★★★★☆  forme_away: ★★☆☆☆\n";

    #[test]
    fn full_report_is_parsed() {
        let r = parse_report(REPORT);
        assert_eq!(r.home_team, "PSG");
        assert_eq!(r.away_team, "Lorient");
        assert_eq!(r.match_name(), "PSG vs Lorient");
        assert_eq!(r.book_odds, Some(BookOdds::new(1.45, 4.60, 6.50)));
        assert_eq!(r.attributes.xg_home, Some(2.1));
        assert_eq!(r.attributes.xg_away, Some(0.9));
        assert_eq!(r.attributes.rank_home, Some(1));
        assert_eq!(r.attributes.rank_away, Some(15));
        assert_relative_eq!(r.attributes.form_home.unwrap(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(r.attributes.form_away.unwrap(), 0.4, epsilon = 1e-12);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn empty_report_falls_back_to_placeholders() {
        let r = parse_report("nothing useful here");
        assert_eq!(r.home_team, "Home");
        assert_eq!(r.away_team, "Away");
        assert!(!r.teams_found);
        assert_eq!(r.book_odds, None);
        assert_eq!(r.attributes, MatchAttributes::default());
    }

    #[test]
    fn malformed_value_is_recorded_and_left_unset() {
        let r = parse_report("xg_home: lots\nranking_away: 0\nform_home: 3.5");
        assert_eq!(r.attributes.xg_home, None);
        assert_eq!(r.attributes.rank_away, None);
        assert_eq!(r.attributes.form_home, None);
        assert_eq!(r.issues.len(), 3);
        assert!(r
            .issues
            .iter()
            .all(|e| matches!(e, EngineError::FeatureExtraction { .. })));
    }

    #[test]
    fn unknown_suffixes_fill_home_then_away() {
        let r = parse_report("xg_psg: 1.7\nxg_lorient: 1.2");
        assert_eq!(r.attributes.xg_home, Some(1.7));
        assert_eq!(r.attributes.xg_away, Some(1.2));
    }

    #[test]
    fn compact_key_value_and_numeric_form() {
        let r = parse_report("Lens vs Lille 20:45\nrank_home:4,rank_away:6\nform_home:0.7");
        assert_eq!(r.home_team, "Lens");
        assert_eq!(r.away_team, "Lille");
        assert_eq!(r.attributes.rank_home, Some(4));
        assert_eq!(r.attributes.rank_away, Some(6));
        assert_eq!(r.attributes.form_home, Some(0.7));
        // kick-off time is not mistaken for odds
        assert_eq!(r.book_odds, None);
    }

    #[test]
    fn first_odds_line_wins() {
        let r = parse_report("2.10 3.30 3.40\n1.90 3.50 4.00");
        assert_eq!(r.book_odds, Some(BookOdds::new(2.10, 3.30, 3.40)));
    }

    #[test]
    fn hyphenated_names_survive_prefix_removal() {
        let r = parse_report("Ligue 1 - Saint-Etienne vs Paris FC @ Geoffroy-Guichard");
        assert_eq!(r.home_team, "Saint-Etienne");
        assert_eq!(r.away_team, "Paris FC");
        assert!(r.teams_found);
    }
}
