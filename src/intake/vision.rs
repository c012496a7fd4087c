use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::LazyLock;
use tracing::debug;

use crate::engine::odds::BookOdds;

/// Odds read off a bookmaker screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOdds {
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    pub odds_home: f64,
    pub odds_draw: f64,
    pub odds_away: f64,
}

impl OcrOdds {
    pub fn book_odds(&self) -> BookOdds {
        BookOdds::new(self.odds_home, self.odds_draw, self.odds_away)
    }

    /// Drop blank team names; reject the read unless every price is a real
    /// decimal price. The extraction prompt's `0.00` template counts as no read.
    fn into_usable(mut self) -> Option<OcrOdds> {
        let priced = [self.odds_home, self.odds_draw, self.odds_away]
            .iter()
            .all(|p| p.is_finite() && *p > 1.0);
        if !priced {
            debug!(
                "Vision reply prices {:.2}/{:.2}/{:.2} are not usable, discarding",
                self.odds_home, self.odds_draw, self.odds_away
            );
            return None;
        }
        self.home_team = self.home_team.filter(|t| !t.trim().is_empty());
        self.away_team = self.away_team.filter(|t| !t.trim().is_empty());
        Some(self)
    }
}

/// Anything that can turn an odds screenshot into three prices.
#[async_trait]
pub trait OddsReader: Send + Sync {
    /// `Ok(None)` when the image was read but fewer than three prices came back.
    async fn read_odds(&self, image: &[u8]) -> Result<Option<OcrOdds>>;

    fn name(&self) -> &str;
}

static TWO_DECIMALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]{2}").expect("valid price regex"));

const EXTRACTION_PROMPT: &str = "Extract the 1X2 odds table from this screenshot. \
Answer with JSON only: {\"home_team\": \"\", \"away_team\": \"\", \
\"odds_home\": 0.00, \"odds_draw\": 0.00, \"odds_away\": 0.00}";

/// Vision model behind an OpenAI-compatible chat-completions endpoint.
pub struct VisionOddsReader {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl VisionOddsReader {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(VisionOddsReader {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl OddsReader for VisionOddsReader {
    fn name(&self) -> &str {
        "vision"
    }

    async fn read_odds(&self, image: &[u8]) -> Result<Option<OcrOdds>> {
        let url = format!("{}/chat/completions", self.base_url);
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(image));
        let body = json!({
            "model": self.model,
            "max_tokens": 300,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });
        debug!("Sending {} byte screenshot to {}", image.len(), url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Vision request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Vision API error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse vision response")?;

        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .context("Vision response has no message content")?;

        Ok(parse_reply(content))
    }
}

/// Parse the model reply: JSON first, then the first three two-decimal
/// numbers anywhere in the text.
pub fn parse_reply(content: &str) -> Option<OcrOdds> {
    let trimmed = strip_code_fence(content);
    if let Ok(odds) = serde_json::from_str::<OcrOdds>(trimmed) {
        return odds.into_usable();
    }

    let prices = two_decimal_numbers(content);
    if prices.len() < 3 {
        debug!("Vision reply held {} price(s), discarding", prices.len());
        return None;
    }
    OcrOdds {
        home_team: None,
        away_team: None,
        odds_home: prices[0],
        odds_draw: prices[1],
        odds_away: prices[2],
    }
    .into_usable()
}

fn strip_code_fence(content: &str) -> &str {
    let s = content.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// Every `\d+\.\d\d` occurrence in order (extra trailing digits are ignored).
fn two_decimal_numbers(text: &str) -> Vec<f64> {
    TWO_DECIMALS
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_reply_is_used_directly() {
        let reply = r#"{"home_team":"PSG","away_team":"Lorient","odds_home":1.45,"odds_draw":4.60,"odds_away":6.50}"#;
        let odds = parse_reply(reply).unwrap();
        assert_eq!(odds.home_team.as_deref(), Some("PSG"));
        assert_eq!(odds.book_odds(), BookOdds::new(1.45, 4.60, 6.50));
    }

    #[test]
    fn fenced_json_reply_is_accepted() {
        let reply = "```json\n{\"odds_home\": 2.05, \"odds_draw\": 3.30, \"odds_away\": 3.60}\n```";
        let odds = parse_reply(reply).unwrap();
        assert_eq!(odds.home_team, None);
        assert_eq!(odds.odds_away, 3.60);
    }

    #[test]
    fn prose_reply_falls_back_to_number_scan() {
        let reply = "Home win 1.80, draw 3.50 and away 4.20 (margin 5.5%)";
        let odds = parse_reply(reply).unwrap();
        assert_eq!(odds.book_odds(), BookOdds::new(1.80, 3.50, 4.20));
    }

    #[test]
    fn partial_reply_is_discarded() {
        assert_eq!(parse_reply("I can only see 1.80 and 3.50"), None);
        assert_eq!(parse_reply("no odds visible"), None);
    }

    #[test]
    fn number_scan_requires_two_decimals() {
        assert_eq!(two_decimal_numbers("1.8 2.25 10.125 x3.40"), vec![2.25, 10.12, 3.40]);
    }

    #[test]
    fn echoed_template_is_not_a_read() {
        let reply = r#"{"home_team":"","away_team":"","odds_home":0.00,"odds_draw":0.00,"odds_away":0.00}"#;
        assert_eq!(parse_reply(reply), None);
        assert_eq!(parse_reply("odds: 0.00 0.00 0.00"), None);
    }

    #[test]
    fn blank_team_names_are_dropped() {
        let reply = r#"{"home_team":" ","away_team":"","odds_home":1.80,"odds_draw":3.50,"odds_away":4.20}"#;
        let odds = parse_reply(reply).unwrap();
        assert_eq!(odds.home_team, None);
        assert_eq!(odds.away_team, None);
        assert_eq!(odds.book_odds(), BookOdds::new(1.80, 3.50, 4.20));
    }
}
