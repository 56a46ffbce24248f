//! Feed formats understood by file sources
//!
//! - `points`: a JSON array of `{title, value, start, end}`
//! - `hacker-news`: a JSON array of Hacker News item objects
//! - `wikipedia`: a MediaWiki `list=recentchanges` API response

use super::SourceError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sonify_core::DataPoint;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeedFormat {
    #[default]
    Points,
    HackerNews,
    Wikipedia,
}

impl FeedFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "points" | "json" => Some(FeedFormat::Points),
            "hacker-news" | "hackernews" | "hn" => Some(FeedFormat::HackerNews),
            "wikipedia" | "wiki" => Some(FeedFormat::Wikipedia),
            _ => None,
        }
    }

    pub fn parse(self, text: &str) -> Result<Vec<DataPoint>, SourceError> {
        let points = match self {
            FeedFormat::Points => serde_json::from_str(text).map_err(|e| self.error(e))?,
            FeedFormat::HackerNews => {
                let items: Vec<Option<HackerNewsItem>> =
                    serde_json::from_str(text).map_err(|e| self.error(e))?;
                hacker_news_points(items.into_iter().flatten())
            }
            FeedFormat::Wikipedia => {
                let response: RecentChangesResponse =
                    serde_json::from_str(text).map_err(|e| self.error(e))?;
                wikipedia_points(response.query.recentchanges)
            }
        };
        debug!(format = %self, points = points.len(), "feed parsed");
        Ok(points)
    }

    fn error(self, err: impl fmt::Display) -> SourceError {
        SourceError::Parse {
            format: self,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedFormat::Points => "points",
            FeedFormat::HackerNews => "hacker-news",
            FeedFormat::Wikipedia => "wikipedia",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct HackerNewsItem {
    #[serde(default)]
    title: String,
    score: Option<f64>,
    /// Unix seconds
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RecentChangesResponse {
    query: RecentChangesQuery,
}

#[derive(Debug, Deserialize)]
struct RecentChangesQuery {
    recentchanges: Vec<RecentChange>,
}

#[derive(Debug, Deserialize)]
struct RecentChange {
    #[serde(default)]
    title: String,
    #[serde(default)]
    oldlen: i64,
    #[serde(default)]
    newlen: i64,
    /// RFC 3339
    timestamp: String,
}

fn short_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Items without a (non-zero) score are dropped; value is `ln(score)`
fn hacker_news_points(items: impl Iterator<Item = HackerNewsItem>) -> Vec<DataPoint> {
    items
        .filter_map(|item| {
            let score = item.score.filter(|s| *s != 0.0 && s.is_finite())?;
            let time = item.time?;
            let Some(at) = Utc.timestamp_opt(time, 0).single() else {
                warn!(time, "story with out-of-range timestamp skipped");
                return None;
            };
            let title = format!("{} ({}) ~ {}", item.title, short_date(at), score);
            Some(DataPoint::new(title, score.ln(), time as f64, time as f64))
        })
        .collect()
}

/// Value is `ln(|oldlen - newlen|)`; edits that do not give a positive value are dropped
fn wikipedia_points(changes: Vec<RecentChange>) -> Vec<DataPoint> {
    changes
        .into_iter()
        .filter_map(|change| {
            let at = match DateTime::parse_from_rfc3339(&change.timestamp) {
                Ok(at) => at.with_timezone(&Utc),
                Err(e) => {
                    warn!(timestamp = %change.timestamp, "unparseable edit timestamp: {}", e);
                    return None;
                }
            };
            let delta = (change.oldlen - change.newlen).abs();
            let value = (delta as f64).ln();
            if !(value > 0.0) {
                return None;
            }
            let seconds = at.timestamp() as f64;
            let title = format!("{} ({}) ~ {}", change.title, short_date(at), delta);
            Some(DataPoint::new(title, value, seconds, seconds))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_format() {
        let text = r#"[{"title": "a", "value": 1.5, "start": 10, "end": 12}]"#;
        let points = FeedFormat::Points.parse(text).unwrap();
        assert_eq!(points, vec![DataPoint::new("a", 1.5, 10.0, 12.0)]);
    }

    #[test]
    fn test_hacker_news_items() {
        let text = r#"[
            {"title": "Show HN: thing", "score": 100, "time": 1700000000},
            {"title": "no score", "time": 1700000100},
            {"title": "zero", "score": 0, "time": 1700000200},
            null
        ]"#;
        let points = FeedFormat::HackerNews.parse(text).unwrap();
        assert_eq!(points.len(), 1);

        let p = &points[0];
        assert_eq!(p.title, "Show HN: thing (2023-11-14) ~ 100");
        assert!((p.value - 100f64.ln()).abs() < 1e-12);
        assert_eq!(p.start, 1_700_000_000.0);
        assert_eq!(p.end, p.start);
    }

    #[test]
    fn test_wikipedia_recent_changes() {
        let text = r#"{"batchcomplete": "", "query": {"recentchanges": [
            {"type": "edit", "title": "Rust", "oldlen": 1000, "newlen": 1250, "timestamp": "2024-03-01T12:00:00Z"},
            {"type": "edit", "title": "Tiny", "oldlen": 10, "newlen": 11, "timestamp": "2024-03-01T12:00:01Z"},
            {"type": "edit", "title": "Same", "oldlen": 10, "newlen": 10, "timestamp": "2024-03-01T12:00:02Z"},
            {"type": "edit", "title": "Bad", "oldlen": 0, "newlen": 99, "timestamp": "yesterday"}
        ]}}"#;
        let points = FeedFormat::Wikipedia.parse(text).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].title, "Rust (2024-03-01) ~ 250");
        assert!((points[0].value - 250f64.ln()).abs() < 1e-12);
        assert_eq!(points[0].start, 1_709_294_400.0);
    }

    #[test]
    fn test_malformed_feed() {
        let err = FeedFormat::Wikipedia.parse("[]").unwrap_err();
        assert!(matches!(err, SourceError::Parse { format: FeedFormat::Wikipedia, .. }));
        assert!(err.to_string().starts_with("malformed wikipedia feed"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(FeedFormat::from_name("HN"), Some(FeedFormat::HackerNews));
        assert_eq!(FeedFormat::from_name("wiki"), Some(FeedFormat::Wikipedia));
        assert_eq!(FeedFormat::from_name("csv"), None);
        assert_eq!(FeedFormat::HackerNews.to_string(), "hacker-news");
    }
}
