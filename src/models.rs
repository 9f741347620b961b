//! Data models for feed items, roundup summaries, and scanned site state.
//!
//! Three families of types live here:
//! - [`NewsItem`]: a headline pulled from the syndication search feed,
//!   consumed once per run
//! - [`RoundupSummary`] / [`SummaryOutcome`]: the structured payload the
//!   model returns, immutable once produced and written into every output
//!   surface
//! - [`ArticleRecord`] / [`RunReport`]: state read back from (or written to)
//!   the generated site, which doubles as the persistence layer

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A single headline gathered from the feed, before summarization.
#[derive(Debug, Clone)]
pub struct NewsItem {
    /// The headline text.
    pub title: String,
    /// Link to the original story.
    pub url: String,
    /// Publisher name as reported by the feed.
    pub source: String,
    /// Publication time, when the feed's `pubDate` parsed as RFC 2822.
    pub published_at: Option<chrono::DateTime<chrono::FixedOffset>>,
}

/// One summarized story line inside a roundup: a bolded lead-in, body text,
/// and a source attribution link.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Bullet {
    pub name: String,
    pub text: String,
    pub source: String,
    pub url: String,
}

/// The day's aggregated summary as returned by the model.
///
/// Immutable once produced; every output surface (article page, homepage
/// card, feed item, sitemap entry, person pages) is derived from this one
/// value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoundupSummary {
    /// The unifying headline for the day, without the date prefix.
    pub theme_headline: String,
    /// The person the day's coverage centers on, if any.
    #[serde(default)]
    pub featured_name: Option<String>,
    /// People tagged on the article, in priority order, deduplicated.
    pub names: Vec<String>,
    /// Condensed bullets for the homepage card.
    pub short_bullets: Vec<Bullet>,
    /// Full bullets for the article page.
    pub long_bullets: Vec<Bullet>,
}

impl RoundupSummary {
    /// Drop duplicate names while preserving first-seen order.
    pub fn dedupe_names(&mut self) {
        self.names = std::mem::take(&mut self.names)
            .into_iter()
            .unique_by(|n| n.to_lowercase())
            .collect();
    }
}

/// Result of a summarization call, distinguishing a quiet news day from an
/// actual failure (failures are `Err` at the call site).
#[derive(Debug)]
pub enum SummaryOutcome {
    /// The model produced a publishable roundup.
    Produced(RoundupSummary),
    /// The model explicitly signaled there is nothing distinct to publish
    /// today; a normal early exit, not an error.
    NoNews,
}

/// Raw shape of the model's JSON, before validation.
///
/// `no_news` is the escape hatch the prompt offers the model; when set, the
/// remaining fields are ignored.
#[derive(Debug, Deserialize)]
pub struct SummaryPayload {
    #[serde(default)]
    pub no_news: bool,
    #[serde(default)]
    pub theme_headline: String,
    #[serde(default)]
    pub featured_name: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub short_bullets: Vec<Bullet>,
    #[serde(default)]
    pub long_bullets: Vec<Bullet>,
}

/// Fields scanned back out of a generated article document.
///
/// Every field except the slug degrades to empty rather than failing the
/// scan; person-page rebuilds tolerate partially malformed pages.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub slug: String,
    pub headline: String,
    /// ISO `YYYY-MM-DD`; descending lexical sort on this is date-correct.
    pub date_iso: String,
    pub tags: Vec<String>,
    pub thumb: String,
    pub lede: String,
}

/// Terminal status of a pipeline run, recorded in `latest_run.json`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Published,
    NoNews,
    SkippedExisting,
}

/// The small summary file written at the end of every run for whatever
/// process invoked us (cron wrapper, the social poster).
#[derive(Debug, Deserialize, Serialize)]
pub struct RunReport {
    /// ISO date of the run.
    pub date: String,
    pub slug: String,
    pub headline: String,
    pub status: RunStatus,
    pub names: Vec<String>,
    /// Output surfaces actually updated this run.
    pub surfaces: Vec<String>,
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_names_preserves_order() {
        let mut summary = RoundupSummary {
            theme_headline: "Headline".to_string(),
            featured_name: None,
            names: vec![
                "Jane Doe".to_string(),
                "John Roe".to_string(),
                "jane doe".to_string(),
            ],
            short_bullets: vec![],
            long_bullets: vec![],
        };
        summary.dedupe_names();
        assert_eq!(summary.names, vec!["Jane Doe", "John Roe"]);
    }

    #[test]
    fn test_summary_payload_no_news_flag() {
        let payload: SummaryPayload =
            serde_json::from_str(r#"{"no_news": true}"#).unwrap();
        assert!(payload.no_news);
        assert!(payload.names.is_empty());
    }

    #[test]
    fn test_summary_payload_full() {
        let json = r#"{
            "theme_headline": "Prince Andrew Named in New Documents",
            "featured_name": "Prince Andrew",
            "names": ["Prince Andrew", "Ghislaine Maxwell"],
            "short_bullets": [
                {"name": "Lead", "text": "body", "source": "BBC", "url": "https://bbc.com/x"}
            ],
            "long_bullets": [
                {"name": "Lead", "text": "longer body", "source": "BBC", "url": "https://bbc.com/x"}
            ]
        }"#;
        let payload: SummaryPayload = serde_json::from_str(json).unwrap();
        assert!(!payload.no_news);
        assert_eq!(payload.theme_headline, "Prince Andrew Named in New Documents");
        assert_eq!(payload.short_bullets.len(), 1);
        assert_eq!(payload.short_bullets[0].name, "Lead");
        assert_eq!(payload.short_bullets[0].source, "BBC");
    }

    #[test]
    fn test_run_report_round_trip() {
        let report = RunReport {
            date: "2026-02-09".to_string(),
            slug: "daily-feb-9-2026".to_string(),
            headline: "Headline".to_string(),
            status: RunStatus::Published,
            names: vec!["Jane Doe".to_string()],
            surfaces: vec!["article".to_string(), "index".to_string()],
            generated_at: "2026-02-09T06:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"published\""));
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, RunStatus::Published);
        assert_eq!(back.slug, "daily-feb-9-2026");
    }
}
