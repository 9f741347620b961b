//! Feed fetcher: queries a syndication search endpoint and filters the
//! results down to a relevant, recent, deduplicated batch of headlines.
//!
//! Each configured query is one HTTP GET; a failing query is logged and
//! contributes zero items, never failing the run by itself. Filtering is
//! deliberately permissive where the data is unreliable: an item whose
//! `pubDate` won't parse is retained rather than dropped.

use crate::config::SiteConfig;
use crate::models::NewsItem;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Per-query network timeout.
pub const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<SourceElem>,
}

#[derive(Debug, Deserialize)]
struct SourceElem {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Parse one RSS response body into news items.
///
/// Items missing both a title and a link are discarded; everything else is
/// kept as-is for the later filter passes.
pub fn parse_items(xml: &str) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let mut out = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        let title = item.title.unwrap_or_default().trim().to_string();
        let url = item.link.unwrap_or_default().trim().to_string();
        if title.is_empty() && url.is_empty() {
            continue;
        }
        let published_at = item
            .pub_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok());
        out.push(NewsItem {
            title,
            url,
            source: item
                .source
                .and_then(|s| s.name)
                .unwrap_or_default(),
            published_at,
        });
    }
    Ok(out)
}

/// Case-insensitive exact-title dedupe across all queries; first occurrence
/// wins, discovery order preserved.
pub fn dedupe_by_title(items: Vec<NewsItem>) -> Vec<NewsItem> {
    items
        .into_iter()
        .unique_by(|item| item.title.to_lowercase())
        .collect()
}

/// True when the item published within the trailing window ending at `now`.
///
/// Items with no parsable timestamp pass the filter.
pub fn within_window(item: &NewsItem, now: DateTime<Utc>, hours: i64) -> bool {
    match item.published_at {
        Some(published) => now.signed_duration_since(published) <= Duration::hours(hours),
        None => true,
    }
}

/// True when the title contains at least one keyword, case-insensitively.
pub fn is_relevant(title: &str, keywords: &[String]) -> bool {
    let lowered = title.to_lowercase();
    keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
}

/// Issue every configured query and reduce the results to the batch handed
/// to the summarizer: deduplicated, recent, relevant, capped.
#[instrument(level = "info", skip_all, fields(queries = config.queries.len()))]
pub async fn fetch(
    client: &reqwest::Client,
    config: &SiteConfig,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let mut gathered: Vec<NewsItem> = Vec::new();

    for query in &config.queries {
        let url = format!(
            "{}?q={}&hl=en-US&gl=US&ceid=US:en",
            config.feed_endpoint,
            urlencoding::encode(query)
        );
        debug!(%url, "Requesting feed query");

        let body = match client.get(&url).send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => match resp.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(query, error = %e, "Failed reading feed response; skipping query");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(query, error = %e, "Feed query returned error status; skipping query");
                    continue;
                }
            },
            Err(e) => {
                warn!(query, error = %e, "Feed query failed; skipping query");
                continue;
            }
        };

        match parse_items(&body) {
            Ok(items) => {
                info!(query, count = items.len(), "Feed query parsed");
                gathered.extend(items);
            }
            Err(e) => {
                warn!(query, error = %e, "Feed response was not parsable XML; skipping query");
            }
        }
    }

    let total = gathered.len();
    let deduped = dedupe_by_title(gathered);
    let mut kept: Vec<NewsItem> = deduped
        .into_iter()
        .filter(|item| within_window(item, now, config.recency_hours))
        .filter(|item| is_relevant(&item.title, &config.keywords))
        .collect();
    kept.truncate(config.max_items);

    info!(
        gathered = total,
        kept = kept.len(),
        window_hours = config.recency_hours,
        "Feed fetch complete"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>search results</title>
    <item>
      <title>Epstein Files Released</title>
      <link>https://news.example/a</link>
      <pubDate>Mon, 09 Feb 2026 08:00:00 GMT</pubDate>
      <source url="https://news.example">Example News</source>
    </item>
    <item>
      <title>epstein files released</title>
      <link>https://other.example/b</link>
      <pubDate>Mon, 09 Feb 2026 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Unrelated Sports Story</title>
      <link>https://news.example/c</link>
      <pubDate>not a date</pubDate>
    </item>
    <item>
      <title></title>
      <link></link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_items_drops_empty_entries() {
        let items = parse_items(SAMPLE_RSS).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Epstein Files Released");
        assert_eq!(items[0].source, "Example News");
        assert!(items[0].published_at.is_some());
        assert!(items[2].published_at.is_none());
    }

    #[test]
    fn test_dedupe_is_case_insensitive_first_wins() {
        let items = parse_items(SAMPLE_RSS).unwrap();
        let deduped = dedupe_by_title(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "Epstein Files Released");
        assert_eq!(deduped[0].url, "https://news.example/a");
    }

    #[test]
    fn test_within_window() {
        let now = Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap();
        let items = parse_items(SAMPLE_RSS).unwrap();
        // Published 4h before `now`: inside a 48h window, outside a 1h one.
        assert!(within_window(&items[0], now, 48));
        assert!(!within_window(&items[0], now, 1));
    }

    #[test]
    fn test_unparsable_date_is_retained() {
        let now = Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap();
        let items = parse_items(SAMPLE_RSS).unwrap();
        assert!(items[2].published_at.is_none());
        assert!(within_window(&items[2], now, 1));
    }

    #[test]
    fn test_relevance_filter() {
        let keywords = vec!["epstein".to_string(), "maxwell".to_string()];
        assert!(is_relevant("Epstein Files Released", &keywords));
        assert!(is_relevant("GHISLAINE MAXWELL appeal denied", &keywords));
        assert!(!is_relevant("Unrelated Sports Story", &keywords));
    }
}
