//! Social announcement poster.
//!
//! One post per invocation. If today's roundup was published, announce it;
//! otherwise pick a random past article and reshare it, so the account stays
//! active on no-news days.

use crate::config::{SiteConfig, SocialConfig};
use crate::models::RunStatus;
use crate::outputs::json::read_report;
use crate::people::scan_all_articles;
use chrono::Utc;
use rand::prelude::IndexedRandom;
use serde::Serialize;
use std::error::Error;
use tracing::{info, instrument, warn};

pub const MAX_POST_LEN: usize = 280;

const ANNOUNCE_PHRASES: &[&str] = &[
    "Today's roundup: {headline} {url}",
    "New today — {headline} {url}",
    "Fresh off the press: {headline} {url}",
    "The latest: {headline} {url}",
];

const RESHARE_PHRASES: &[&str] = &[
    "From the archive: {headline} {url}",
    "In case you missed it — {headline} {url}",
    "Worth rereading: {headline} {url}",
    "Still relevant: {headline} {url}",
];

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    text: &'a str,
}

/// Fill a phrase template, trimming the headline so the whole post fits in
/// `MAX_POST_LEN` characters. The URL always survives intact.
pub fn compose(phrase: &str, headline: &str, url: &str) -> String {
    let full = phrase.replace("{headline}", headline).replace("{url}", url);
    if full.chars().count() <= MAX_POST_LEN {
        return full;
    }
    let overhead = phrase
        .replace("{headline}", "")
        .replace("{url}", url)
        .chars()
        .count();
    let budget = MAX_POST_LEN.saturating_sub(overhead + 3);
    let trimmed: String = headline.chars().take(budget).collect();
    phrase
        .replace("{headline}", &format!("{}...", trimmed.trim_end()))
        .replace("{url}", url)
}

fn article_url(base_url: &str, slug: &str) -> String {
    format!("{}/{slug}.html", base_url.trim_end_matches('/'))
}

/// Decide what to post today and send it.
#[instrument(level = "info", skip_all)]
pub async fn post(config: &SiteConfig, social: &SocialConfig) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let mut rng = rand::rng();

    let (phrase, headline, url) = match read_report(&config.site_root).await {
        Ok(report) if report.status == RunStatus::Published && report.date == today => {
            let phrase = *ANNOUNCE_PHRASES.choose(&mut rng).unwrap();
            (
                phrase,
                report.headline,
                article_url(&config.base_url, &report.slug),
            )
        }
        other => {
            if let Err(e) = &other {
                warn!(error = %e, "No run report; falling back to reshare");
            }
            let articles = scan_all_articles(&config.site_root).await?;
            let Some(pick) = articles.choose(&mut rng) else {
                warn!("Nothing published yet; skipping social post");
                return Ok(());
            };
            let phrase = *RESHARE_PHRASES.choose(&mut rng).unwrap();
            (
                phrase,
                pick.headline.clone(),
                article_url(&config.base_url, &pick.slug),
            )
        }
    };

    let text = compose(phrase, &headline, &url);
    let token = std::env::var(&social.token_env)
        .map_err(|_| format!("{} is not set", social.token_env))?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(crate::feed::FETCH_TIMEOUT_SECS))
        .build()?;
    client
        .post(&social.endpoint)
        .bearer_auth(token)
        .json(&PostBody { text: &text })
        .send()
        .await?
        .error_for_status()?;

    info!(chars = text.chars().count(), "Posted: {text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/daily-feb-9-2026.html";

    #[test]
    fn test_compose_short_post_unchanged() {
        let post = compose("Today's roundup: {headline} {url}", "A Short Headline", URL);
        assert_eq!(post, format!("Today's roundup: A Short Headline {URL}"));
    }

    #[test]
    fn test_compose_trims_headline_not_url() {
        let long = "word ".repeat(80);
        let post = compose("Today's roundup: {headline} {url}", &long, URL);
        assert!(post.chars().count() <= MAX_POST_LEN);
        assert!(post.ends_with(URL));
        assert!(post.contains("..."));
    }

    #[test]
    fn test_compose_char_safe() {
        let long = "émoji héadline ".repeat(30);
        let post = compose("The latest: {headline} {url}", &long, URL);
        assert!(post.chars().count() <= MAX_POST_LEN);
        assert!(post.ends_with(URL));
    }

    #[test]
    fn test_all_phrases_have_both_placeholders() {
        for phrase in ANNOUNCE_PHRASES.iter().chain(RESHARE_PHRASES) {
            assert!(phrase.contains("{headline}"), "{phrase}");
            assert!(phrase.contains("{url}"), "{phrase}");
        }
    }
}
