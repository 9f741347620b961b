//! Summarizer adapter: turns a batch of feed items into a structured
//! [`RoundupSummary`] via the text-generation API.
//!
//! The model is asked for a single JSON object. Its answer is free-form text,
//! so extraction runs in two passes (fenced code block, then greedy brace
//! match), followed by a mechanical repair pass for the two malformations
//! models actually produce: trailing commas and missing commas between
//! adjacent values. Only after extraction and repair both fail is the whole
//! request retried, up to a bounded attempt count.

use crate::api::{ask_with_backoff, ChatClient};
use crate::models::{NewsItem, SummaryOutcome, SummaryPayload, RoundupSummary};
use crate::utils::{looks_truncated, truncate_for_log};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::Write as _;
use tracing::{info, instrument, warn};

/// Full request re-asks before the run is declared failed.
const MAX_ATTEMPTS: usize = 3;

/// Token cap for bio requests; bios are a paragraph, not a roundup.
const BIO_MAX_TOKENS: u32 = 256;

/// Context the prompt needs beyond the items themselves.
pub struct SummarizeContext<'a> {
    pub today: NaiveDate,
    /// Slugs of already-published articles, so the model avoids re-covering
    /// stories from previous days.
    pub existing_slugs: &'a [String],
}

static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

// Trailing comma directly before a closing bracket.
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

// Adjacent values split across lines with the comma missing. These patterns
// never occur in valid JSON (a colon or comma always intervenes), so the
// repair is safe to apply unconditionally.
static MISSING_COMMA_STR_RE: Lazy<Regex> = Lazy::new(|| Regex::new("\"(\\s*\n\\s*)\"").unwrap());
static MISSING_COMMA_OBJ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}(\s*\n\s*)\{").unwrap());
static MISSING_COMMA_MIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new("\"(\\s*\n\\s*)\\{").unwrap());

/// Build the single prompt embedding every gathered item plus the
/// instruction set.
pub fn build_prompt(items: &[NewsItem], ctx: &SummarizeContext<'_>) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Today is {}. Below are {} candidate headlines gathered in the last two days.",
        ctx.today, items.len()
    )
    .unwrap();
    prompt.push_str(
        "\nSelect the 4 to 6 most significant distinct stories and summarize them as one daily roundup.\n\
         Priority order: new document releases and official actions first, then investigations and legal \
         filings, then reactions from named individuals, then international coverage.\n\
         Style: wire-service neutral, no editorializing, every bullet attributed to its source.\n\n",
    );
    prompt.push_str("Respond with ONE JSON object and nothing else, in this exact shape:\n");
    prompt.push_str(
        "{\n  \"theme_headline\": \"...\",\n  \"featured_name\": \"...\" or null,\n  \
         \"names\": [\"...\"],\n  \"short_bullets\": [{\"name\": \"...\", \"text\": \"...\", \
         \"source\": \"...\", \"url\": \"...\"}],\n  \"long_bullets\": [same shape, fuller text]\n}\n\n",
    );
    prompt.push_str(
        "short_bullets and long_bullets must cover the same stories in the same order. \
         names lists the people the day's coverage is about, most prominent first, at most 6.\n\
         If nothing here is genuinely distinct from prior coverage, respond with {\"no_news\": true} instead.\n\n",
    );

    if !ctx.existing_slugs.is_empty() {
        writeln!(
            prompt,
            "Already published (do not re-cover these days' stories): {}\n",
            ctx.existing_slugs.join(", ")
        )
        .unwrap();
    }

    prompt.push_str("Candidate headlines:\n");
    for item in items {
        let when = item
            .published_at
            .map(|d| d.to_rfc2822())
            .unwrap_or_else(|| "undated".to_string());
        writeln!(
            prompt,
            "- {} ({}, {}) {}",
            item.title, item.source, when, item.url
        )
        .unwrap();
    }
    prompt
}

/// Pull a single JSON object out of free-form model output.
///
/// Fenced ```json blocks win; otherwise the greedy substring from the first
/// `{` to the last `}`.
pub fn extract_json(raw: &str) -> Option<String> {
    if let Some(caps) = FENCED_JSON_RE.captures(raw) {
        return Some(caps[1].to_string());
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

/// Mechanical repairs for the malformations worth fixing without a re-ask.
pub fn repair_json(s: &str) -> String {
    let s = TRAILING_COMMA_RE.replace_all(s, "$1");
    let s = MISSING_COMMA_STR_RE.replace_all(&s, "\",$1\"");
    let s = MISSING_COMMA_OBJ_RE.replace_all(&s, "},$1{");
    MISSING_COMMA_MIX_RE.replace_all(&s, "\",$1{").into_owned()
}

/// Parse raw model output into an outcome, applying extraction and repair.
pub fn parse_summary_text(raw: &str) -> Result<SummaryOutcome, Box<dyn Error>> {
    let extracted = extract_json(raw)
        .ok_or_else(|| format!("no JSON object in response: {}", truncate_for_log(raw, 200)))?;

    let payload: SummaryPayload = match serde_json::from_str(&extracted) {
        Ok(p) => p,
        Err(first_err) => {
            // A response cut off at the token limit can't be repaired;
            // only a full re-ask helps.
            if looks_truncated(&first_err) {
                return Err(format!("summary JSON truncated mid-object: {first_err}").into());
            }
            let repaired = repair_json(&extracted);
            serde_json::from_str(&repaired).map_err(|_| {
                format!(
                    "summary JSON unparsable even after repair: {first_err}: {}",
                    truncate_for_log(&extracted, 200)
                )
            })?
        }
    };

    if payload.no_news {
        return Ok(SummaryOutcome::NoNews);
    }
    if payload.theme_headline.trim().is_empty() {
        return Err("summary is missing theme_headline".into());
    }
    if payload.long_bullets.is_empty() {
        return Err("summary has no long_bullets".into());
    }

    let mut summary = RoundupSummary {
        theme_headline: payload.theme_headline,
        featured_name: payload.featured_name,
        names: payload.names,
        short_bullets: if payload.short_bullets.is_empty() {
            payload.long_bullets.clone()
        } else {
            payload.short_bullets
        },
        long_bullets: payload.long_bullets,
    };
    summary.dedupe_names();
    Ok(SummaryOutcome::Produced(summary))
}

/// Summarize the day's gathered items into a roundup, or a no-news signal.
///
/// Exhausting all attempts is fatal for the run; the caller publishes
/// nothing.
#[instrument(level = "info", skip_all, fields(items = items.len(), today = %ctx.today))]
pub async fn summarize(
    client: &ChatClient,
    items: &[NewsItem],
    ctx: &SummarizeContext<'_>,
) -> Result<SummaryOutcome, Box<dyn Error>> {
    let prompt = build_prompt(items, ctx);
    let mut last_err: Option<Box<dyn Error>> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        let raw = ask_with_backoff(client, &prompt).await?;
        match parse_summary_text(&raw) {
            Ok(outcome) => {
                info!(attempt, "Summary parsed");
                return Ok(outcome);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max = MAX_ATTEMPTS,
                    error = %e,
                    response_preview = %truncate_for_log(&raw, 300),
                    "Model returned non-conforming JSON; re-asking"
                );
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "summarization failed".into()))
}

/// Fallback one-liner when bio generation fails for an entity.
pub fn fallback_bio(name: &str) -> String {
    format!(
        "{name} is a recurring figure in the document releases and reporting covered by this site."
    )
}

/// One small request per unseen entity; any failure substitutes the
/// fallback so a single bad bio never aborts an index rebuild.
#[instrument(level = "info", skip_all, fields(%name))]
pub async fn generate_bio(client: &ChatClient, name: &str) -> String {
    let prompt = format!(
        "Write a neutral, factual 2-3 sentence biography of {name}, suitable as the intro on a page \
         collecting news coverage that mentions them. Plain text only, no markdown, no headline."
    );
    let bio_client = client.with_max_tokens(BIO_MAX_TOKENS);
    match ask_with_backoff(&bio_client, &prompt).await {
        Ok(text) => {
            let trimmed = text.trim().to_string();
            if trimmed.is_empty() {
                warn!("Bio response was empty; using fallback");
                fallback_bio(name)
            } else {
                trimmed
            }
        }
        Err(e) => {
            warn!(error = %e, "Bio generation failed; using fallback");
            fallback_bio(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryOutcome;

    const VALID: &str = r#"{
        "theme_headline": "Prince Andrew Named in New Documents",
        "featured_name": "Prince Andrew",
        "names": ["Prince Andrew", "prince andrew", "Ghislaine Maxwell"],
        "short_bullets": [
            {"name": "Lead", "text": "short", "source": "BBC", "url": "https://bbc.com/x"}
        ],
        "long_bullets": [
            {"name": "Lead", "text": "long", "source": "BBC", "url": "https://bbc.com/x"}
        ]
    }"#;

    #[test]
    fn test_extract_json_prefers_fenced_block() {
        let raw = format!("Here you go:\n```json\n{VALID}\n```\nanything after");
        let extracted = extract_json(&raw).unwrap();
        assert!(extracted.starts_with('{'));
        assert!(extracted.contains("theme_headline"));
    }

    #[test]
    fn test_extract_json_brace_fallback() {
        let raw = format!("Sure! {VALID} hope that helps");
        let extracted = extract_json(&raw).unwrap();
        assert!(extracted.starts_with('{') && extracted.ends_with('}'));
        assert!(serde_json::from_str::<serde_json::Value>(&extracted).is_ok());
    }

    #[test]
    fn test_extract_json_none_without_braces() {
        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn test_repair_strips_trailing_commas() {
        let broken = r#"{"names": ["a", "b",], "x": 1,}"#;
        let repaired = repair_json(broken);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn test_repair_inserts_missing_commas() {
        let broken = "{\"names\": [\"a\"\n\"b\"], \"bullets\": [{\"n\": 1}\n{\"n\": 2}]}";
        let repaired = repair_json(broken);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["names"].as_array().unwrap().len(), 2);
        assert_eq!(value["bullets"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_repair_leaves_valid_json_alone() {
        let valid: serde_json::Value = serde_json::from_str(VALID).unwrap();
        let after: serde_json::Value = serde_json::from_str(&repair_json(VALID)).unwrap();
        assert_eq!(valid, after);
    }

    #[test]
    fn test_parse_summary_produced_and_names_deduped() {
        match parse_summary_text(VALID).unwrap() {
            SummaryOutcome::Produced(summary) => {
                assert_eq!(summary.theme_headline, "Prince Andrew Named in New Documents");
                assert_eq!(summary.names, vec!["Prince Andrew", "Ghislaine Maxwell"]);
            }
            SummaryOutcome::NoNews => panic!("expected Produced"),
        }
    }

    #[test]
    fn test_parse_summary_no_news() {
        let raw = r#"Nothing stands out today. {"no_news": true}"#;
        assert!(matches!(
            parse_summary_text(raw).unwrap(),
            SummaryOutcome::NoNews
        ));
    }

    #[test]
    fn test_parse_summary_truncated_response_is_error() {
        let cut = &VALID[..VALID.len() - 40];
        assert!(parse_summary_text(cut).is_err());
    }

    #[test]
    fn test_parse_summary_rejects_empty_headline() {
        let raw = r#"{"theme_headline": "", "long_bullets": [{"name":"a","text":"b","source":"c","url":"d"}]}"#;
        assert!(parse_summary_text(raw).is_err());
    }

    #[test]
    fn test_short_bullets_default_to_long() {
        let raw = r#"{
            "theme_headline": "H",
            "names": ["A"],
            "long_bullets": [{"name":"a","text":"b","source":"c","url":"d"}]
        }"#;
        match parse_summary_text(raw).unwrap() {
            SummaryOutcome::Produced(summary) => {
                assert_eq!(summary.short_bullets, summary.long_bullets);
            }
            SummaryOutcome::NoNews => panic!("expected Produced"),
        }
    }

    #[test]
    fn test_build_prompt_embeds_items_and_slugs() {
        let items = vec![crate::models::NewsItem {
            title: "Epstein Files Released".to_string(),
            url: "https://news.example/a".to_string(),
            source: "Example News".to_string(),
            published_at: None,
        }];
        let slugs = vec!["daily-feb-8-2026".to_string()];
        let ctx = SummarizeContext {
            today: chrono::NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            existing_slugs: &slugs,
        };
        let prompt = build_prompt(&items, &ctx);
        assert!(prompt.contains("Epstein Files Released"));
        assert!(prompt.contains("daily-feb-8-2026"));
        assert!(prompt.contains("no_news"));
        assert!(prompt.contains("2026-02-09"));
    }
}
