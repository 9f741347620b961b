//! # Roundup Press
//!
//! A daily news-roundup publisher. Each run polls Google News RSS for the
//! configured queries, condenses the day's items into a fixed-schema summary
//! through an OpenAI-compatible LLM API, and folds the result into a static
//! site: a new article page cloned from the previous day's, a homepage card,
//! an RSS item, a sitemap entry, rebuilt per-person pages, and a rendered
//! newspaper-style thumbnail.
//!
//! ## Usage
//!
//! ```sh
//! roundup_press run
//! roundup_press post
//! roundup_press scrub --slug daily-feb-1-2026
//! ```
//!
//! ## Architecture
//!
//! The pipeline is deliberately sequential — each stage's output is the next
//! stage's input, and the site on disk is the only datastore:
//! 1. **Fetch**: poll the feed endpoint per query, dedupe, filter, cap
//! 2. **Summarize**: one LLM call (retried) producing the day's roundup JSON
//! 3. **Publish**: merge into the article template, then splice every shared
//!    surface at its anchor comment
//! 4. **Derive**: thumbnail, person pages, run report

use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod feed;
mod models;
mod outputs;
mod people;
mod scrub;
mod social;
mod summarizer;
mod thumb;
mod utils;

use api::ChatClient;
use cli::{Cli, Command};
use config::SiteConfig;
use models::{RunStatus, SummaryOutcome};
use outputs::{article, indexes, json};
use summarizer::SummarizeContext;
use utils::{date_from_slug, date_slug, ensure_writable_dir};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("roundup_press starting up");

    let args = Cli::parse();
    debug!(?args.config, "Parsed CLI arguments");

    let config = config::load_config(&args.config)?;
    info!(config_path = %args.config, site = %config.site_name, "Loaded configuration");

    match args.command {
        Command::Run { date } => {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|e| format!("invalid --date {raw:?}: {e}"))?,
                None => Utc::now().date_naive(),
            };
            run_pipeline(&config, date).await?;
        }
        Command::Post => {
            let Some(social_config) = config.social.as_ref() else {
                return Err("no [social] section in config".into());
            };
            social::post(&config, social_config).await?;
        }
        Command::RebuildPeople => {
            // Bio generation is best-effort here; an unset API key just
            // means fallback bios for any new names.
            let client = match ChatClient::from_config(&config.llm) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "LLM unavailable; new bios use the fallback text");
                    None
                }
            };
            people::rebuild(&config.site_root, &config.site_name, client.as_ref()).await?;
        }
        Command::Thumbs => {
            regenerate_thumbnails(&config).await?;
        }
        Command::Scrub { slug } => {
            scrub::scrub(&config, &slug).await?;
        }
        Command::Relede { updates } => {
            scrub::relede(&config, &updates).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// The daily publish pipeline for one date.
#[instrument(level = "info", skip(config), fields(date = %date))]
async fn run_pipeline(config: &SiteConfig, date: NaiveDate) -> Result<(), Box<dyn Error>> {
    let root = config.site_root.trim_end_matches('/').to_string();
    let slug = date_slug(date);

    // Idempotency gate: one article per day, re-runs are no-ops. A report
    // from today's real run stays in place so `post` still announces it.
    if tokio::fs::try_exists(format!("{root}/{slug}.html")).await? {
        warn!(%slug, "Article already exists; skipping this run");
        let already_reported = matches!(
            json::read_report(&config.site_root).await,
            Ok(report) if json::report_covers(&report, date)
        );
        if !already_reported {
            let report = json::build_report(
                date,
                &slug,
                "",
                RunStatus::SkippedExisting,
                Vec::new(),
                Vec::new(),
            );
            json::write_report(&report, &config.site_root).await?;
        }
        return Ok(());
    }

    if let Err(e) = ensure_writable_dir(&config.site_root).await {
        error!(
            path = %config.site_root,
            error = %e,
            "Site root is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Fetch ----
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(feed::FETCH_TIMEOUT_SECS))
        .build()?;
    let items = feed::fetch(&http, config, Utc::now()).await;
    if items.is_empty() {
        return Err("no feed items survived filtering; nothing to summarize".into());
    }
    info!(count = items.len(), "Items gathered for summarization");

    // ---- Summarize ----
    let existing_slugs = people::list_article_slugs(&config.site_root).await?;
    let client = ChatClient::from_config(&config.llm)?;
    let ctx = SummarizeContext {
        today: date,
        existing_slugs: &existing_slugs,
    };
    let summary = match summarizer::summarize(&client, &items, &ctx).await? {
        SummaryOutcome::Produced(summary) => summary,
        SummaryOutcome::NoNews => {
            info!("Model reported no newsworthy items today; publishing nothing");
            let report = json::build_report(
                date,
                &slug,
                "",
                RunStatus::NoNews,
                Vec::new(),
                Vec::new(),
            );
            json::write_report(&report, &config.site_root).await?;
            return Ok(());
        }
    };
    info!(headline = %summary.theme_headline, names = summary.names.len(), "Summary produced");

    // ---- Merge the article from the most recent existing one ----
    let template_slug = existing_slugs
        .iter()
        .filter_map(|s| date_from_slug(s).map(|d| (d, s)))
        .max()
        .map(|(_, s)| s.clone())
        .ok_or("no existing article to use as a template; seed the site first")?;
    let template_html =
        tokio::fs::read_to_string(format!("{root}/{template_slug}.html")).await?;

    let html = article::merge_article(
        &summary,
        date,
        &template_html,
        &template_slug,
        &slug,
        &config.site_name,
    );
    let article_path = format!("{root}/{slug}.html");
    tokio::fs::write(&article_path, &html).await?;
    info!(path = %article_path, "Wrote article");

    // ---- Thumbnail ----
    let vol_num = existing_slugs.len() + 1;
    let headline = format!("{}: {}", utils::month_day(date), summary.theme_headline);
    if let Err(e) = thumb::write_thumbnail(
        &config.site_root,
        &slug,
        &headline,
        date,
        &config.site_name,
        &config.tagline,
        vol_num,
    )
    .await
    {
        error!(error = %e, "Thumbnail rendering failed; article ships without one");
    }

    // ---- Shared surfaces ----
    let mut surfaces = Vec::new();

    let card = indexes::build_index_card(&summary, date, &slug, vol_num);
    let index_path = format!("{root}/index.html");
    if indexes::update_surface(&index_path, indexes::INDEX_ANCHOR, &card).await? {
        surfaces.push("index.html".to_string());
    }

    let item = indexes::build_feed_item(&summary, date, &slug, &config.base_url);
    let feed_path = format!("{root}/feed.xml");
    if indexes::update_surface(&feed_path, indexes::FEED_ANCHOR, &item).await? {
        surfaces.push("feed.xml".to_string());
    }

    let entry = indexes::build_sitemap_entry(date, &slug, &config.base_url);
    let sitemap_path = format!("{root}/sitemap.xml");
    if indexes::update_surface(&sitemap_path, indexes::SITEMAP_ANCHOR, &entry).await? {
        let sitemap = tokio::fs::read_to_string(&sitemap_path).await?;
        let updated = indexes::rewrite_homepage_lastmod(&sitemap, &config.base_url, date);
        tokio::fs::write(&sitemap_path, updated).await?;
        surfaces.push("sitemap.xml".to_string());
    }

    // ---- Person pages ----
    people::rebuild(&config.site_root, &config.site_name, Some(&client)).await?;

    // ---- Run report ----
    let report = json::build_report(
        date,
        &slug,
        &headline,
        RunStatus::Published,
        summary.names.clone(),
        surfaces,
    );
    json::write_report(&report, &config.site_root).await?;

    info!(%slug, "Published");
    Ok(())
}

/// Re-render every thumbnail from the articles on disk, in date order so
/// volume numbers stay stable.
#[instrument(level = "info", skip_all)]
async fn regenerate_thumbnails(config: &SiteConfig) -> Result<(), Box<dyn Error>> {
    let records = people::scan_all_articles(&config.site_root).await?;
    let mut dated: Vec<_> = records
        .iter()
        .filter_map(|r| date_from_slug(&r.slug).map(|d| (d, r)))
        .collect();
    dated.sort_by_key(|(d, _)| *d);

    for (i, (date, record)) in dated.iter().enumerate() {
        thumb::write_thumbnail(
            &config.site_root,
            &record.slug,
            &record.headline,
            *date,
            &config.site_name,
            &config.tagline,
            i + 1,
        )
        .await?;
    }
    info!(count = dated.len(), "Regenerated thumbnails");
    Ok(())
}
