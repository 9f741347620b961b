//! Anchor-relative updates to the three singleton documents: homepage,
//! RSS feed, sitemap.
//!
//! Each document carries a fixed marker comment; a run inserts exactly one
//! new fragment immediately after the marker and leaves every other byte
//! unchanged. A missing marker is a logged warning and a skipped surface,
//! never a failed run: the surfaces are independent of each other.

use crate::models::RoundupSummary;
use crate::outputs::article::build_tag_links;
use crate::utils::{month_day, readable_date, slugify_name};
use chrono::NaiveDate;
use regex::Regex;
use std::error::Error;
use std::fmt::Write as _;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Marker in `index.html`; the newest card lands right after it.
pub const INDEX_ANCHOR: &str = "<!-- latest-roundup -->";
/// Marker in `feed.xml`.
pub const FEED_ANCHOR: &str = "<!-- latest-item -->";
/// Marker in `sitemap.xml`.
pub const SITEMAP_ANCHOR: &str = "<!-- latest-url -->";

/// Insert `payload` immediately after the first occurrence of `anchor`.
///
/// Returns `None` when the anchor is absent; every byte outside the
/// insertion point is preserved exactly.
pub fn insert_after_anchor(doc: &str, anchor: &str, payload: &str) -> Option<String> {
    let pos = doc.find(anchor)? + anchor.len();
    let mut out = String::with_capacity(doc.len() + payload.len());
    out.push_str(&doc[..pos]);
    out.push_str(payload);
    out.push_str(&doc[pos..]);
    Some(out)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The homepage card for a day's roundup.
pub fn build_index_card(
    summary: &RoundupSummary,
    date: NaiveDate,
    slug: &str,
    vol_num: usize,
) -> String {
    let date_readable = readable_date(date);
    let data_tags = summary
        .names
        .iter()
        .take(crate::outputs::article::MAX_TAGS)
        .map(|n| slugify_name(n))
        .collect::<Vec<_>>()
        .join(",");

    let mut bullets = String::new();
    for bullet in &summary.short_bullets {
        writeln!(
            bullets,
            r#"                                <li><strong>{}</strong> {} <a href="{}" target="_blank" class="source-link">{} →</a></li>"#,
            bullet.name, bullet.text, bullet.url, bullet.source
        )
        .unwrap();
    }

    format!(
        r#"
                <!-- DAILY ROUNDUP: {date_readable} -->
                <article class="article-preview featured" data-tags="{data_tags}">
                    <div class="article-top">
                        <a href="{slug}.html" class="article-thumb">
                            <img src="images/{slug}.png?v={vol_num}" alt="{date_readable} news roundup" loading="lazy">
                        </a>
                        <div class="article-title-section">
                            <div class="article-meta">
                                <div class="article-tags">
{tags}                                </div>
                                <time datetime="{date}" class="article-date">{date_readable}</time>
                            </div>
                            <h2><a href="{slug}.html">{month_day}: Read Daily Summary →</a></h2>
                            <ul class="lede-bullets">
{bullets}                            </ul>
                        </div>
                    </div>
                </article>
"#,
        tags = build_tag_links(&summary.names),
        month_day = month_day(date),
    )
}

/// The RSS `<item>` for a day's roundup. Noon GMT keeps the pubDate stable
/// regardless of when the run actually fired.
pub fn build_feed_item(
    summary: &RoundupSummary,
    date: NaiveDate,
    slug: &str,
    base_url: &str,
) -> String {
    let pub_date = date
        .and_hms_opt(12, 0, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default();
    let title = xml_escape(&format!(
        "{}: {}",
        month_day(date),
        summary.theme_headline
    ));
    let description = xml_escape(
        &summary
            .short_bullets
            .first()
            .map(|b| format!("{} {}", b.name, b.text))
            .unwrap_or_else(|| summary.theme_headline.clone()),
    );
    format!(
        r#"
    <item>
      <title>{title}</title>
      <link>{base_url}/{slug}.html</link>
      <guid>{base_url}/{slug}.html</guid>
      <pubDate>{pub_date}</pubDate>
      <description>{description}</description>
    </item>
"#
    )
}

/// The sitemap `<url>` entry for a day's roundup.
pub fn build_sitemap_entry(date: NaiveDate, slug: &str, base_url: &str) -> String {
    format!(
        r#"
  <url>
    <loc>{base_url}/{slug}.html</loc>
    <lastmod>{date}</lastmod>
  </url>
"#
    )
}

/// Rewrite the homepage `<lastmod>` in the sitemap to today's date.
///
/// Anchored on the homepage `<loc>` so article entries are never touched.
pub fn rewrite_homepage_lastmod(sitemap: &str, base_url: &str, date: NaiveDate) -> String {
    let pattern = format!(
        r"(<loc>{}/</loc>\s*<lastmod>)[^<]*(</lastmod>)",
        regex::escape(base_url)
    );
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace(sitemap, format!("${{1}}{date}${{2}}"))
            .into_owned(),
        Err(_) => sitemap.to_string(),
    }
}

/// Read-modify-write one singleton document: insert `payload` after
/// `anchor`. An unreadable file or a missing anchor is a logged warning
/// and a skipped surface, never a failed run.
///
/// Returns whether the surface was actually updated.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn update_surface(
    path: &str,
    anchor: &str,
    payload: &str,
) -> Result<bool, Box<dyn Error>> {
    let doc = match fs::read_to_string(path).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Surface unreadable; skipping this surface");
            return Ok(false);
        }
    };
    match insert_after_anchor(&doc, anchor, payload) {
        Some(updated) => {
            fs::write(path, updated).await?;
            info!("Surface updated");
            Ok(true)
        }
        None => {
            warn!(anchor, "Anchor marker missing; skipping this surface");
            Ok(false)
        }
    }
}
