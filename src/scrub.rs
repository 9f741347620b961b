//! Maintenance operations on the published site.
//!
//! `scrub` removes an article and every trace of it from the shared surfaces;
//! `relede` swaps lede paragraphs in place. Both edit the surfaces with the
//! same surgical-splice discipline the daily run uses: find the exact block,
//! remove or replace it, touch nothing else.

use crate::config::SiteConfig;
use crate::people;
use serde::Deserialize;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Remove the enclosing block that mentions `needle`.
///
/// Scans for `needle`, backtracks to the nearest preceding `open_tag`, and
/// cuts forward through the matching `close_tag` plus any trailing blank
/// space up to and including the next newline. Returns `None` when the
/// needle (or its enclosing block) is absent.
pub fn remove_block(doc: &str, needle: &str, open_tag: &str, close_tag: &str) -> Option<String> {
    let hit = doc.find(needle)?;
    let mut start = doc[..hit].rfind(open_tag)?;
    let close = doc[hit..].find(close_tag)? + hit + close_tag.len();
    // The open tag must actually enclose the needle, not belong to an
    // earlier sibling that already closed.
    if doc[start..hit].contains(close_tag) {
        return None;
    }
    let bytes = doc.as_bytes();
    // The cut spans the whole source line: leading indentation before the
    // open tag, trailing whitespace and the newline after the close tag.
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    let mut end = close;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'\r' {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'\n' {
        end += 1;
    }
    let mut out = String::with_capacity(doc.len());
    out.push_str(&doc[..start]);
    out.push_str(&doc[end..]);
    Some(out)
}

async fn scrub_surface(
    path: &str,
    needle: &str,
    open_tag: &str,
    close_tag: &str,
) -> Result<bool, Box<dyn Error>> {
    let doc = match fs::read_to_string(path).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(%path, error = %e, "Surface unreadable; skipping");
            return Ok(false);
        }
    };
    match remove_block(&doc, needle, open_tag, close_tag) {
        Some(updated) => {
            fs::write(path, updated).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Remove one article and all references to it: the document itself, its
/// thumbnail, its homepage card, its feed item, and its sitemap entry. The
/// person pages are rebuilt afterwards by the caller.
#[instrument(level = "info", skip(config), fields(slug = %slug))]
pub async fn scrub_article(config: &SiteConfig, slug: &str) -> Result<(), Box<dyn Error>> {
    let root = config.site_root.trim_end_matches('/');
    let needle = format!("{slug}.html");

    // Homepage cards start at their dated comment; hand-written cards may
    // lack it, so the bare tag is the fallback anchor.
    let index_path = format!("{root}/index.html");
    let mut removed = scrub_surface(&index_path, &needle, "<!-- DAILY ROUNDUP", "</article>").await?;
    if !removed {
        removed = scrub_surface(&index_path, &needle, "<article", "</article>").await?;
    }
    if removed {
        info!(path = %index_path, "Removed reference");
    } else {
        warn!(path = %index_path, "No reference found");
    }

    for (path, open_tag, close_tag) in [
        (format!("{root}/feed.xml"), "<item>", "</item>"),
        (format!("{root}/sitemap.xml"), "<url>", "</url>"),
    ] {
        if scrub_surface(&path, &needle, open_tag, close_tag).await? {
            info!(%path, "Removed reference");
        } else {
            warn!(%path, "No reference found");
        }
    }

    for path in [
        format!("{root}/{slug}.html"),
        format!("{root}/images/{slug}.png"),
    ] {
        match fs::remove_file(&path).await {
            Ok(()) => info!(%path, "Deleted"),
            Err(e) => warn!(%path, error = %e, "Not deleted"),
        }
    }
    Ok(())
}

/// Scrub each slug, then rebuild the person pages so no card points at a
/// removed article.
pub async fn scrub(config: &SiteConfig, slugs: &[String]) -> Result<(), Box<dyn Error>> {
    for slug in slugs {
        scrub_article(config, slug).await?;
    }
    people::rebuild(&config.site_root, &config.site_name, None).await?;
    Ok(())
}

/// One lede replacement, keyed by the exact current text.
#[derive(Debug, Deserialize)]
pub struct LedeUpdate {
    pub old: String,
    pub new: String,
}

/// Replace `<p class="lede">old</p>` with the new text in `doc`. Exact
/// match only; `None` means the old lede was not found verbatim.
pub fn replace_lede(doc: &str, update: &LedeUpdate) -> Option<String> {
    let target = format!("<p class=\"lede\">{}</p>", update.old);
    if !doc.contains(&target) {
        return None;
    }
    let replacement = format!("<p class=\"lede\">{}</p>", update.new);
    Some(doc.replace(&target, &replacement))
}

/// Apply a JSON file of lede updates to the homepage.
#[instrument(level = "info", skip(config), fields(updates = %updates_path))]
pub async fn relede(config: &SiteConfig, updates_path: &str) -> Result<(), Box<dyn Error>> {
    let raw = fs::read_to_string(updates_path).await?;
    let updates: Vec<LedeUpdate> = serde_json::from_str(&raw)?;
    info!(count = updates.len(), "Loaded lede updates");

    let root = config.site_root.trim_end_matches('/');
    let path = format!("{root}/index.html");
    let mut doc = fs::read_to_string(&path).await?;
    let mut applied = 0usize;
    for update in &updates {
        if let Some(updated) = replace_lede(&doc, update) {
            doc = updated;
            applied += 1;
        } else {
            warn!(old = %update.old, "Lede not found verbatim; skipping");
        }
    }
    if applied > 0 {
        fs::write(&path, doc).await?;
    }
    info!(applied, total = updates.len(), "Lede update pass complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "<main>\n  <article class=\"article-card\">\n    <a href=\"daily-feb-1-2026.html\">One</a>\n  </article>\n  <article class=\"article-card\">\n    <a href=\"daily-feb-2-2026.html\">Two</a>\n  </article>\n</main>\n";

    #[test]
    fn test_remove_block_cuts_only_target() {
        let out = remove_block(INDEX, "daily-feb-1-2026.html", "<article", "</article>").unwrap();
        assert!(!out.contains("daily-feb-1-2026"));
        assert!(out.contains("daily-feb-2-2026"));
        assert!(out.starts_with("<main>\n  <article"));
    }

    #[test]
    fn test_remove_block_exact_splice() {
        let out = remove_block(INDEX, "daily-feb-1-2026.html", "<article", "</article>").unwrap();
        assert_eq!(
            out,
            "<main>\n  <article class=\"article-card\">\n    <a href=\"daily-feb-2-2026.html\">Two</a>\n  </article>\n</main>\n"
        );
    }

    #[test]
    fn test_remove_block_second_item() {
        let out = remove_block(INDEX, "daily-feb-2-2026.html", "<article", "</article>").unwrap();
        assert!(out.contains("daily-feb-1-2026"));
        assert!(!out.contains("daily-feb-2-2026"));
        assert!(out.ends_with("</main>\n"));
    }

    #[test]
    fn test_remove_block_from_dated_comment() {
        let doc = "<main>\n  <!-- DAILY ROUNDUP: February 1, 2026 -->\n  <article class=\"article-preview featured\">\n    <a href=\"daily-feb-1-2026.html\">One</a>\n  </article>\n  <article>\n    <a href=\"daily-feb-2-2026.html\">Two</a>\n  </article>\n</main>\n";
        let out =
            remove_block(doc, "daily-feb-1-2026.html", "<!-- DAILY ROUNDUP", "</article>").unwrap();
        assert!(!out.contains("DAILY ROUNDUP"));
        assert!(!out.contains("daily-feb-1-2026"));
        assert!(out.contains("daily-feb-2-2026"));
    }

    #[test]
    fn test_remove_block_missing_needle() {
        assert!(remove_block(INDEX, "daily-mar-1-2026.html", "<article", "</article>").is_none());
    }

    #[test]
    fn test_remove_block_feed_item() {
        let feed = "<channel>\n<!-- latest-item -->\n<item>\n<link>https://x/daily-feb-1-2026.html</link>\n</item>\n<item>\n<link>https://x/daily-jan-31-2026.html</link>\n</item>\n</channel>\n";
        let out = remove_block(feed, "daily-feb-1-2026.html", "<item>", "</item>").unwrap();
        assert!(!out.contains("feb-1"));
        assert!(out.contains("jan-31"));
        assert!(out.contains("<!-- latest-item -->"));
    }

    #[test]
    fn test_remove_block_rejects_closed_sibling() {
        // The needle sits outside any block; the nearest preceding open tag
        // belongs to a sibling that already closed.
        let doc = "<item>a</item> stray daily-feb-1-2026.html text";
        assert!(remove_block(doc, "daily-feb-1-2026.html", "<item>", "</item>").is_none());
    }

    #[test]
    fn test_replace_lede_exact_match() {
        let doc = "<h1>H</h1>\n<p class=\"lede\">Old lede text.</p>\n<ul></ul>";
        let update = LedeUpdate {
            old: "Old lede text.".to_string(),
            new: "New lede text.".to_string(),
        };
        let out = replace_lede(doc, &update).unwrap();
        assert!(out.contains("<p class=\"lede\">New lede text.</p>"));
        assert!(!out.contains("Old lede"));
    }

    #[test]
    fn test_replace_lede_requires_verbatim_old() {
        let doc = "<p class=\"lede\">Old lede text.</p>";
        let update = LedeUpdate {
            old: "old lede text.".to_string(),
            new: "New".to_string(),
        };
        assert!(replace_lede(doc, &update).is_none());
    }
}
