//! Entity index builder: regenerates the per-person pages from the article
//! documents already on disk.
//!
//! The generated site is the only datastore here. Every rebuild scans all
//! `daily-*.html` files with structural selectors (not regexes — reads are
//! the one place the markup is parsed properly), groups them by tag, and
//! rewrites every person page from scratch. The rebuild is a materialized
//! view: idempotent, total, byte-identical on unchanged inputs.
//!
//! Biographies are the only lazily-created state: the first time a name is
//! seen with no stored bio, one is requested from the summarizer adapter and
//! persisted to `people/bios.json` forever after.

use crate::api::ChatClient;
use crate::models::ArticleRecord;
use crate::summarizer::{fallback_bio, generate_bio};
use crate::utils::slugify_name;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write as _;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Extract the fields a person page needs from one article document.
///
/// Every selector is independent; a missing field degrades to empty rather
/// than failing the scan.
pub fn scan_article(slug: &str, html: &str) -> ArticleRecord {
    let doc = Html::parse_document(html);

    let select_text = |css: &str| -> String {
        Selector::parse(css)
            .ok()
            .and_then(|sel| {
                doc.select(&sel)
                    .next()
                    .map(|el| el.text().collect::<Vec<_>>().join("").trim().to_string())
            })
            .unwrap_or_default()
    };
    let select_attr = |css: &str, attr: &str| -> String {
        Selector::parse(css)
            .ok()
            .and_then(|sel| {
                doc.select(&sel)
                    .next()
                    .and_then(|el| el.value().attr(attr))
                    .map(|v| v.to_string())
            })
            .unwrap_or_default()
    };

    let tags = Selector::parse(".article-tag")
        .ok()
        .map(|sel| {
            doc.select(&sel)
                .map(|el| el.text().collect::<Vec<_>>().join("").trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    ArticleRecord {
        slug: slug.to_string(),
        headline: select_text("h1"),
        date_iso: select_attr("time[datetime]", "datetime"),
        tags,
        thumb: {
            let og = select_attr(r#"meta[property="og:image"]"#, "content");
            if og.is_empty() {
                format!("images/{slug}.png")
            } else {
                og
            }
        },
        lede: select_attr(r#"meta[name="description"]"#, "content"),
    }
}

/// Group articles by tag name. Within each group articles sort descending
/// by ISO date string, which is date-correct for zero-padded `YYYY-MM-DD`.
pub fn group_by_tag(records: &[ArticleRecord]) -> BTreeMap<String, Vec<&ArticleRecord>> {
    let mut index: BTreeMap<String, Vec<&ArticleRecord>> = BTreeMap::new();
    for record in records {
        for tag in &record.tags {
            index.entry(tag.clone()).or_default().push(record);
        }
    }
    for articles in index.values_mut() {
        articles.sort_by(|a, b| b.date_iso.cmp(&a.date_iso).then(a.slug.cmp(&b.slug)));
    }
    index
}

/// Sidebar ordering: descending article count, then name.
pub fn sidebar_order(index: &BTreeMap<String, Vec<&ArticleRecord>>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = index
        .iter()
        .map(|(name, articles)| (name.clone(), articles.len()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries
}

/// Render one person page.
///
/// Pure and deterministic: the whole rebuild inherits idempotency from this
/// function plus the sorted inputs.
pub fn build_entity_page(
    name: &str,
    bio: Option<&str>,
    articles: &[&ArticleRecord],
    sidebar: &[(String, usize)],
    site_name: &str,
) -> String {
    let slug = slugify_name(name);
    let mut page = String::new();

    writeln!(page, "<!doctype html>").unwrap();
    writeln!(page, "<html lang=\"en\">").unwrap();
    writeln!(page, "<head>").unwrap();
    writeln!(page, "<meta charset=\"utf-8\">").unwrap();
    writeln!(page, "<title>{name} — {site_name}</title>").unwrap();
    writeln!(
        page,
        "<link rel=\"stylesheet\" href=\"../style.css\" data-person=\"{slug}\">"
    )
    .unwrap();
    writeln!(page, "</head>").unwrap();
    writeln!(page, "<body class=\"person-page\">").unwrap();

    writeln!(page, "<aside class=\"person-sidebar\">").unwrap();
    writeln!(page, "  <h2>People in the Files</h2>").unwrap();
    writeln!(page, "  <ul>").unwrap();
    for (other, count) in sidebar {
        writeln!(
            page,
            "    <li><a href=\"{}.html\">{other}</a> <span class=\"count\">({count})</span></li>",
            slugify_name(other)
        )
        .unwrap();
    }
    writeln!(page, "  </ul>").unwrap();
    writeln!(page, "</aside>").unwrap();

    writeln!(page, "<main>").unwrap();
    writeln!(page, "<h1>{name}</h1>").unwrap();
    if let Some(bio) = bio {
        writeln!(page, "<p class=\"person-bio\">{bio}</p>").unwrap();
    }
    writeln!(page, "<section class=\"person-articles\">").unwrap();
    for article in articles {
        writeln!(page, "  <article class=\"article-card\">").unwrap();
        writeln!(
            page,
            "    <a href=\"../{}.html\" class=\"article-thumb\"><img src=\"../{}\" alt=\"{}\" loading=\"lazy\"></a>",
            article.slug, article.thumb, article.headline
        )
        .unwrap();
        writeln!(
            page,
            "    <time datetime=\"{}\">{}</time>",
            article.date_iso, article.date_iso
        )
        .unwrap();
        writeln!(
            page,
            "    <h3><a href=\"../{}.html\">{}</a></h3>",
            article.slug, article.headline
        )
        .unwrap();
        if !article.lede.is_empty() {
            writeln!(page, "    <p class=\"lede\">{}</p>", article.lede).unwrap();
        }
        writeln!(page, "  </article>").unwrap();
    }
    writeln!(page, "</section>").unwrap();
    writeln!(page, "</main>").unwrap();
    writeln!(page, "</body>").unwrap();
    writeln!(page, "</html>").unwrap();

    page
}

/// Load the persisted bios map; a missing file is an empty map.
pub async fn load_bios(site_root: &str) -> BTreeMap<String, String> {
    let path = bios_path(site_root);
    match fs::read_to_string(&path).await {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(%path, error = %e, "bios.json unparsable; starting fresh");
                BTreeMap::new()
            }
        },
        Err(_) => BTreeMap::new(),
    }
}

pub async fn save_bios(
    site_root: &str,
    bios: &BTreeMap<String, String>,
) -> Result<(), Box<dyn Error>> {
    let path = bios_path(site_root);
    fs::write(&path, serde_json::to_string_pretty(bios)?).await?;
    Ok(())
}

fn bios_path(site_root: &str) -> String {
    format!("{}/people/bios.json", site_root.trim_end_matches('/'))
}

/// List the slugs of every article document under the site root.
pub async fn list_article_slugs(site_root: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut slugs = Vec::new();
    let mut entries = fs::read_dir(site_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("daily-") && name.ends_with(".html") {
            slugs.push(name.trim_end_matches(".html").to_string());
        }
    }
    slugs.sort();
    Ok(slugs)
}

/// Scan every article document into records.
pub async fn scan_all_articles(site_root: &str) -> Result<Vec<ArticleRecord>, Box<dyn Error>> {
    let root = site_root.trim_end_matches('/');
    let mut records = Vec::new();
    for slug in list_article_slugs(site_root).await? {
        let path = format!("{root}/{slug}.html");
        match fs::read_to_string(&path).await {
            Ok(html) => records.push(scan_article(&slug, &html)),
            Err(e) => warn!(%path, error = %e, "Failed reading article; skipping"),
        }
    }
    debug!(count = records.len(), "Scanned article documents");
    Ok(records)
}

/// Full rebuild: scan, group, fill missing bios, rewrite every person page.
///
/// `client` is optional so `rebuild-people` works offline; without it every
/// missing bio uses the generic fallback (and is persisted as such).
#[instrument(level = "info", skip_all, fields(site_root = %site_root))]
pub async fn rebuild(
    site_root: &str,
    site_name: &str,
    client: Option<&ChatClient>,
) -> Result<usize, Box<dyn Error>> {
    let records = scan_all_articles(site_root).await?;
    let index = group_by_tag(&records);
    let sidebar = sidebar_order(&index);

    let root = site_root.trim_end_matches('/');
    fs::create_dir_all(format!("{root}/people")).await?;

    let mut bios = load_bios(site_root).await;
    let mut new_bios = 0usize;
    for name in index.keys() {
        let slug = slugify_name(name);
        if bios.contains_key(&slug) {
            continue;
        }
        // Entities are independent: one failed bio never aborts the batch.
        let bio = match client {
            Some(client) => generate_bio(client, name).await,
            None => fallback_bio(name),
        };
        bios.insert(slug, bio);
        new_bios += 1;
    }
    if new_bios > 0 {
        save_bios(site_root, &bios).await?;
        info!(new_bios, "Persisted new biographies");
    }

    for (name, articles) in &index {
        let slug = slugify_name(name);
        let bio = bios.get(&slug).map(String::as_str);
        let page = build_entity_page(name, bio, articles, &sidebar, site_name);
        let path = format!("{root}/people/{slug}.html");
        fs::write(&path, page).await?;
    }

    info!(pages = index.len(), "Rebuilt person pages");
    Ok(index.len())
}
