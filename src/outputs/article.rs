//! Article page merge: clone the newest existing article document and
//! substitute the new day's content into it.
//!
//! Every substitution is anchored on a stable markup landmark (a wrapping
//! tag or fixed attribute), never a line position. The substitutions run in
//! a fixed order chosen so that no replacement's inserted text can be
//! re-matched by a later pattern: the dateline patterns are anchored on
//! `<time>`/`</time>`, so the "February 9:" prefix written into `<title>`
//! and `<h1>` is never touched by them, and the slug rename runs last so it
//! sees every cross-reference the template carried.

use crate::models::RoundupSummary;
use crate::utils::{month_day, readable_date, slugify_name};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<title>.*?</title>").unwrap());
static META_DESC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta name="description" content=".*?">"#).unwrap());
static TIME_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<time datetime=".*?""#).unwrap());
static TIME_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">[A-Z][a-z]+ \d{1,2}, \d{4}</time>").unwrap());
static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1>.*?</h1>").unwrap());
static TAGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="article-tags">.*?</div>"#).unwrap());
static BULLETS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<ul class="lede-bullets">.*?</ul>"#).unwrap());

/// How many names become visible tags on a page.
pub const MAX_TAGS: usize = 4;

/// The meta-description is the first short bullet, clipped.
fn meta_description(summary: &RoundupSummary) -> String {
    match summary.short_bullets.first() {
        Some(bullet) => {
            let text: String = bullet.text.chars().take(100).collect();
            format!("{} {}...", bullet.name, text)
        }
        None => summary.theme_headline.clone(),
    }
}

/// Tag links for the first [`MAX_TAGS`] names. The same markup is reused on
/// the homepage card, so slug and query formatting must match byte for byte.
pub fn build_tag_links(names: &[String]) -> String {
    let mut out = String::new();
    for name in names.iter().take(MAX_TAGS) {
        let query = urlencoding::encode(&name.to_lowercase()).into_owned();
        writeln!(
            out,
            r#"                    <a href="index.html?search={}" class="article-tag" data-slug="{}">{}</a>"#,
            query,
            slugify_name(name),
            name
        )
        .unwrap();
    }
    out
}

/// The full-length bullet list for the article body.
fn build_bullet_list(summary: &RoundupSummary) -> String {
    let mut out = String::new();
    for bullet in &summary.long_bullets {
        writeln!(
            out,
            r#"                <li><strong>{}</strong> {} <a href="{}" target="_blank" class="source-link">{} →</a></li>"#,
            bullet.name, bullet.text, bullet.url, bullet.source
        )
        .unwrap();
    }
    out
}

/// Merge the summary into the template document, yielding the new day's
/// article page.
///
/// Pure: no I/O, byte-deterministic. Bytes outside the matched anchor spans
/// are untouched.
pub fn merge_article(
    summary: &RoundupSummary,
    date: NaiveDate,
    template_html: &str,
    template_slug: &str,
    new_slug: &str,
    site_name: &str,
) -> String {
    use regex::NoExpand;

    let prefix = month_day(date);
    let headline = format!("{prefix}: {}", summary.theme_headline);

    // NoExpand everywhere: the inserted text is news copy and may contain `$`.
    let title = format!("<title>{headline} — {site_name}</title>");
    let html = TITLE_RE.replace(template_html, NoExpand(&title));
    let desc = format!(r#"<meta name="description" content="{}">"#, meta_description(summary));
    let html = META_DESC_RE.replace(&html, NoExpand(&desc));
    let time_open = format!(r#"<time datetime="{date}""#);
    let html = TIME_OPEN_RE.replace(&html, NoExpand(&time_open));
    let time_text = format!(">{}</time>", readable_date(date));
    let html = TIME_TEXT_RE.replace(&html, NoExpand(&time_text));
    let h1 = format!("<h1>{headline}</h1>");
    let html = H1_RE.replace(&html, NoExpand(&h1));
    let tags = format!(
        "<div class=\"article-tags\">\n{}                </div>",
        build_tag_links(&summary.names)
    );
    let html = TAGS_RE.replace(&html, NoExpand(&tags));
    let bullets = format!(
        "<ul class=\"lede-bullets\">\n{}            </ul>",
        build_bullet_list(summary)
    );
    let html = BULLETS_RE.replace(&html, NoExpand(&bullets));

    // Canonical link, Open Graph, Twitter, JSON-LD, and thumbnail URLs all
    // reference the template's own slug; one rename covers them all.
    html.replace(template_slug, new_slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bullet;

    fn summary() -> RoundupSummary {
        RoundupSummary {
            theme_headline: "Prince Andrew Named in New Documents".to_string(),
            featured_name: Some("Prince Andrew".to_string()),
            names: vec!["Prince Andrew".to_string(), "Ghislaine Maxwell".to_string()],
            short_bullets: vec![Bullet {
                name: "House committee".to_string(),
                text: "requests an interview.".to_string(),
                source: "BBC".to_string(),
                url: "https://bbc.example/x".to_string(),
            }],
            long_bullets: vec![Bullet {
                name: "House committee".to_string(),
                text: "requests a transcribed interview about the friendship.".to_string(),
                source: "BBC".to_string(),
                url: "https://bbc.example/x".to_string(),
            }],
        }
    }

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<title>February 9: Old Headline — The Daily Roundup</title>
<meta name="description" content="Old description...">
<link rel="canonical" href="https://roundup.press/daily-feb-9-2026.html">
</head>
<body>
<header>untouched header</header>
<time datetime="2026-02-09" class="article-date">February 9, 2026</time>
<h1>Old Headline</h1>
<div class="article-tags">
                    <a href="index.html?search=old" class="article-tag" data-slug="old">Old Name</a>
                </div>
<ul class="lede-bullets">
                <li><strong>Old</strong> bullet</li>
            </ul>
<img src="images/daily-feb-9-2026.png">
<footer>untouched footer</footer>
</body>
</html>"#;

    fn merged() -> String {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        merge_article(
            &summary(),
            date,
            TEMPLATE,
            "daily-feb-9-2026",
            "daily-feb-10-2026",
            "The Daily Roundup",
        )
    }

    #[test]
    fn test_h1_substitution() {
        let html = merged();
        assert!(html.contains("<h1>February 10: Prince Andrew Named in New Documents</h1>"));
        assert!(!html.contains("Old Headline"));
    }

    #[test]
    fn test_surrounding_markup_untouched() {
        let html = merged();
        assert!(html.contains("<header>untouched header</header>"));
        assert!(html.contains("<footer>untouched footer</footer>"));
    }

    #[test]
    fn test_dateline_updated() {
        let html = merged();
        assert!(html.contains(r#"<time datetime="2026-02-10" class="article-date">February 10, 2026</time>"#));
    }

    #[test]
    fn test_slug_renamed_everywhere() {
        let html = merged();
        assert!(!html.contains("daily-feb-9-2026"));
        assert!(html.contains(r#"href="https://roundup.press/daily-feb-10-2026.html""#));
        assert!(html.contains("images/daily-feb-10-2026.png"));
    }

    #[test]
    fn test_tags_use_shared_slugify() {
        let html = merged();
        assert!(html.contains(r#"data-slug="prince-andrew""#));
        assert!(html.contains(r#"data-slug="ghislaine-maxwell""#));
        assert!(html.contains("index.html?search=prince%20andrew"));
    }

    #[test]
    fn test_bullets_replaced() {
        let html = merged();
        assert!(html.contains("<strong>House committee</strong>"));
        assert!(html.contains(r#"class="source-link">BBC →</a>"#));
        assert!(!html.contains("<strong>Old</strong>"));
    }

    #[test]
    fn test_meta_description_from_first_short_bullet() {
        let html = merged();
        assert!(html.contains(
            r#"<meta name="description" content="House committee requests an interview....">"#
        ));
    }

    #[test]
    fn test_merge_is_deterministic() {
        assert_eq!(merged(), merged());
    }
}
