//! Utility functions for slugs, date labels, string manipulation, and
//! file system checks.
//!
//! The slug helpers here are load-bearing: the same `slugify_name` output is
//! used for article tag links, homepage cards, feed entries, sitemap entries,
//! and person-page filenames, so it must be a pure function.

use chrono::{Datelike, NaiveDate};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Convert a person's display name to the slug used everywhere on the site.
///
/// Lowercases, turns spaces into hyphens, and strips periods and apostrophes
/// (both straight and typographic).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_name("Jane Doe"), "jane-doe");
/// assert_eq!(slugify_name("Dr. Oz"), "dr-oz");
/// ```
pub fn slugify_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['.', '\'', '\u{2019}'], "")
        .replace(' ', "-")
}

/// The date-derived slug that keys one day's article document,
/// e.g. `daily-feb-9-2026`. Its existence on disk is the run's
/// idempotency check.
pub fn date_slug(date: NaiveDate) -> String {
    format!(
        "daily-{}-{}-{}",
        date.format("%b").to_string().to_lowercase(),
        date.day(),
        date.year()
    )
}

/// Recover the date from a `daily-<mon>-<day>-<year>` slug.
///
/// Returns `None` for filenames that don't follow the pattern; callers use
/// this to pick the newest existing article as the merge template.
pub fn date_from_slug(slug: &str) -> Option<NaiveDate> {
    let rest = slug.strip_prefix("daily-")?;
    let mut parts = rest.splitn(3, '-');
    let mon = parts.next()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    let month = match mon {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `February 9` — the prefix prepended to headlines on article pages.
pub fn month_day(date: NaiveDate) -> String {
    format!("{} {}", date.format("%B"), date.day())
}

/// `February 9, 2026` — the visible dateline.
pub fn readable_date(date: NaiveDate) -> String {
    format!("{} {}, {}", date.format("%B"), date.day(), date.year())
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Detect whether a serde_json error indicates truncated/incomplete JSON.
///
/// When the model response is cut off at the output-size limit, parsing fails
/// with an EOF error; the summarizer uses this to decide a full re-ask is
/// worth more than a repair pass.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then probes it with a throwaway file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Site directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_name_basic() {
        assert_eq!(slugify_name("Jane Doe"), "jane-doe");
        assert_eq!(slugify_name("Prince Andrew"), "prince-andrew");
    }

    #[test]
    fn test_slugify_name_strips_periods_and_apostrophes() {
        assert_eq!(slugify_name("Dr. Oz"), "dr-oz");
        assert_eq!(slugify_name("O'Brien"), "obrien");
        assert_eq!(slugify_name("O\u{2019}Brien"), "obrien");
    }

    #[test]
    fn test_slugify_name_is_pure() {
        let name = "Jean-Luc Brunel";
        let first = slugify_name(name);
        for _ in 0..10 {
            assert_eq!(slugify_name(name), first);
        }
    }

    #[test]
    fn test_date_slug() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        assert_eq!(date_slug(date), "daily-feb-9-2026");
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(date_slug(date), "daily-dec-31-2026");
    }

    #[test]
    fn test_date_slug_round_trips() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(date_from_slug(&date_slug(date)), Some(date));
    }

    #[test]
    fn test_date_from_slug_rejects_other_files() {
        assert_eq!(date_from_slug("index"), None);
        assert_eq!(date_from_slug("daily-notamonth-9-2026"), None);
        assert_eq!(date_from_slug("daily-feb-x-2026"), None);
    }

    #[test]
    fn test_month_day_unpadded() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        assert_eq!(month_day(date), "February 9");
        assert_eq!(readable_date(date), "February 9, 2026");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }
}
