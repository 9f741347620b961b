//! Site configuration loaded from a YAML file.
//!
//! One file describes everything a run needs: where the generated site lives,
//! how to query the feed, what counts as relevant, and how to reach the
//! text-generation and social APIs. Secrets stay out of the file; only env
//! var *names* are configured.

use serde::Deserialize;
use std::error::Error;
use tracing::info;
use url::Url;

fn default_feed_endpoint() -> String {
    "https://news.google.com/rss/search".to_string()
}

fn default_recency_hours() -> i64 {
    48
}

fn default_max_items() -> usize {
    18
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.4
}

fn default_api_key_env() -> String {
    "ROUNDUP_API_KEY".to_string()
}

/// Text-generation service settings (OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Social posting service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialConfig {
    pub endpoint: String,
    /// Name of the env var holding the bearer token.
    pub token_env: String,
}

/// Top-level configuration for one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Directory holding the generated site (article pages, index.html,
    /// feed.xml, sitemap.xml, images/, people/).
    pub site_root: String,
    /// Canonical site URL, no trailing slash (e.g. `https://roundup.press`).
    pub base_url: String,
    /// Site name used in page titles and the thumbnail masthead.
    pub site_name: String,
    /// Tagline rendered under the thumbnail masthead.
    #[serde(default)]
    pub tagline: String,
    /// Search queries issued against the feed endpoint, one GET each.
    pub queries: Vec<String>,
    /// An item is relevant iff its title contains one of these,
    /// case-insensitively.
    pub keywords: Vec<String>,
    #[serde(default = "default_feed_endpoint")]
    pub feed_endpoint: String,
    /// Trailing recency window for feed items.
    #[serde(default = "default_recency_hours")]
    pub recency_hours: i64,
    /// Cap on items handed to the summarizer, discovery order preserved.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    pub llm: LlmConfig,
    #[serde(default)]
    pub social: Option<SocialConfig>,
}

/// Load and parse the YAML config file.
pub fn load_config(path: &str) -> Result<SiteConfig, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("reading config {path}: {e}"))?;
    let config: SiteConfig =
        serde_yaml::from_str(&raw).map_err(|e| format!("parsing config {path}: {e}"))?;
    for (field, value) in [
        ("base_url", &config.base_url),
        ("feed_endpoint", &config.feed_endpoint),
        ("llm.endpoint", &config.llm.endpoint),
    ] {
        Url::parse(value).map_err(|e| format!("config {field} {value:?} is not a URL: {e}"))?;
    }
    if let Some(social) = &config.social {
        Url::parse(&social.endpoint)
            .map_err(|e| format!("config social.endpoint {:?} is not a URL: {e}", social.endpoint))?;
    }
    info!(
        path,
        site_root = %config.site_root,
        queries = config.queries.len(),
        keywords = config.keywords.len(),
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
site_root: ./site
base_url: https://roundup.press
site_name: THE DAILY ROUNDUP
tagline: Comprehensive Coverage of the Document Releases
queries:
  - epstein files
  - epstein documents release
keywords:
  - epstein
  - maxwell
llm:
  endpoint: https://api.openai.com/v1/chat/completions
  model: gpt-4o-mini
social:
  endpoint: https://social.example/api/post
  token_env: SOCIAL_TOKEN
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: SiteConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.site_root, "./site");
        assert_eq!(config.queries.len(), 2);
        assert_eq!(config.keywords, vec!["epstein", "maxwell"]);
        assert_eq!(config.feed_endpoint, "https://news.google.com/rss/search");
        assert_eq!(config.recency_hours, 48);
        assert_eq!(config.max_items, 18);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "ROUNDUP_API_KEY");
        assert_eq!(config.social.as_ref().unwrap().token_env, "SOCIAL_TOKEN");
    }

    #[test]
    fn test_social_section_is_optional() {
        let trimmed: String = SAMPLE
            .lines()
            .take_while(|l| !l.starts_with("social:"))
            .collect::<Vec<_>>()
            .join("\n");
        let config: SiteConfig = serde_yaml::from_str(&trimmed).unwrap();
        assert!(config.social.is_none());
    }

    #[test]
    fn test_load_config_rejects_bad_url() {
        let broken = SAMPLE.replace("https://roundup.press", "not a url");
        let dir = std::env::temp_dir().join("roundup_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, broken).unwrap();
        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
