//! Command-line interface definitions for Roundup Press.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. The config path can come from a flag or the environment.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Roundup Press application.
///
/// # Examples
///
/// ```sh
/// # The daily pipeline
/// roundup_press run
///
/// # Regenerate a past day (fails if the article already exists)
/// roundup_press run --date 2026-02-03
///
/// # Maintenance
/// roundup_press scrub --slug daily-feb-1-2026 --slug daily-feb-2-2026
/// roundup_press relede --updates ledes.json
/// roundup_press rebuild-people
/// roundup_press thumbs
/// roundup_press post
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the site configuration YAML
    #[arg(short, long, env = "ROUNDUP_CONFIG", default_value = "roundup.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daily pipeline: fetch, summarize, publish all surfaces
    Run {
        /// Generate for this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Post today's roundup (or a random reshare) to the social endpoint
    Post,
    /// Regenerate every person page from the articles on disk
    RebuildPeople,
    /// Regenerate every thumbnail from the articles on disk
    Thumbs,
    /// Remove articles and every reference to them from the site
    Scrub {
        /// Article slug to remove (repeatable)
        #[arg(long, required = true)]
        slug: Vec<String>,
    },
    /// Replace lede paragraphs in place from a JSON updates file
    Relede {
        /// Path to a JSON array of {"old": ..., "new": ...} objects
        #[arg(long)]
        updates: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_run() {
        let cli = Cli::parse_from(["roundup_press", "--config", "site.yaml", "run"]);
        assert_eq!(cli.config, "site.yaml");
        assert!(matches!(cli.command, Command::Run { date: None }));
    }

    #[test]
    fn test_cli_run_with_date() {
        let cli = Cli::parse_from(["roundup_press", "run", "--date", "2026-02-03"]);
        match cli.command {
            Command::Run { date } => assert_eq!(date.as_deref(), Some("2026-02-03")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_default_config() {
        let cli = Cli::parse_from(["roundup_press", "post"]);
        assert_eq!(cli.config, "roundup.yaml");
        assert!(matches!(cli.command, Command::Post));
    }

    #[test]
    fn test_cli_scrub_repeatable_slug() {
        let cli = Cli::parse_from([
            "roundup_press",
            "scrub",
            "--slug",
            "daily-feb-1-2026",
            "--slug",
            "daily-feb-2-2026",
        ]);
        match cli.command {
            Command::Scrub { slug } => {
                assert_eq!(slug, vec!["daily-feb-1-2026", "daily-feb-2-2026"])
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
