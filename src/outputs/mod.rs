//! Output surfaces: everything the pipeline writes into the site tree.
//!
//! # Submodules
//!
//! - [`article`]: merges a [`crate::models::RoundupSummary`] into the
//!   newest existing article page, producing the day's page
//! - [`indexes`]: anchor-relative insertion into the three singleton
//!   documents (homepage, RSS feed, sitemap)
//! - [`json`]: the `latest_run.json` report for the calling process
//!
//! # Site tree
//!
//! ```text
//! site_root/
//! ├── index.html                  # homepage, card inserted per run
//! ├── feed.xml                    # RSS, item inserted per run
//! ├── sitemap.xml                 # url entry inserted, lastmod rewritten
//! ├── daily-feb-9-2026.html       # one article document per day
//! ├── images/daily-feb-9-2026.png # matching thumbnail
//! ├── people/jane-doe.html        # person pages, fully regenerated
//! ├── people/bios.json            # persisted biographies
//! └── latest_run.json
//! ```
//!
//! Merge and insertion are pure `String -> String` functions; file I/O stays
//! at the edges so the anchor-safety invariants are testable without a disk.

pub mod article;
pub mod indexes;
pub mod json;
