//! Web scraper module for tfrrs.org meet results.
//!
//! Provides page fetching, HTML parsing, and polite rate limiting.

pub mod fetch;
pub mod rate_limiter;
pub mod results_page;

pub use fetch::Fetcher;
pub use rate_limiter::RateLimiter;
pub use results_page::parse_results_page;

use clap::ValueEnum;

/// Base URL for tfrrs.org
pub const BASE_URL: &str = "https://www.tfrrs.org";

/// Which individual results table to scrape from a meet page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Gender {
    Women,
    Men,
}

impl Gender {
    /// Whether a results-table title belongs to this gender's individual
    /// results.
    pub fn matches_title(&self, title: &str) -> bool {
        match self {
            Gender::Women => title.contains("Women"),
            Gender::Men => title.contains("Men") && !title.contains("Women"),
        }
    }
}

/// Build a meet results URL from a meet id and name slug
pub fn meet_url(meet_id: u64, slug: &str) -> String {
    format!("{}/results/xc/{}/{}", BASE_URL, meet_id, slug)
}

/// Derive the course name from a results URL: the last path segment with
/// underscores turned into spaces, e.g.
/// `.../Panorama_Farms_Invitational` -> `Panorama Farms Invitational`.
pub fn course_name_from_url(url: &str) -> String {
    let last_segment = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    last_segment.replace('_', " ").trim().to_string()
}
