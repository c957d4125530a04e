//! Configuration for xc-stats.

use serde::{Deserialize, Serialize};

use crate::conversions::ConversionParams;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/xc.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Scraping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Which individual results table to load: "women" or "men"
    #[serde(default = "default_gender")]
    pub gender: String,
    /// Drop runners who did not finish
    #[serde(default = "default_true")]
    pub drop_dnf: bool,
    /// Drop runners who did not start
    #[serde(default = "default_true")]
    pub drop_dns: bool,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_gender() -> String {
    "women".to_string()
}

fn default_true() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            gender: default_gender(),
            drop_dnf: default_true(),
            drop_dns: default_true(),
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
        }
    }
}

/// Statistics thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Minimum summed common runners to accept a chained conversion
    #[serde(default = "default_min_comparisons")]
    pub min_comparisons: usize,
    /// Minimum common runners to accept a direct comparison
    #[serde(default = "default_direct_threshold")]
    pub direct_threshold: usize,
}

fn default_min_comparisons() -> usize {
    15
}

fn default_direct_threshold() -> usize {
    14
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_comparisons: default_min_comparisons(),
            direct_threshold: default_direct_threshold(),
        }
    }
}

impl StatsConfig {
    /// Conversion thresholds, with an optional CLI override for
    /// `min_comparisons`.
    pub fn conversion_params(&self, min_comparisons: Option<usize>) -> ConversionParams {
        ConversionParams {
            min_comparisons: min_comparisons.unwrap_or(self.min_comparisons),
            direct_threshold: self.direct_threshold,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file, and
    /// `XC_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("XC")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
