//! CLI commands for xc-stats.
//!
//! Loading scrapes meet pages into SQLite; every statistics command takes
//! a fresh snapshot of the committed results and runs a pure computation
//! over it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::compare::compare_courses;
use crate::config::AppConfig;
use crate::conversions::build_conversions;
use crate::predict::{predict_team_results, predict_times};
use crate::scraper::{course_name_from_url, parse_results_page, Fetcher, Gender};
use crate::storage::MeetStore;
use crate::virtual_race::compose_virtual_race;

#[derive(Parser)]
#[command(name = "xc-stats")]
#[command(version, about = "Cross-country results database and course statistics", long_about = None)]
pub struct Cli {
    /// Database path (overrides configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape meet result pages into the database
    Load {
        /// TFRRS meet result URLs
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Which individual results table to load
        #[arg(long, value_enum)]
        gender: Option<Gender>,

        /// Keep runners who did not finish
        #[arg(long)]
        keep_dnf: bool,

        /// Keep runners who did not start
        #[arg(long)]
        keep_dns: bool,
    },

    /// List all loaded races
    Races,

    /// Find races whose name contains a fragment
    Courses {
        fragment: String,
    },

    /// Find runners whose name contains a fragment
    Runners {
        fragment: String,
    },

    /// List the races two runners have run together
    Common {
        runner_a: i64,
        runner_b: i64,
    },

    /// Compare two courses over their common runners
    Compare {
        course_a: i64,
        course_b: i64,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Build the conversion table relative to a primary course
    Conversions {
        primary: i64,

        /// Minimum summed common runners to accept a chained conversion
        #[arg(long)]
        min_comparisons: Option<usize>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Predict times on a course for every multi-race runner
    Predict {
        course: i64,

        /// Restrict the table to one school's roster
        #[arg(long)]
        school: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Run a virtual meet between schools, normalized to a primary course
    #[command(name = "virtual")]
    VirtualRace {
        primary: i64,

        /// Schools on the start line
        #[arg(long, value_delimiter = ',', required = true)]
        schools: Vec<String>,

        /// Minimum summed common runners to accept a chained conversion
        #[arg(long)]
        min_comparisons: Option<usize>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

fn open_store(config: &AppConfig, database: Option<PathBuf>) -> Result<MeetStore> {
    let path = database.unwrap_or_else(|| PathBuf::from(&config.database.path));
    MeetStore::open(Path::new(&path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Fetch, parse, and ingest each meet URL.
pub async fn run_load(
    database: Option<PathBuf>,
    urls: Vec<String>,
    gender: Option<Gender>,
    keep_dnf: bool,
    keep_dns: bool,
) -> Result<()> {
    let config = AppConfig::load()?;
    let mut store = open_store(&config, database)?;

    let gender = gender.unwrap_or(match config.scrape.gender.as_str() {
        "men" => Gender::Men,
        _ => Gender::Women,
    });
    let drop_dnf = !keep_dnf && config.scrape.drop_dnf;
    let drop_dns = !keep_dns && config.scrape.drop_dns;

    let fetcher = Fetcher::new(config.scrape.requests_per_minute, config.scrape.max_retries)?;

    for url in &urls {
        let html = fetcher.fetch_page(url).await?;
        let course = course_name_from_url(url);
        let meet = parse_results_page(&html, &course, gender, drop_dnf, drop_dns)?;
        let summary = store.ingest(&meet)?;
        println!(
            "{} (race {}): {} results loaded, {} already present, {} unparsable times skipped",
            summary.course, summary.race_id, summary.inserted, summary.duplicates, summary.unparsed
        );
    }
    Ok(())
}

pub fn run_races(database: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    for race in store.loaded_races()? {
        println!("{:>5}  {:<40} {}", race.race_id, race.race, race.date);
    }
    Ok(())
}

pub fn run_courses(database: Option<PathBuf>, fragment: String) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    for race in store.course_lookup(&fragment)? {
        println!("{:>5}  {:<40} {}", race.race_id, race.race, race.date);
    }
    Ok(())
}

pub fn run_runners(database: Option<PathBuf>, fragment: String) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    for runner in store.runner_lookup(&fragment)? {
        println!(
            "{:>5}  {:<30} {:<6} {}",
            runner.runner_id, runner.name, runner.eligibility, runner.school
        );
    }
    Ok(())
}

pub fn run_common(database: Option<PathBuf>, runner_a: i64, runner_b: i64) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    for race in store.races_in_common(runner_a, runner_b)? {
        println!("{:>5}  {:<40} {}", race.race_id, race.race, race.date);
    }
    Ok(())
}

pub fn run_compare(
    database: Option<PathBuf>,
    course_a: i64,
    course_b: i64,
    format: String,
) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    let snapshot = store.snapshot()?;
    let comparison = compare_courses(&snapshot, course_a, course_b)?;

    if format == "json" {
        return print_json(&comparison);
    }
    let course_name = |id: i64| {
        snapshot
            .race(id)
            .map(|race| race.race.clone())
            .unwrap_or_else(|| id.to_string())
    };
    match (comparison.difference, comparison.ratio) {
        (Some(difference), Some(ratio)) => {
            println!(
                "{} vs {}",
                course_name(course_a),
                course_name(course_b)
            );
            println!("runners compared: {}", comparison.num_compared);
            println!("difference:       {:+.1}s", difference);
            println!("ratio:            {:.4}", ratio);
        }
        _ => println!(
            "courses {} and {} share no runners; no comparison possible",
            course_a, course_b
        ),
    }
    Ok(())
}

pub fn run_conversions(
    database: Option<PathBuf>,
    primary: i64,
    min_comparisons: Option<usize>,
    format: String,
) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    let snapshot = store.snapshot()?;
    let params = config.stats.conversion_params(min_comparisons);
    let table = build_conversions(&snapshot, primary, &params)?;

    if format == "json" {
        return print_json(&table);
    }
    println!(
        "{:>5}  {:<40} {:<14} {:>8} {:>8}",
        "id", "race", "date", "ratio", "time"
    );
    for course in &table.courses {
        let ratio = course
            .ratio_conversion
            .map(|r| format!("{:.4}", r))
            .unwrap_or_else(|| "-".to_string());
        let time = course
            .time_conversion
            .map(|t| format!("{:+.1}", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:<40} {:<14} {:>8} {:>8}",
            course.race_id, course.race, course.date, ratio, time
        );
    }
    for unusable in &table.unusable {
        println!(
            "note: not enough information to compare race {}; only {} runners in common",
            unusable.race_id, unusable.common_runners
        );
    }
    Ok(())
}

pub fn run_predict(
    database: Option<PathBuf>,
    course: i64,
    school: Option<String>,
    format: String,
) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    let snapshot = store.snapshot()?;
    let predictions = match school {
        Some(school) => predict_team_results(&snapshot, &school, course)?,
        None => predict_times(&snapshot, course)?,
    };

    if format == "json" {
        return print_json(&predictions);
    }
    for prediction in &predictions {
        println!(
            "{:>5}  {:<30} {:<24} {:>8}",
            prediction.runner_id, prediction.name, prediction.school, prediction.formatted_time
        );
    }
    Ok(())
}

pub fn run_virtual_race(
    database: Option<PathBuf>,
    primary: i64,
    schools: Vec<String>,
    min_comparisons: Option<usize>,
    format: String,
) -> Result<()> {
    let config = AppConfig::load()?;
    let store = open_store(&config, database)?;
    let snapshot = store.snapshot()?;
    let params = config.stats.conversion_params(min_comparisons);
    let entries = compose_virtual_race(&snapshot, &schools, primary, &params)?;

    if format == "json" {
        return print_json(&entries);
    }
    for entry in &entries {
        println!(
            "{:>4}  {:<30} {:<24} {:>9}",
            entry.place, entry.name, entry.school, entry.formatted_time
        );
    }
    Ok(())
}
