//! xc-stats
//!
//! Scrapes TFRRS cross-country meet results into SQLite and derives
//! course-normalization statistics over them.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xc_stats::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xc_stats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Cli { database, command } = Cli::parse();

    match command {
        Commands::Load {
            urls,
            gender,
            keep_dnf,
            keep_dns,
        } => cli::run_load(database, urls, gender, keep_dnf, keep_dns).await,
        Commands::Races => cli::run_races(database),
        Commands::Courses { fragment } => cli::run_courses(database, fragment),
        Commands::Runners { fragment } => cli::run_runners(database, fragment),
        Commands::Common { runner_a, runner_b } => cli::run_common(database, runner_a, runner_b),
        Commands::Compare {
            course_a,
            course_b,
            format,
        } => cli::run_compare(database, course_a, course_b, format),
        Commands::Conversions {
            primary,
            min_comparisons,
            format,
        } => cli::run_conversions(database, primary, min_comparisons, format),
        Commands::Predict {
            course,
            school,
            format,
        } => cli::run_predict(database, course, school, format),
        Commands::VirtualRace {
            primary,
            schools,
            min_comparisons,
            format,
        } => cli::run_virtual_race(database, primary, schools, min_comparisons, format),
    }
}
