//! SQLite schema for scraped cross-country results.
//!
//! Tables:
//! - runners: identity rows keyed by the (name, eligibility, school) triple
//! - races: identity rows keyed by the (race, date) pair
//! - results: one immutable fact per (runner, race)

use rusqlite::{Connection, Result};

/// Create all tables and indexes in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS runners (
            runner_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            eligibility TEXT NOT NULL,
            school TEXT NOT NULL,
            UNIQUE(name, eligibility, school)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS races (
            race_id INTEGER PRIMARY KEY AUTOINCREMENT,
            race TEXT NOT NULL,
            date TEXT NOT NULL,
            UNIQUE(race, date)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            runner_id INTEGER NOT NULL REFERENCES runners(runner_id),
            race_id INTEGER NOT NULL REFERENCES races(race_id),
            raw_time TEXT NOT NULL,
            time REAL NOT NULL,
            place INTEGER NOT NULL,
            PRIMARY KEY(runner_id, race_id)
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_race ON results(race_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_runners_school ON runners(school)",
        [],
    )?;

    Ok(())
}
