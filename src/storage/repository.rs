//! SQLite store for runners, races, and results.
//!
//! Identities are get-or-create on their natural keys, so runner and race
//! ids are assigned on first sight and stable afterward. Result rows are
//! immutable once written; re-ingesting a (runner, race) pair is a no-op.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, warn};

use super::schema::create_tables;
use crate::snapshot::{RaceInfo, ResultRow, ResultSnapshot, RunnerInfo};
use crate::timing::RaceTime;

/// One row of a scraped meet results table, still in page form.
///
/// `place` and `raw_time` stay text here; ingestion is where they are
/// parsed and either stored or refused.
#[derive(Debug, Clone)]
pub struct MeetRow {
    pub place: String,
    pub name: String,
    pub eligibility: String,
    pub school: String,
    pub raw_time: String,
}

/// A validated rectangular result set for one meet.
#[derive(Debug, Clone)]
pub struct MeetResults {
    pub course: String,
    pub date: String,
    pub rows: Vec<MeetRow>,
}

/// Outcome of ingesting one meet.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub race_id: i64,
    pub course: String,
    /// Result rows written.
    pub inserted: usize,
    /// Rows already present for their (runner, race) pair.
    pub duplicates: usize,
    /// Rows skipped because the TIME cell did not parse as a race clock.
    pub unparsed: usize,
}

/// Store for scraped meets and the source of result snapshots
pub struct MeetStore {
    conn: Connection,
}

impl MeetStore {
    /// Open the store at `path`, initializing the schema if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory store (for tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Identity Operations ====================

    /// Get or create the id for a (name, eligibility, school) triple
    pub fn runner_id(&self, name: &str, eligibility: &str, school: &str) -> Result<i64> {
        runner_id_on(&self.conn, name, eligibility, school)
    }

    /// Get or create the id for a (race, date) pair
    pub fn race_id(&self, race: &str, date: &str) -> Result<i64> {
        race_id_on(&self.conn, race, date)
    }

    // ==================== Ingestion ====================

    /// Insert one result; returns false when the (runner, race) pair
    /// already holds a result.
    pub fn insert_result(
        &self,
        runner_id: i64,
        race_id: i64,
        raw_time: &str,
        time: f64,
        place: u32,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO results (runner_id, race_id, raw_time, time, place)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![runner_id, race_id, raw_time, time, place],
        )?;
        Ok(changed > 0)
    }

    /// Ingest a scraped meet as one transaction.
    ///
    /// Rows whose TIME cell does not parse are skipped (warned and
    /// counted, never coerced into the numeric column). A place cell that
    /// fails integer parsing aborts the whole transaction: place is part
    /// of the page's rectangular contract, so a bad value means the parse
    /// went wrong, not the row.
    pub fn ingest(&mut self, meet: &MeetResults) -> Result<IngestSummary> {
        let tx = self.conn.transaction()?;

        let race_id = race_id_on(&tx, &meet.course, &meet.date)?;
        let mut summary = IngestSummary {
            race_id,
            course: meet.course.clone(),
            inserted: 0,
            duplicates: 0,
            unparsed: 0,
        };

        for row in &meet.rows {
            let place: u32 = row.place.trim().parse().with_context(|| {
                format!(
                    "place '{}' for runner '{}' is not a positive integer",
                    row.place, row.name
                )
            })?;

            let time = match RaceTime::parse(&row.raw_time) {
                RaceTime::Parsed(secs) => secs,
                RaceTime::Unparsed(raw) => {
                    warn!(
                        runner = %row.name,
                        raw_time = %raw,
                        "skipping result with unparsable time"
                    );
                    summary.unparsed += 1;
                    continue;
                }
            };

            let runner_id = runner_id_on(&tx, &row.name, &row.eligibility, &row.school)?;
            let changed = tx.execute(
                r#"
                INSERT OR IGNORE INTO results (runner_id, race_id, raw_time, time, place)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![runner_id, race_id, &row.raw_time, time, place],
            )?;
            if changed > 0 {
                summary.inserted += 1;
            } else {
                debug!(runner_id, race_id, "result already loaded");
                summary.duplicates += 1;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    // ==================== Query Operations ====================

    /// Materialize the full read-only snapshot for the statistics layer
    pub fn snapshot(&self) -> Result<ResultSnapshot> {
        let races = self.loaded_races()?;

        let mut stmt = self
            .conn
            .prepare("SELECT runner_id, name, eligibility, school FROM runners")?;
        let runners = stmt
            .query_map([], |row| {
                Ok(RunnerInfo {
                    runner_id: row.get(0)?,
                    name: row.get(1)?,
                    eligibility: row.get(2)?,
                    school: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT runner_id, race_id, time FROM results")?;
        let results = stmt
            .query_map([], |row| {
                Ok(ResultRow {
                    runner_id: row.get(0)?,
                    race_id: row.get(1)?,
                    time: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ResultSnapshot::new(races, runners, results))
    }

    /// All races loaded into the database
    pub fn loaded_races(&self) -> Result<Vec<RaceInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT race_id, race, date FROM races ORDER BY race_id")?;
        let races = stmt
            .query_map([], |row| {
                Ok(RaceInfo {
                    race_id: row.get(0)?,
                    race: row.get(1)?,
                    date: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(races)
    }

    /// Races whose name contains the fragment
    pub fn course_lookup(&self, fragment: &str) -> Result<Vec<RaceInfo>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT race_id, race, date FROM races
            WHERE race LIKE '%' || ?1 || '%'
            ORDER BY race_id
            "#,
        )?;
        let races = stmt
            .query_map([fragment], |row| {
                Ok(RaceInfo {
                    race_id: row.get(0)?,
                    race: row.get(1)?,
                    date: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(races)
    }

    /// Runners whose name contains the fragment
    pub fn runner_lookup(&self, fragment: &str) -> Result<Vec<RunnerInfo>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT runner_id, name, eligibility, school FROM runners
            WHERE name LIKE '%' || ?1 || '%'
            ORDER BY runner_id
            "#,
        )?;
        let runners = stmt
            .query_map([fragment], |row| {
                Ok(RunnerInfo {
                    runner_id: row.get(0)?,
                    name: row.get(1)?,
                    eligibility: row.get(2)?,
                    school: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runners)
    }

    /// All races two runners have run together
    pub fn races_in_common(&self, runner_a: i64, runner_b: i64) -> Result<Vec<RaceInfo>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT race_id, race, date FROM races
            WHERE race_id IN (
                SELECT race_id FROM results WHERE runner_id = ?1
                INTERSECT
                SELECT race_id FROM results WHERE runner_id = ?2
            )
            ORDER BY race_id
            "#,
        )?;
        let races = stmt
            .query_map(params![runner_a, runner_b], |row| {
                Ok(RaceInfo {
                    race_id: row.get(0)?,
                    race: row.get(1)?,
                    date: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(races)
    }

    /// Result count, mostly for load reporting
    pub fn result_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn runner_id_on(conn: &Connection, name: &str, eligibility: &str, school: &str) -> Result<i64> {
    let existing = conn
        .query_row(
            "SELECT runner_id FROM runners WHERE name = ?1 AND eligibility = ?2 AND school = ?3",
            params![name, eligibility, school],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO runners (name, eligibility, school) VALUES (?1, ?2, ?3)",
        params![name, eligibility, school],
    )?;
    Ok(conn.last_insert_rowid())
}

fn race_id_on(conn: &Connection, race: &str, date: &str) -> Result<i64> {
    let existing = conn
        .query_row(
            "SELECT race_id FROM races WHERE race = ?1 AND date = ?2",
            params![race, date],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO races (race, date) VALUES (?1, ?2)",
        params![race, date],
    )?;
    Ok(conn.last_insert_rowid())
}
