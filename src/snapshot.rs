//! Immutable in-memory snapshot of the result table.
//!
//! Every statistical pass reads a fully-materialized snapshot taken after
//! ingestion commits; nothing here touches the database. The indexes are
//! `BTreeMap`s so iteration order, and with it every weighted aggregation,
//! is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

/// A loaded race: (race, date) is the natural key, `race_id` the stable id.
#[derive(Debug, Clone, Serialize)]
pub struct RaceInfo {
    pub race_id: i64,
    pub race: String,
    pub date: String,
}

/// A loaded runner: (name, eligibility, school) is the natural key.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerInfo {
    pub runner_id: i64,
    pub name: String,
    pub eligibility: String,
    pub school: String,
}

/// One result fact: a runner's canonical time on a race.
#[derive(Debug, Clone, Copy)]
pub struct ResultRow {
    pub runner_id: i64,
    pub race_id: i64,
    pub time: f64,
}

/// Read-only view of all loaded races, runners, and results.
#[derive(Debug, Default)]
pub struct ResultSnapshot {
    races: BTreeMap<i64, RaceInfo>,
    runners: BTreeMap<i64, RunnerInfo>,
    by_race: BTreeMap<i64, BTreeMap<i64, f64>>,
    by_runner: BTreeMap<i64, BTreeMap<i64, f64>>,
}

impl ResultSnapshot {
    /// Build the snapshot and its two indexes from raw table rows.
    pub fn new(races: Vec<RaceInfo>, runners: Vec<RunnerInfo>, results: Vec<ResultRow>) -> Self {
        let mut snapshot = ResultSnapshot {
            races: races.into_iter().map(|r| (r.race_id, r)).collect(),
            runners: runners.into_iter().map(|r| (r.runner_id, r)).collect(),
            by_race: BTreeMap::new(),
            by_runner: BTreeMap::new(),
        };
        for row in results {
            snapshot
                .by_race
                .entry(row.race_id)
                .or_default()
                .insert(row.runner_id, row.time);
            snapshot
                .by_runner
                .entry(row.runner_id)
                .or_default()
                .insert(row.race_id, row.time);
        }
        snapshot
    }

    pub fn contains_race(&self, race_id: i64) -> bool {
        self.races.contains_key(&race_id)
    }

    pub fn race(&self, race_id: i64) -> Option<&RaceInfo> {
        self.races.get(&race_id)
    }

    /// All loaded races in ascending id order.
    pub fn races(&self) -> impl Iterator<Item = &RaceInfo> {
        self.races.values()
    }

    /// Ascending race ids.
    pub fn race_ids(&self) -> Vec<i64> {
        self.races.keys().copied().collect()
    }

    pub fn runner(&self, runner_id: i64) -> Option<&RunnerInfo> {
        self.runners.get(&runner_id)
    }

    /// All loaded runners in ascending id order.
    pub fn runners(&self) -> impl Iterator<Item = &RunnerInfo> {
        self.runners.values()
    }

    /// Times on one race, keyed by runner id.
    pub fn race_times(&self, race_id: i64) -> Option<&BTreeMap<i64, f64>> {
        self.by_race.get(&race_id)
    }

    /// One runner's times, keyed by race id.
    pub fn runner_times(&self, runner_id: i64) -> Option<&BTreeMap<i64, f64>> {
        self.by_runner.get(&runner_id)
    }

    pub fn result_count(&self) -> usize {
        self.by_race.values().map(|times| times.len()).sum()
    }
}
