//! Virtual combined race across a set of schools.
//!
//! Standardizes every stored result for the selected schools with the
//! conversion network (division by the course's ratio conversion), then
//! averages each runner's standardized times into one comparable mark and
//! ranks the field ascending.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::conversions::{build_conversions, ConversionParams};
use crate::error::StatsError;
use crate::snapshot::ResultSnapshot;
use crate::timing::format_virtual_time;

/// One result standardized to the primary course.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NormalizedResult {
    pub runner_id: i64,
    pub race_id: i64,
    pub normalized_time: f64,
}

/// One finisher of the virtual race.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualRaceEntry {
    pub place: usize,
    pub runner_id: i64,
    pub name: String,
    pub school: String,
    /// Mean standardized seconds across the runner's races.
    pub average_time: f64,
    /// `average_time` rendered as `M:S.d`.
    pub formatted_time: String,
}

/// Standardize all results of runners from `schools` to the primary
/// course. Results on courses the conversion network could not resolve are
/// dropped.
pub fn normalize_school_results(
    snapshot: &ResultSnapshot,
    schools: &[String],
    primary: i64,
    params: &ConversionParams,
) -> Result<Vec<NormalizedResult>, StatsError> {
    let table = build_conversions(snapshot, primary, params)?;
    let ratios: BTreeMap<i64, f64> = table
        .courses
        .iter()
        .filter_map(|c| c.ratio_conversion.map(|ratio| (c.race_id, ratio)))
        .collect();

    let mut normalized = Vec::new();
    for runner in snapshot.runners() {
        if !schools.iter().any(|s| s == &runner.school) {
            continue;
        }
        let Some(times) = snapshot.runner_times(runner.runner_id) else {
            continue;
        };
        for (&race_id, &time) in times {
            if let Some(ratio) = ratios.get(&race_id) {
                normalized.push(NormalizedResult {
                    runner_id: runner.runner_id,
                    race_id,
                    normalized_time: time / ratio,
                });
            }
        }
    }
    Ok(normalized)
}

/// Compose the virtual race: average each runner's standardized times and
/// rank ascending. Runners with no standardizable result are left out.
pub fn compose_virtual_race(
    snapshot: &ResultSnapshot,
    schools: &[String],
    primary: i64,
    params: &ConversionParams,
) -> Result<Vec<VirtualRaceEntry>, StatsError> {
    let normalized = normalize_school_results(snapshot, schools, primary, params)?;

    let mut per_runner: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for result in &normalized {
        let entry = per_runner.entry(result.runner_id).or_insert((0.0, 0));
        entry.0 += result.normalized_time;
        entry.1 += 1;
    }

    let mut averages: Vec<(i64, f64)> = per_runner
        .into_iter()
        .map(|(runner_id, (sum, count))| (runner_id, sum / count as f64))
        .collect();
    averages.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let entries = averages
        .into_iter()
        .enumerate()
        .filter_map(|(index, (runner_id, average))| {
            let runner = snapshot.runner(runner_id)?;
            Some(VirtualRaceEntry {
                place: index + 1,
                runner_id,
                name: runner.name.clone(),
                school: runner.school.clone(),
                average_time: average,
                formatted_time: format_virtual_time(average),
            })
        })
        .collect();
    Ok(entries)
}
