//! Per-runner time prediction for a target course.
//!
//! Uses raw per-course averages rather than the conversion network: every
//! course's difficulty baseline is its mean time among runners with two or
//! more races, and a runner's predicted time is the mean of their results
//! after scaling each by that course's difficulty ratio to the target.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StatsError;
use crate::snapshot::ResultSnapshot;
use crate::timing::format_race_time;

/// Predicted time for one runner on the target course.
#[derive(Debug, Clone, Serialize)]
pub struct PredictedTime {
    pub runner_id: i64,
    pub name: String,
    pub school: String,
    /// Predicted seconds on the target course.
    pub predicted_time: f64,
    /// `predicted_time` rendered as `M:SS`.
    pub formatted_time: String,
}

/// Predict times on `target` for every runner with results on two or more
/// courses. Single-race runners carry no cross-course signal and are
/// excluded entirely. Rows come back in runner-id order.
pub fn predict_times(
    snapshot: &ResultSnapshot,
    target: i64,
) -> Result<Vec<PredictedTime>, StatsError> {
    if !snapshot.contains_race(target) {
        return Err(StatsError::CourseNotFound(target));
    }

    // course difficulty baselines over multi-race runners only
    let mut sums: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for runner in snapshot.runners() {
        let Some(times) = snapshot.runner_times(runner.runner_id) else {
            continue;
        };
        if times.len() < 2 {
            continue;
        }
        for (&race_id, &time) in times {
            let entry = sums.entry(race_id).or_insert((0.0, 0));
            entry.0 += time;
            entry.1 += 1;
        }
    }

    let target_baseline = match sums.get(&target) {
        Some(&(sum, count)) => sum / count as f64,
        None => return Err(StatsError::NoComparableRunners(target)),
    };
    let difficulty_ratios: BTreeMap<i64, f64> = sums
        .iter()
        .map(|(&race_id, &(sum, count))| (race_id, sum / count as f64 / target_baseline))
        .collect();

    let mut predictions = Vec::new();
    for runner in snapshot.runners() {
        let Some(times) = snapshot.runner_times(runner.runner_id) else {
            continue;
        };
        if times.len() < 2 {
            continue;
        }
        let adjusted_sum: f64 = times
            .iter()
            .map(|(race_id, time)| time * difficulty_ratios[race_id])
            .sum();
        let predicted = adjusted_sum / times.len() as f64;
        predictions.push(PredictedTime {
            runner_id: runner.runner_id,
            name: runner.name.clone(),
            school: runner.school.clone(),
            predicted_time: predicted,
            formatted_time: format_race_time(predicted),
        });
    }

    Ok(predictions)
}

/// The prediction table filtered to one school's roster.
pub fn predict_team_results(
    snapshot: &ResultSnapshot,
    school: &str,
    target: i64,
) -> Result<Vec<PredictedTime>, StatsError> {
    let mut predictions = predict_times(snapshot, target)?;
    predictions.retain(|p| p.school == school);
    Ok(predictions)
}
