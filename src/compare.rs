//! Pairwise course comparison over common runners.

use serde::Serialize;

use crate::error::StatsError;
use crate::snapshot::ResultSnapshot;

/// Outcome of comparing two courses over their common runners.
///
/// `difference` is how many seconds slower course B averaged than course A
/// (negative means B was faster); `ratio` is the factor that standardizes
/// an A time to a B time. Both are `None` exactly when `num_compared == 0`;
/// callers must check `num_compared` before trusting either.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CourseComparison {
    pub num_compared: usize,
    pub difference: Option<f64>,
    pub ratio: Option<f64>,
}

/// Compare course `course_b` against course `course_a`, restricted to the
/// runners who have a result in each.
///
/// `difference = mean(B) - mean(A)` and `ratio = mean(B) / mean(A)` over
/// that common set. Deterministic given the result table; comparing a
/// non-empty course with itself yields ratio 1 and difference 0.
pub fn compare_courses(
    snapshot: &ResultSnapshot,
    course_a: i64,
    course_b: i64,
) -> Result<CourseComparison, StatsError> {
    if !snapshot.contains_race(course_a) {
        return Err(StatsError::CourseNotFound(course_a));
    }
    if !snapshot.contains_race(course_b) {
        return Err(StatsError::CourseNotFound(course_b));
    }

    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut num_compared = 0usize;
    if let (Some(times_a), Some(times_b)) = (
        snapshot.race_times(course_a),
        snapshot.race_times(course_b),
    ) {
        for (runner_id, time_a) in times_a {
            if let Some(time_b) = times_b.get(runner_id) {
                sum_a += time_a;
                sum_b += time_b;
                num_compared += 1;
            }
        }
    }

    if num_compared == 0 {
        return Ok(CourseComparison {
            num_compared: 0,
            difference: None,
            ratio: None,
        });
    }

    let mean_a = sum_a / num_compared as f64;
    let mean_b = sum_b / num_compared as f64;
    Ok(CourseComparison {
        num_compared,
        difference: Some(mean_b - mean_a),
        ratio: Some(mean_b / mean_a),
    })
}
