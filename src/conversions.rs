//! Course conversion network: normalizes every loaded course against a
//! chosen primary course.
//!
//! Courses that share enough runners with the primary get their conversion
//! from the direct comparison. The rest are resolved transitively, in two
//! further tiers, by chaining through every already-resolved course and
//! weighting each chain by its common-runner count. Courses still short of
//! data after the last tier are reported as unusable, with the comparison
//! count actually found, rather than dropped.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::compare::compare_courses;
use crate::error::StatsError;
use crate::snapshot::ResultSnapshot;

/// Thresholds for accepting conversions.
///
/// Both bounds are strict. `direct_threshold` gates a direct comparison
/// against the primary; `min_comparisons` gates the summed common-runner
/// count of a chained estimate.
#[derive(Debug, Clone, Copy)]
pub struct ConversionParams {
    pub min_comparisons: usize,
    pub direct_threshold: usize,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            min_comparisons: 15,
            direct_threshold: 14,
        }
    }
}

/// Conversion for one course relative to the primary.
///
/// Multiply a primary-standardized time by `ratio_conversion` to estimate a
/// time on this course; `time_conversion` is the additive seconds offset.
/// Both are `None` when the course could not be connected to the primary.
#[derive(Debug, Clone, Serialize)]
pub struct CourseConversion {
    pub race_id: i64,
    pub race: String,
    pub date: String,
    pub ratio_conversion: Option<f64>,
    pub time_conversion: Option<f64>,
}

/// A course left unresolved after the last tier, with the total number of
/// common runners its candidate chains actually found.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnusableCourse {
    pub race_id: i64,
    pub common_runners: usize,
}

/// Full build output: one row per loaded course, plus the unusable report.
#[derive(Debug, Serialize)]
pub struct ConversionTable {
    pub courses: Vec<CourseConversion>,
    pub unusable: Vec<UnusableCourse>,
}

/// A chained estimate for one unresolved course, combined from every
/// resolved course it shares runners with.
struct ChainedEstimate {
    ratio: f64,
    difference: f64,
    total_compared: usize,
}

/// Build the conversion table for every loaded course relative to
/// `primary`.
pub fn build_conversions(
    snapshot: &ResultSnapshot,
    primary: i64,
    params: &ConversionParams,
) -> Result<ConversionTable, StatsError> {
    if !snapshot.contains_race(primary) {
        return Err(StatsError::CourseNotFound(primary));
    }

    // race_id -> (ratio_conversion, time_conversion); the primary is the
    // fixed point of the whole network.
    let mut resolved: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
    resolved.insert(primary, (1.0, 0.0));

    // Tier 1: direct comparisons against the primary.
    let mut deferred = Vec::new();
    for course in snapshot.race_ids() {
        if course == primary {
            continue;
        }
        let cmp = compare_courses(snapshot, primary, course)?;
        match (cmp.ratio, cmp.difference) {
            (Some(ratio), Some(difference)) if cmp.num_compared > params.direct_threshold => {
                resolved.insert(course, (ratio, difference));
            }
            _ => deferred.push(course),
        }
    }

    // Tier 2: chain deferred courses through the primary and the directly
    // resolved courses. Courses resolved within this tier do not feed each
    // other; the pool only grows between tiers.
    let mut tier_resolved = Vec::new();
    let mut still_deferred = Vec::new();
    for &target in &deferred {
        let estimate = chain_through_resolved(snapshot, &resolved, target)?;
        if estimate.total_compared > params.min_comparisons {
            tier_resolved.push((target, (estimate.ratio, estimate.difference)));
        } else {
            still_deferred.push(target);
        }
    }
    resolved.extend(tier_resolved);

    // Tier 3: same combination over the enlarged pool. Whatever misses the
    // threshold here is reported unusable.
    let mut unusable = Vec::new();
    let mut tier_resolved = Vec::new();
    for &target in &still_deferred {
        let estimate = chain_through_resolved(snapshot, &resolved, target)?;
        if estimate.total_compared > params.min_comparisons {
            tier_resolved.push((target, (estimate.ratio, estimate.difference)));
        } else {
            tracing::warn!(
                race_id = target,
                common_runners = estimate.total_compared,
                "not enough information to compare race"
            );
            unusable.push(UnusableCourse {
                race_id: target,
                common_runners: estimate.total_compared,
            });
        }
    }
    resolved.extend(tier_resolved);

    let courses = snapshot
        .races()
        .map(|race| {
            let conversion = resolved.get(&race.race_id);
            CourseConversion {
                race_id: race.race_id,
                race: race.race.clone(),
                date: race.date.clone(),
                ratio_conversion: conversion.map(|&(ratio, _)| ratio),
                time_conversion: conversion.map(|&(_, time)| time),
            }
        })
        .collect();

    Ok(ConversionTable { courses, unusable })
}

/// Combine every usable comparison between `target` and the resolved pool
/// into one sample-size-weighted estimate.
///
/// For each resolved course X sharing at least one runner with the target,
/// the chain rules apply: `ratio(X,T) * ratio_conversion[X]` and
/// `difference(X,T) + time_conversion[X]`. Weights are
/// `num_compared / total`, so they sum to 1 over the retained chains.
fn chain_through_resolved(
    snapshot: &ResultSnapshot,
    resolved: &BTreeMap<i64, (f64, f64)>,
    target: i64,
) -> Result<ChainedEstimate, StatsError> {
    let mut chains = Vec::new();
    let mut total_compared = 0usize;
    for (&via, &(via_ratio, via_time)) in resolved {
        let cmp = compare_courses(snapshot, via, target)?;
        if let (Some(ratio), Some(difference)) = (cmp.ratio, cmp.difference) {
            chains.push((ratio * via_ratio, difference + via_time, cmp.num_compared));
            total_compared += cmp.num_compared;
        }
    }

    let mut combined_ratio = 0.0;
    let mut combined_difference = 0.0;
    if total_compared > 0 {
        for (chain_ratio, chain_difference, num_compared) in chains {
            let weight = num_compared as f64 / total_compared as f64;
            combined_ratio += chain_ratio * weight;
            combined_difference += chain_difference * weight;
        }
    }

    Ok(ChainedEstimate {
        ratio: combined_ratio,
        difference: combined_difference,
        total_compared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::testutil::snapshot_from;

    const COURSE_A: i64 = 1;
    const COURSE_B: i64 = 2;
    const COURSE_C: i64 = 3;

    /// Twenty runners shared between A and B, averaging 600s on A and 630s
    /// on B: ratio 1.05, difference +30.
    fn direct_pair() -> Vec<(i64, i64, f64)> {
        let mut results = Vec::new();
        for i in 0..20i64 {
            let base = 600.5 + (i - 10) as f64; // spread 590.5..609.5, mean 600
            results.push((i, COURSE_A, base));
            results.push((i, COURSE_B, base * 1.05));
        }
        results
    }

    fn conversion_for(table: &ConversionTable, race_id: i64) -> &CourseConversion {
        table
            .courses
            .iter()
            .find(|c| c.race_id == race_id)
            .unwrap()
    }

    #[test]
    fn test_primary_is_fixed_point() {
        let snap = snapshot_from(&direct_pair());
        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        let primary = conversion_for(&table, COURSE_A);
        assert_eq!(primary.ratio_conversion, Some(1.0));
        assert_eq!(primary.time_conversion, Some(0.0));
    }

    #[test]
    fn test_direct_tier_uses_raw_comparison() {
        let snap = snapshot_from(&direct_pair());
        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        let direct = compare_courses(&snap, COURSE_A, COURSE_B).unwrap();
        let row = conversion_for(&table, COURSE_B);
        // tier-1 conversions are the pairwise numbers, unblended
        assert_eq!(row.ratio_conversion, direct.ratio);
        assert_eq!(row.time_conversion, direct.difference);
        assert!((row.ratio_conversion.unwrap() - 1.05).abs() < 1e-9);
        assert!((row.time_conversion.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_contributor_gets_full_weight() {
        // C shares no runners with A and 16 with B, so B is the only chain
        let mut results = direct_pair();
        for i in 0..16i64 {
            results.push((100 + i, COURSE_B, 630.0));
            results.push((100 + i, COURSE_C, 693.0));
        }
        let snap = snapshot_from(&results);
        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        let b_to_c = compare_courses(&snap, COURSE_B, COURSE_C).unwrap();
        let b_conv = conversion_for(&table, COURSE_B).ratio_conversion.unwrap();
        let row = conversion_for(&table, COURSE_C);
        let expected = b_to_c.ratio.unwrap() * b_conv;
        assert!((row.ratio_conversion.unwrap() - expected).abs() < 1e-12);

        let expected_time = b_to_c.difference.unwrap()
            + conversion_for(&table, COURSE_B).time_conversion.unwrap();
        assert!((row.time_conversion.unwrap() - expected_time).abs() < 1e-9);
        assert!(table.unusable.is_empty());
    }

    #[test]
    fn test_three_course_scenario() {
        // A primary; B 20 shared with A (ratio 1.05, +30s); C 5 shared
        // with A and 18 with B. Times follow per-course factors, so the
        // blended tier-2 estimate lands exactly on ratio(B,C) * 1.05.
        let mut results = Vec::new();
        for i in 0..20i64 {
            let base = 600.5 + (i - 10) as f64;
            results.push((i, COURSE_A, base));
            results.push((i, COURSE_B, base * 1.05));
        }
        // five of those runners also ran C; thirteen B-only runners ran C
        // as well, giving 18 B/C overlaps
        for i in 0..5i64 {
            let base = 600.5 + (i - 10) as f64;
            results.push((i, COURSE_C, base * 1.155));
        }
        for i in 0..13i64 {
            let base = 580.0 + i as f64;
            results.push((200 + i, COURSE_B, base * 1.05));
            results.push((200 + i, COURSE_C, base * 1.155));
        }
        let snap = snapshot_from(&results);

        assert_eq!(compare_courses(&snap, COURSE_A, COURSE_C).unwrap().num_compared, 5);
        assert_eq!(compare_courses(&snap, COURSE_B, COURSE_C).unwrap().num_compared, 18);

        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        // B resolves directly
        let b_row = conversion_for(&table, COURSE_B);
        assert!((b_row.ratio_conversion.unwrap() - 1.05).abs() < 1e-9);

        // C resolves at tier 2; with factor-consistent data the weighted
        // blend equals the chain through B
        let b_to_c = compare_courses(&snap, COURSE_B, COURSE_C).unwrap();
        let c_row = conversion_for(&table, COURSE_C);
        let expected = b_to_c.ratio.unwrap() * 1.05;
        assert!((c_row.ratio_conversion.unwrap() - expected).abs() < 1e-9);
        assert!((c_row.ratio_conversion.unwrap() - 1.155).abs() < 1e-9);
        assert!(table.unusable.is_empty());
    }

    #[test]
    fn test_unusable_course_reported() {
        // D shares only 2 runners with anything, far below every gate
        let mut results = direct_pair();
        results.push((0, 4, 700.0));
        results.push((1, 4, 710.0));
        let snap = snapshot_from(&results);
        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        let row = conversion_for(&table, 4);
        assert_eq!(row.ratio_conversion, None);
        assert_eq!(row.time_conversion, None);
        assert_eq!(table.unusable.len(), 1);
        assert_eq!(table.unusable[0].race_id, 4);
        // both chains (through A and through B) found two runners each
        assert_eq!(table.unusable[0].common_runners, 4);
    }

    #[test]
    fn test_every_course_resolved_or_reported() {
        let mut results = direct_pair();
        results.push((0, 4, 700.0));
        results.push((50, 5, 800.0)); // isolated course, zero overlap
        let snap = snapshot_from(&results);
        let table = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();

        for row in &table.courses {
            let resolved = row.ratio_conversion.is_some() && row.time_conversion.is_some();
            let reported = table.unusable.iter().any(|u| u.race_id == row.race_id);
            assert!(
                resolved ^ reported,
                "course {} must be exactly one of resolved/reported",
                row.race_id
            );
        }
    }

    #[test]
    fn test_primary_not_loaded() {
        let snap = snapshot_from(&direct_pair());
        assert_eq!(
            build_conversions(&snap, 99, &ConversionParams::default()).unwrap_err(),
            StatsError::CourseNotFound(99)
        );
    }

    #[test]
    fn test_lower_threshold_admits_thin_courses() {
        // 10 shared runners fail the default direct gate but pass a
        // loosened one
        let mut results = Vec::new();
        for i in 0..10i64 {
            results.push((i, COURSE_A, 600.0 + i as f64));
            results.push((i, COURSE_B, 640.0 + i as f64));
        }
        let snap = snapshot_from(&results);

        let strict = build_conversions(&snap, COURSE_A, &ConversionParams::default()).unwrap();
        assert_eq!(conversion_for(&strict, COURSE_B).ratio_conversion, None);

        let loose = ConversionParams {
            min_comparisons: 5,
            direct_threshold: 5,
        };
        let table = build_conversions(&snap, COURSE_A, &loose).unwrap();
        assert!(conversion_for(&table, COURSE_B).ratio_conversion.is_some());
    }
}
