//! Error types for the statistics layer.

/// Errors surfaced by the statistical operations.
///
/// Thin comparisons are not errors: a [`crate::compare::CourseComparison`]
/// with `num_compared == 0` and the unusable-course report of
/// [`crate::conversions::ConversionTable`] carry that state as data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// The requested race id is not loaded in the database.
    #[error("race {0} is not loaded")]
    CourseNotFound(i64),

    /// The target race has no results from runners with more than one race,
    /// so no difficulty baseline can be computed for it.
    #[error("race {0} has no results from multi-race runners")]
    NoComparableRunners(i64),
}
