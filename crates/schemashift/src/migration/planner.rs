//! Planning: which versions to apply or revert, in which order.
//!
//! Planning is pure. It sees only version numbers and never touches the
//! database, so a planning error always leaves the schema untouched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{MigrateError, Result};

use super::Direction;

/// Ordered steps from the recorded version to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    /// Highest applied version when the plan was made (0 when none).
    pub start_version: i64,
    /// Target the plan was computed for.
    pub target_version: i64,
    /// Versions in execution order.
    pub versions: Vec<i64>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Direction of every step of this plan.
    pub fn direction(&self) -> Direction {
        if self.target_version < self.start_version {
            Direction::Revert
        } else {
            Direction::Apply
        }
    }

    /// Steps paired with their direction.
    pub fn steps(&self) -> impl Iterator<Item = (i64, Direction)> + '_ {
        let direction = self.direction();
        self.versions.iter().map(move |v| (*v, direction))
    }
}

/// Compute the plan that moves from `applied` to `target`.
///
/// - reverting (`target < start`) visits `target < v <= start`, descending
/// - applying visits `start < v <= target`, ascending
///
/// Candidates are the union of applied and available versions, so applied
/// units that are no longer registered still show up. Available versions
/// below the start that were never applied fail with `SkippedMigrations`.
pub fn plan(target: i64, applied: &[i64], available: &[i64]) -> Result<MigrationPlan> {
    let applied: BTreeSet<i64> = applied.iter().copied().collect();
    let start = applied.iter().next_back().copied().unwrap_or(0);

    let skipped: Vec<i64> = available
        .iter()
        .copied()
        .filter(|v| *v < start && !applied.contains(v))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !skipped.is_empty() {
        return Err(MigrateError::SkippedMigrations { versions: skipped });
    }

    let candidates: BTreeSet<i64> = applied.iter().chain(available.iter()).copied().collect();

    let versions: Vec<i64> = if target < start {
        candidates
            .range((target + 1)..=start)
            .rev()
            .copied()
            .collect()
    } else {
        candidates
            .iter()
            .copied()
            .filter(|v| *v > start && *v <= target)
            .collect()
    };

    Ok(MigrationPlan {
        start_version: start,
        target_version: target,
        versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_from_start() {
        let p = plan(88, &[1, 2, 3], &[1, 2, 3, 4, 77, 88]).unwrap();
        assert_eq!(p.start_version, 3);
        assert_eq!(p.versions, vec![4, 77, 88]);
        assert_eq!(p.direction(), Direction::Apply);
    }

    #[test]
    fn test_revert_down_to_target() {
        let p = plan(1, &[1, 2, 3], &[1, 2, 3, 4, 77, 88]).unwrap();
        assert_eq!(p.start_version, 3);
        assert_eq!(p.versions, vec![3, 2]);
        assert_eq!(p.direction(), Direction::Revert);
        assert_eq!(
            p.steps().collect::<Vec<_>>(),
            vec![(3, Direction::Revert), (2, Direction::Revert)]
        );
    }

    #[test]
    fn test_target_equals_start_is_empty() {
        let p = plan(3, &[1, 2, 3], &[1, 2, 3, 4, 77, 88]).unwrap();
        assert_eq!(p.start_version, 3);
        assert!(p.is_empty());
        assert_eq!(p.versions, Vec::<i64>::new());
    }

    #[test]
    fn test_skipped_versions() {
        let err = plan(5, &[1, 4], &[1, 2, 3, 4, 5]).unwrap_err();
        match err {
            MigrateError::SkippedMigrations { versions } => assert_eq!(versions, vec![2, 3]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_target_between_versions_stops_at_boundary() {
        let p = plan(50, &[], &[10, 20, 60]).unwrap();
        assert_eq!(p.versions, vec![10, 20]);

        let p = plan(15, &[10, 20, 60], &[10, 20, 60]).unwrap();
        assert_eq!(p.versions, vec![60, 20]);
    }

    #[test]
    fn test_retired_unit_still_reverted() {
        // 3 is applied but no longer registered.
        let p = plan(0, &[1, 2, 3], &[1, 2]).unwrap();
        assert_eq!(p.versions, vec![3, 2, 1]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let a = plan(100, &[2, 1], &[5, 3, 1, 2, 4]).unwrap();
        let b = plan(100, &[1, 2], &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.versions, vec![3, 4, 5]);
    }
}
