//! Explicit registry of migration units.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{MigrateError, Result};

use super::{MigrationDefinition, MigrationInfo};

/// Holds every registered unit across all series.
///
/// [`load`](Self::load) narrows the set to one series and validates it;
/// the result is what the planner sees.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    definitions: Vec<MigrationDefinition>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: MigrationDefinition) -> &mut Self {
        debug!(
            "Registered migration {} ({})",
            definition.info.version, definition.info.name
        );
        self.definitions.push(definition);
        self
    }

    pub fn extend(&mut self, definitions: impl IntoIterator<Item = MigrationDefinition>) -> &mut Self {
        for definition in definitions {
            self.register(definition);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Units of `series_key` that are not ignored, sorted by version.
    ///
    /// Fails with `DuplicatedVersions` when two of them share a version.
    pub fn load(&self, series_key: &str) -> Result<Vec<MigrationInfo>> {
        let selected: Vec<&MigrationDefinition> = self
            .definitions
            .iter()
            .filter(|d| d.info.series_key == series_key && !d.info.ignore)
            .collect();

        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for d in &selected {
            *counts.entry(d.info.version).or_default() += 1;
        }
        let duplicates: Vec<i64> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(version, _)| version)
            .collect();
        if !duplicates.is_empty() {
            return Err(MigrateError::DuplicatedVersions {
                versions: duplicates,
            });
        }

        let mut infos: Vec<MigrationInfo> = selected.into_iter().map(|d| d.info.clone()).collect();
        infos.sort_by_key(|info| info.version);
        Ok(infos)
    }

    /// Highest loadable version of the series, or 0.
    pub fn last_version(&self, series_key: &str) -> Result<i64> {
        Ok(self
            .load(series_key)?
            .last()
            .map(|info| info.version)
            .unwrap_or(0))
    }

    /// The unit registered for `version` in `series_key`.
    pub fn get(&self, version: i64, series_key: &str) -> Option<&MigrationDefinition> {
        self.definitions
            .iter()
            .find(|d| d.info.version == version && d.info.series_key == series_key && !d.info.ignore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Migration;
    use crate::provider::TransformationProvider;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Migration for Noop {
        async fn apply(&self, _db: &mut dyn TransformationProvider) -> Result<()> {
            Ok(())
        }

        async fn revert(&self, _db: &mut dyn TransformationProvider) -> Result<()> {
            Ok(())
        }
    }

    fn unit(info: MigrationInfo) -> MigrationDefinition {
        MigrationDefinition::new(info, Noop)
    }

    #[test]
    fn test_load_sorts_and_filters() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(unit(MigrationInfo::new(20, "b")))
            .register(unit(MigrationInfo::new(10, "a")))
            .register(unit(MigrationInfo::new(15, "skip").ignored()))
            .register(unit(MigrationInfo::new(5, "other").series("billing")));

        let versions: Vec<i64> = registry.load("").unwrap().iter().map(|i| i.version).collect();
        assert_eq!(versions, vec![10, 20]);
        assert_eq!(registry.last_version("").unwrap(), 20);
        assert_eq!(registry.last_version("billing").unwrap(), 5);
        assert_eq!(registry.last_version("none").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(unit(MigrationInfo::new(7, "first")))
            .register(unit(MigrationInfo::new(3, "other")))
            .register(unit(MigrationInfo::new(7, "second")));

        let err = registry.load("").unwrap_err();
        assert!(matches!(err, MigrateError::DuplicatedVersions { ref versions } if versions == &vec![7]));
    }

    #[test]
    fn test_same_version_in_other_series_is_fine() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(unit(MigrationInfo::new(7, "main")))
            .register(unit(MigrationInfo::new(7, "billing").series("billing")))
            .register(unit(MigrationInfo::new(7, "retired").ignored()));

        assert_eq!(registry.load("").unwrap().len(), 1);
        assert_eq!(registry.get(7, "billing").unwrap().info.name, "billing");
        assert_eq!(registry.get(7, "").unwrap().info.name, "main");
    }
}
