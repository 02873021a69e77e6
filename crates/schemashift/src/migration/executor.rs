//! Plan execution.
//!
//! The [`Migrator`] owns one provider and one registry. `migrate` plans,
//! then runs each step in its own transaction:
//!
//! ```text
//! Idle -> Planning -> StepBegin -> StepApplyOrRevert -> StepCommit ----> Done
//!                                                    \-> StepRollback -> Failed
//! ```
//!
//! Steps already committed stay committed when a later step fails, so a
//! rerun resumes from the last recorded version. On dialects whose DDL
//! commits implicitly (MySQL) a step is not atomic: a failure reports that
//! the schema may be partly changed.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::provider::TransformationProvider;

use super::planner::{plan, MigrationPlan};
use super::registry::MigrationRegistry;
use super::{Direction, MigrationDefinition, MigrationInfo};

/// Observable state of a [`Migrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigratorState {
    Idle,
    Planning,
    StepBegin,
    StepApplyOrRevert,
    StepCommit,
    StepRollback,
    Done,
    Failed,
}

/// One executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub version: i64,
    pub name: String,
    pub direction: Direction,
    pub duration_ms: u64,
}

/// Summary of a `migrate` call.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub series_key: String,
    pub start_version: i64,
    pub target_version: i64,
    pub final_version: i64,
    pub steps: Vec<StepReport>,
}

/// One row of [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    /// `None` for applied versions with no registered unit.
    pub name: Option<String>,
    pub applied: bool,
    pub available: bool,
}

/// Drives migrations for one series against one provider.
pub struct Migrator {
    db: Box<dyn TransformationProvider>,
    registry: MigrationRegistry,
    series_key: String,
    state: MigratorState,
}

impl Migrator {
    pub fn new(db: Box<dyn TransformationProvider>, registry: MigrationRegistry) -> Self {
        Self {
            db,
            registry,
            series_key: String::new(),
            state: MigratorState::Idle,
        }
    }

    /// Work on series `key` instead of the default series.
    pub fn with_series(mut self, key: impl Into<String>) -> Self {
        self.series_key = key.into();
        self
    }

    pub fn series_key(&self) -> &str {
        &self.series_key
    }

    pub fn state(&self) -> MigratorState {
        self.state
    }

    pub fn provider(&mut self) -> &mut dyn TransformationProvider {
        self.db.as_mut()
    }

    /// Give the provider back, e.g. to run a second registry on it.
    pub fn into_provider(self) -> Box<dyn TransformationProvider> {
        self.db
    }

    /// Registered units of this series, validated and sorted.
    pub fn available_migrations(&self) -> Result<Vec<MigrationInfo>> {
        self.registry.load(&self.series_key)
    }

    /// Versions recorded as applied for this series.
    pub async fn applied_versions(&mut self) -> Result<Vec<i64>> {
        self.db.applied_versions(&self.series_key).await
    }

    /// Compute the plan for `target` without executing it.
    ///
    /// `None` or `-1` targets the latest available version. Planning only
    /// reads the bookkeeping table; it is not created here.
    pub async fn plan(&mut self, target: Option<i64>) -> Result<MigrationPlan> {
        let available: Vec<i64> = self
            .available_migrations()?
            .iter()
            .map(|info| info.version)
            .collect();
        let applied = self.db.recorded_versions(&self.series_key).await?;

        let target = match target {
            Some(v) if v != -1 => v,
            _ => available
                .last()
                .or_else(|| applied.last())
                .copied()
                .unwrap_or(0),
        };
        plan(target, &applied, &available)
    }

    /// Move the schema to `target` (latest when `None` or `-1`).
    pub async fn migrate(&mut self, target: Option<i64>) -> Result<MigrationReport> {
        self.state = MigratorState::Planning;
        let plan = match self.plan(target).await {
            Ok(plan) => plan,
            Err(e) => {
                self.state = MigratorState::Failed;
                return Err(e);
            }
        };

        if plan.is_empty() {
            info!(
                "Schema is up to date at version {} (series '{}')",
                plan.start_version, self.series_key
            );
        } else {
            info!(
                "Migrating series '{}' from version {} to {}: {} step(s)",
                self.series_key,
                plan.start_version,
                plan.target_version,
                plan.versions.len()
            );
        }

        let mut current = plan.start_version;
        let mut steps = Vec::with_capacity(plan.versions.len());

        for &version in &plan.versions {
            let definition = match self.registry.get(version, &self.series_key) {
                Some(definition) => definition.clone(),
                None => {
                    self.state = MigratorState::Failed;
                    return Err(MigrateError::MigrationNotFound { version });
                }
            };
            let direction = if version <= current {
                Direction::Revert
            } else {
                Direction::Apply
            };

            let started = Instant::now();
            self.run_step(&definition, direction).await?;
            let elapsed = started.elapsed();

            info!(
                "Migration {} ({}) {} in {:.2?}",
                version,
                definition.info.name,
                match direction {
                    Direction::Apply => "applied",
                    Direction::Revert => "reverted",
                },
                elapsed
            );
            steps.push(StepReport {
                version,
                name: definition.info.name.clone(),
                direction,
                duration_ms: elapsed.as_millis() as u64,
            });
            current = version;
        }

        let final_version = self.applied_versions().await?.last().copied().unwrap_or(0);
        self.state = MigratorState::Done;

        Ok(MigrationReport {
            series_key: self.series_key.clone(),
            start_version: plan.start_version,
            target_version: plan.target_version,
            final_version,
            steps,
        })
    }

    async fn run_step(&mut self, definition: &MigrationDefinition, direction: Direction) -> Result<()> {
        let info = &definition.info;
        let transactional = !info.without_transaction;
        let atomic = transactional && self.db.dialect().features().transactional_ddl;
        if transactional && !atomic {
            warn!(
                "Dialect {} cannot roll back DDL; migration {} ({}) is not atomic",
                self.db.dialect().name(),
                info.version,
                info.name
            );
        }
        debug!(
            "Running {} of migration {} ({}){}",
            direction,
            info.version,
            info.name,
            if transactional { "" } else { " without transaction" }
        );

        match self.execute_step(definition, direction, transactional).await {
            Ok(()) => Ok(()),
            Err(source) => {
                self.state = MigratorState::StepRollback;
                let mut rolled_back = atomic;
                if transactional {
                    if let Err(e) = self.db.rollback().await {
                        warn!("Rollback of migration {} failed: {}", info.version, e);
                        rolled_back = false;
                    }
                }
                self.state = MigratorState::Failed;

                let err = MigrateError::step(info.version, info.name.clone(), direction, source);
                if rolled_back {
                    Err(err)
                } else {
                    warn!(
                        "Migration {} ({}) failed and was not fully rolled back",
                        info.version, info.name
                    );
                    Err(err.with_partial_changes())
                }
            }
        }
    }

    async fn execute_step(
        &mut self,
        definition: &MigrationDefinition,
        direction: Direction,
        transactional: bool,
    ) -> Result<()> {
        let version = definition.info.version;

        if transactional {
            self.state = MigratorState::StepBegin;
            self.db.begin().await?;
        }

        self.state = MigratorState::StepApplyOrRevert;
        match direction {
            Direction::Apply => {
                definition.migration.apply(self.db.as_mut()).await?;
                self.db.mark_applied(version, &self.series_key).await?;
            }
            Direction::Revert => {
                definition.migration.revert(self.db.as_mut()).await?;
                self.db.mark_unapplied(version, &self.series_key).await?;
            }
        }

        if transactional {
            self.state = MigratorState::StepCommit;
            self.db.commit().await?;
        }
        Ok(())
    }

    /// Every known version of this series with its applied/available flags.
    pub async fn status(&mut self) -> Result<Vec<MigrationStatus>> {
        let available: BTreeMap<i64, String> = self
            .available_migrations()?
            .into_iter()
            .map(|info| (info.version, info.name))
            .collect();
        let applied: BTreeSet<i64> = self.applied_versions().await?.into_iter().collect();

        let versions: BTreeSet<i64> = available.keys().copied().chain(applied.iter().copied()).collect();
        Ok(versions
            .into_iter()
            .map(|version| MigrationStatus {
                version,
                name: available.get(&version).cloned(),
                applied: applied.contains(&version),
                available: available.contains_key(&version),
            })
            .collect())
    }

    /// Drop the bookkeeping row for `version` without running any revert.
    ///
    /// Returns false when the version was not recorded.
    pub async fn forget(&mut self, version: i64) -> Result<bool> {
        let applied = self.applied_versions().await?;
        if !applied.contains(&version) {
            return Ok(false);
        }
        self.db.mark_unapplied(version, &self.series_key).await?;
        warn!(
            "Forgot version {} of series '{}' without reverting it",
            version, self.series_key
        );
        Ok(true)
    }
}
