//! Migration units and their metadata.
//!
//! A unit is any type implementing [`Migration`]; it is paired with its
//! [`MigrationInfo`] in a [`MigrationDefinition`] and registered explicitly
//! with a [`MigrationRegistry`]. SQL files on disk become units through
//! [`SqlScriptSource`].

mod executor;
mod planner;
mod registry;
mod script;

pub use executor::{MigrationReport, MigrationStatus, Migrator, MigratorState, StepReport};
pub use planner::{plan, MigrationPlan};
pub use registry::MigrationRegistry;
pub use script::{SqlScriptMigration, SqlScriptSource};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::provider::TransformationProvider;

/// Which way a step moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Apply,
    Revert,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Apply => write!(f, "apply"),
            Direction::Revert => write!(f, "revert"),
        }
    }
}

/// A versioned schema transformation.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Move the schema forward.
    async fn apply(&self, db: &mut dyn TransformationProvider) -> Result<()>;

    /// Undo [`apply`](Self::apply).
    async fn revert(&self, db: &mut dyn TransformationProvider) -> Result<()>;
}

/// Immutable metadata of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub name: String,
    /// Series the unit belongs to; empty for the default series.
    pub series_key: String,
    /// Ignored units are never planned.
    pub ignore: bool,
    /// Run the step outside a transaction.
    pub without_transaction: bool,
}

impl MigrationInfo {
    pub fn new(version: i64, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            series_key: String::new(),
            ignore: false,
            without_transaction: false,
        }
    }

    pub fn series(mut self, key: impl Into<String>) -> Self {
        self.series_key = key.into();
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn without_transaction(mut self) -> Self {
        self.without_transaction = true;
        self
    }
}

/// A unit together with its metadata.
#[derive(Clone)]
pub struct MigrationDefinition {
    pub info: MigrationInfo,
    pub migration: Arc<dyn Migration>,
}

impl MigrationDefinition {
    pub fn new(info: MigrationInfo, migration: impl Migration + 'static) -> Self {
        Self {
            info,
            migration: Arc::new(migration),
        }
    }
}

impl fmt::Debug for MigrationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDefinition")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
