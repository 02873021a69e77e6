//! # schemashift
//!
//! Versioned schema migrations with dialect-aware SQL generation.
//!
//! Migration units are numbered transformations registered explicitly in a
//! [`MigrationRegistry`]. A [`Migrator`] compares them with the versions
//! recorded in the target database, plans the steps to reach a target
//! version and runs each step in its own transaction through a
//! [`TransformationProvider`]:
//!
//! - **Dialects as data**: quoting, type maps and statement templates per
//!   database, consumed by one generic provider
//! - **Series**: independent version histories sharing one bookkeeping table
//! - **SQL scripts**: `<version>_<name>.up.sql` files loaded from a directory
//! - **Drivers** for PostgreSQL, SQL Server, MySQL/MariaDB and SQLite
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use schemashift::{MigrationRegistry, Migrator, ProviderFactory, SqlScriptSource};
//!
//! # async fn run() -> schemashift::Result<()> {
//! let factory = ProviderFactory::with_builtins();
//! let provider = factory
//!     .create("postgres", "host=localhost user=app dbname=app", Some(Duration::from_secs(30)))
//!     .await?;
//!
//! let mut registry = MigrationRegistry::new();
//! registry.extend(SqlScriptSource::load("migrations")?.into_definitions());
//!
//! let mut migrator = Migrator::new(provider, registry);
//! let report = migrator.migrate(None).await?;
//! println!("Now at version {}", report.final_version);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod factory;
pub mod migration;
pub mod provider;

// Re-exports for convenient access
pub use crate::core::{
    Column, ColumnProperty, ColumnType, DbType, ForeignKey, ForeignKeyAction, Index, Row,
    SqlValue,
};
pub use config::{Config, ConnectionConfig, MigrationsConfig};
pub use dialect::Dialect;
pub use error::{MigrateError, Result};
pub use factory::{ProviderFactory, ProviderRegistration};
pub use migration::{
    Direction, Migration, MigrationDefinition, MigrationInfo, MigrationPlan, MigrationRegistry,
    MigrationReport, MigrationStatus, Migrator, SqlScriptSource,
};
pub use provider::{Outcome, Provider, TransformationProvider};
