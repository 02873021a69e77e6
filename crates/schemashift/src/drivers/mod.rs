//! Database driver implementations.
//!
//! Each driver module carries two halves:
//!
//! - `dialect`: the [`Dialect`](crate::dialect::Dialect) data for the engine
//!   (always compiled, no driver dependency)
//! - a [`Connection`] implementation over the native client crate, gated by
//!   a cargo feature
//!
//! | Module       | Feature    | Client crate       |
//! |--------------|------------|--------------------|
//! | [`postgres`] | `postgres` | `tokio-postgres`   |
//! | [`mssql`]    | `mssql`    | `tiberius`         |
//! | [`mysql`]    | `mysql`    | `sqlx` (MySQL)     |
//! | [`sqlite`]   | `sqlite`   | `sqlx` (SQLite)    |
//!
//! # Adding New Databases
//!
//! 1. Create a module under `drivers/` with a `dialect()` constructor
//! 2. Implement [`Connection`] for the native client
//! 3. Register both in `ProviderFactory::with_builtins()`

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

#[cfg(feature = "mssql")]
pub use mssql::MssqlConnection;
#[cfg(feature = "mysql")]
pub use mysql::MysqlConnection;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;

use async_trait::async_trait;

use crate::core::value::{Row, SqlValue};
use crate::error::BoxError;

/// A single native database connection.
///
/// Implementations only move statements and values across the wire.
/// Errors are returned unwrapped; the provider attaches the statement text
/// and turns them into `MigrateError::SqlExecution`.
#[async_trait]
pub trait Connection: Send {
    /// Driver identifier used in log lines.
    fn driver_name(&self) -> &'static str;

    /// Run one statement with bound parameters, returning affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BoxError>;

    /// Run one statement with bound parameters and collect every row.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BoxError>;

    /// Run unparameterized SQL, possibly several statements, through the
    /// simple/text protocol.
    async fn batch(&mut self, sql: &str) -> Result<(), BoxError>;
}
