//! The concrete provider: one dialect plus one driver connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::value::{Row, SqlValue};
use crate::dialect::Dialect;
use crate::drivers::Connection;
use crate::error::{BoxError, MigrateError, Result};

use super::TransformationProvider;

/// [`TransformationProvider`] over a driver [`Connection`].
///
/// Every driver call is bounded by the optional command timeout; an
/// elapsed timeout surfaces as `SqlExecution` with the statement text.
pub struct Provider {
    dialect: Arc<Dialect>,
    connection: Box<dyn Connection>,
    command_timeout: Option<Duration>,
    in_transaction: bool,
}

impl Provider {
    pub fn new(dialect: Arc<Dialect>, connection: Box<dyn Connection>) -> Self {
        Self {
            dialect,
            connection,
            command_timeout: None,
            in_transaction: false,
        }
    }

    /// Bound every statement by `timeout`.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    /// True between a successful `begin` and the matching `commit`/`rollback`.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn driver_name(&self) -> &'static str {
        self.connection.driver_name()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("dialect", &self.dialect.name())
            .field("driver", &self.connection.driver_name())
            .field("command_timeout", &self.command_timeout)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

/// Await a driver call under the command timeout and attach the statement
/// to any failure.
async fn run<T, F>(timeout: Option<Duration>, sql: &str, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, BoxError>>,
{
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(elapsed) => {
                warn!("Statement timed out after {:?}", limit);
                return Err(MigrateError::sql(sql, elapsed));
            }
        },
        None => call.await,
    };
    result.map_err(|e| MigrateError::sql(sql, e))
}

#[async_trait]
impl TransformationProvider for Provider {
    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!("[{}] {}", self.dialect.name(), sql);
        run(self.command_timeout, sql, self.connection.execute(sql, params)).await
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        debug!("[{}] {}", self.dialect.name(), sql);
        run(self.command_timeout, sql, self.connection.query(sql, params)).await
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        debug!("[{}] {}", self.dialect.name(), sql);
        run(self.command_timeout, sql, self.connection.batch(sql)).await
    }

    async fn begin(&mut self) -> Result<()> {
        let sql = self.dialect.statements().begin.clone();
        self.batch(&sql).await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let sql = self.dialect.statements().commit.clone();
        self.batch(&sql).await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction; without one this does nothing.
    async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            debug!("No open transaction to roll back");
            return Ok(());
        }
        let sql = self.dialect.statements().rollback.clone();
        self.in_transaction = false;
        self.batch(&sql).await
    }
}
