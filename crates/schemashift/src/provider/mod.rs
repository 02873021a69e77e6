//! The operation surface migrations call.
//!
//! [`TransformationProvider`] is implemented once, by [`Provider`], which
//! pairs a [`Dialect`] with a driver [`Connection`](crate::drivers::Connection).
//! Every operation is a default method built on four primitives (`dialect`,
//! `execute`, `query`, `batch`), so a test double only needs those.
//!
//! Idempotent operations report what happened through [`Outcome`] instead
//! of failing when the object already exists or is already gone. Renames
//! are not idempotent: renaming a missing object or onto an existing name
//! fails with `InvalidSchemaObject` before any statement is sent.
//!
//! # Bookkeeping
//!
//! Applied versions live in `SchemaInfo (Version, Key)`. The table is
//! created on first use. A legacy `Version`-only table is rebuilt with the
//! compound `(Version, Key)` primary key, its rows landing in the default
//! series. The rebuild goes through a staging table on every dialect since
//! the old key constraint has an engine-generated name.

pub mod builder;
mod sql;

pub use builder::SchemaStatementBuilder;
pub use sql::Provider;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::identifier::{FormatArg, SchemaQualifiedName};
use crate::core::schema::{Column, ColumnProperty, ColumnType, DbType, ForeignKey, Index};
use crate::core::value::{Row, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// Bookkeeping table name.
pub const SCHEMA_INFO_TABLE: &str = "SchemaInfo";

/// Bookkeeping version column.
pub const VERSION_COLUMN: &str = "Version";

/// Bookkeeping series key column.
pub const KEY_COLUMN: &str = "Key";

const KEY_LENGTH: u32 = 200;

/// Staging table used while rebuilding a legacy `SchemaInfo`.
const SCHEMA_INFO_STAGING_TABLE: &str = "SchemaInfo_upgrade";

/// Result of an idempotent schema operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The object was created.
    Created,
    /// The object was dropped.
    Removed,
    /// Nothing to create; the object was already there.
    AlreadyExists,
    /// Nothing to drop; the object was not there.
    Missing,
}

impl Outcome {
    /// True when a statement was actually executed.
    pub fn changed(self) -> bool {
        matches!(self, Outcome::Created | Outcome::Removed)
    }
}

/// Columns of a freshly created bookkeeping table.
pub fn schema_info_columns() -> Vec<Column> {
    vec![
        Column::new(VERSION_COLUMN, DbType::Int64)
            .with_properties(ColumnProperty::PRIMARY_KEY | ColumnProperty::NOT_NULL),
        key_column().with_properties(ColumnProperty::PRIMARY_KEY | ColumnProperty::NOT_NULL),
    ]
}

fn key_column() -> Column {
    Column::new(KEY_COLUMN, ColumnType::new(DbType::String).with_length(KEY_LENGTH))
        .with_properties(ColumnProperty::NOT_NULL)
        .with_default("")
}

fn schema_info() -> SchemaQualifiedName {
    SchemaQualifiedName::new(SCHEMA_INFO_TABLE)
}

fn schema_param(name: &SchemaQualifiedName) -> SqlValue {
    SqlValue::Text(name.schema().unwrap_or_default().to_string())
}

/// Schema, data and bookkeeping operations available to migrations.
#[async_trait]
pub trait TransformationProvider: Send {
    // =========================================================================
    // Primitives
    // =========================================================================

    /// Dialect data used to render every statement.
    fn dialect(&self) -> &Dialect;

    /// Run one statement, returning the affected row count.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run one statement and collect its rows.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run unparameterized SQL that may hold several statements.
    async fn batch(&mut self, sql: &str) -> Result<()>;

    /// Statement builder for this provider's dialect.
    fn statements(&self) -> SchemaStatementBuilder<'_> {
        SchemaStatementBuilder::new(self.dialect())
    }

    /// First column of the first row as an integer, or 0.
    async fn query_count(&mut self, sql: &str, params: &[SqlValue]) -> Result<i64> {
        let rows = self.query(sql, params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0))
    }

    // =========================================================================
    // Tables
    // =========================================================================

    async fn table_exists(&mut self, table: &SchemaQualifiedName) -> Result<bool> {
        let sql = self.dialect().catalog().table_exists.clone();
        let params = [schema_param(table), SqlValue::Text(table.name.clone())];
        Ok(self.query_count(&sql, &params).await? > 0)
    }

    /// Table names in `schema` (the connection's default schema when `None`).
    async fn get_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        let sql = self.dialect().catalog().tables.clone();
        let params = [SqlValue::Text(schema.unwrap_or_default().to_string())];
        let rows = self.query(&sql, &params).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|value| match value {
                SqlValue::Text(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    async fn add_table(&mut self, table: &SchemaQualifiedName, columns: &[Column]) -> Result<Outcome> {
        let sql = self.statements().create_table(table, columns)?;
        if self.table_exists(table).await? {
            debug!("Table {} already exists", table);
            return Ok(Outcome::AlreadyExists);
        }
        self.execute(&sql, &[]).await?;
        info!("Created table {}", table);
        Ok(Outcome::Created)
    }

    async fn remove_table(&mut self, table: &SchemaQualifiedName) -> Result<Outcome> {
        let sql = self.statements().drop_table(table)?;
        if !self.table_exists(table).await? {
            debug!("Table {} does not exist", table);
            return Ok(Outcome::Missing);
        }
        self.execute(&sql, &[]).await?;
        info!("Dropped table {}", table);
        Ok(Outcome::Removed)
    }

    async fn rename_table(&mut self, table: &SchemaQualifiedName, new_name: &str) -> Result<()> {
        let sql = self.statements().rename_table(table, new_name)?;
        let target = table.sibling(new_name);
        if self.table_exists(&target).await? {
            return Err(MigrateError::invalid_object(format!(
                "Cannot rename {} to {}: table already exists",
                table, target
            )));
        }
        if !self.table_exists(table).await? {
            return Err(MigrateError::invalid_object(format!(
                "Cannot rename {}: table does not exist",
                table
            )));
        }
        self.execute(&sql, &[]).await?;
        info!("Renamed table {} to {}", table, target);
        Ok(())
    }

    // =========================================================================
    // Columns
    // =========================================================================

    async fn column_exists(&mut self, table: &SchemaQualifiedName, column: &str) -> Result<bool> {
        let sql = self.dialect().catalog().column_exists.clone();
        let params = [
            schema_param(table),
            SqlValue::Text(table.name.clone()),
            SqlValue::Text(column.to_string()),
        ];
        Ok(self.query_count(&sql, &params).await? > 0)
    }

    async fn add_column(&mut self, table: &SchemaQualifiedName, column: &Column) -> Result<Outcome> {
        let sql = self.statements().add_column(table, column)?;
        if self.column_exists(table, &column.name).await? {
            debug!("Column {}.{} already exists", table, column.name);
            return Ok(Outcome::AlreadyExists);
        }
        self.execute(&sql, &[]).await?;
        info!("Added column {}.{}", table, column.name);
        Ok(Outcome::Created)
    }

    async fn remove_column(&mut self, table: &SchemaQualifiedName, column: &str) -> Result<Outcome> {
        let sql = self.statements().drop_column(table, column)?;
        if !self.column_exists(table, column).await? {
            debug!("Column {}.{} does not exist", table, column);
            return Ok(Outcome::Missing);
        }
        self.execute(&sql, &[]).await?;
        info!("Dropped column {}.{}", table, column);
        Ok(Outcome::Removed)
    }

    async fn rename_column(&mut self, table: &SchemaQualifiedName, old: &str, new: &str) -> Result<()> {
        let sql = self.statements().rename_column(table, old, new)?;
        if self.column_exists(table, new).await? {
            return Err(MigrateError::invalid_object(format!(
                "Cannot rename {}.{} to {}: column already exists",
                table, old, new
            )));
        }
        if !self.column_exists(table, old).await? {
            return Err(MigrateError::invalid_object(format!(
                "Cannot rename {}.{}: column does not exist",
                table, old
            )));
        }
        self.execute(&sql, &[]).await?;
        info!("Renamed column {}.{} to {}", table, old, new);
        Ok(())
    }

    /// Redefine an existing column's type, nullability and default.
    async fn change_column(&mut self, table: &SchemaQualifiedName, column: &Column) -> Result<()> {
        let sql = self.statements().change_column(table, column)?;
        self.execute(&sql, &[]).await?;
        info!("Changed column {}.{}", table, column.name);
        Ok(())
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    async fn constraint_exists(&mut self, table: &SchemaQualifiedName, name: &str) -> Result<bool> {
        let sql = self
            .dialect()
            .catalog()
            .constraint_exists
            .clone()
            .ok_or_else(|| MigrateError::unsupported(self.dialect().name(), "constraint lookup"))?;
        let params = [
            schema_param(table),
            SqlValue::Text(table.name.clone()),
            SqlValue::Text(name.to_string()),
        ];
        Ok(self.query_count(&sql, &params).await? > 0)
    }

    async fn add_primary_key(
        &mut self,
        name: &str,
        table: &SchemaQualifiedName,
        columns: &[String],
    ) -> Result<Outcome> {
        let sql = self.statements().primary_key(name, table, columns)?;
        add_constraint(self, table, name, &sql).await
    }

    async fn add_foreign_key(&mut self, fk: &ForeignKey) -> Result<Outcome> {
        let sql = self.statements().foreign_key(fk)?;
        add_constraint(self, &fk.table, &fk.name, &sql).await
    }

    async fn add_unique(
        &mut self,
        name: &str,
        table: &SchemaQualifiedName,
        columns: &[String],
    ) -> Result<Outcome> {
        let sql = self.statements().unique(name, table, columns)?;
        add_constraint(self, table, name, &sql).await
    }

    async fn add_check_constraint(
        &mut self,
        name: &str,
        table: &SchemaQualifiedName,
        expression: &str,
    ) -> Result<Outcome> {
        let sql = self.statements().check(name, table, expression)?;
        add_constraint(self, table, name, &sql).await
    }

    async fn remove_constraint(&mut self, table: &SchemaQualifiedName, name: &str) -> Result<Outcome> {
        let sql = self.statements().drop_constraint(table, name)?;
        if !self.constraint_exists(table, name).await? {
            debug!("Constraint {} on {} does not exist", name, table);
            return Ok(Outcome::Missing);
        }
        self.execute(&sql, &[]).await?;
        info!("Dropped constraint {} on {}", name, table);
        Ok(Outcome::Removed)
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    async fn index_exists(&mut self, table: &SchemaQualifiedName, name: &str) -> Result<bool> {
        let sql = self.dialect().catalog().index_exists.clone();
        let params = [
            schema_param(table),
            SqlValue::Text(table.name.clone()),
            SqlValue::Text(name.to_string()),
        ];
        Ok(self.query_count(&sql, &params).await? > 0)
    }

    async fn add_index(&mut self, index: &Index) -> Result<Outcome> {
        let sql = self.statements().create_index(index)?;
        if self.index_exists(&index.table, &index.name).await? {
            debug!("Index {} on {} already exists", index.name, index.table);
            return Ok(Outcome::AlreadyExists);
        }
        self.execute(&sql, &[]).await?;
        info!("Created index {} on {}", index.name, index.table);
        Ok(Outcome::Created)
    }

    async fn remove_index(&mut self, table: &SchemaQualifiedName, name: &str) -> Result<Outcome> {
        let sql = self.statements().drop_index(table, name)?;
        if !self.index_exists(table, name).await? {
            debug!("Index {} on {} does not exist", name, table);
            return Ok(Outcome::Missing);
        }
        self.execute(&sql, &[]).await?;
        info!("Dropped index {} on {}", name, table);
        Ok(Outcome::Removed)
    }

    // =========================================================================
    // Data
    // =========================================================================

    async fn insert(
        &mut self,
        table: &SchemaQualifiedName,
        columns: &[String],
        values: &[SqlValue],
    ) -> Result<u64> {
        check_arity(table, columns, values)?;
        let sql = self.statements().insert(table, columns)?;
        self.execute(&sql, values).await
    }

    /// Update `columns` to `values`; `where_clause` is raw SQL.
    async fn update(
        &mut self,
        table: &SchemaQualifiedName,
        columns: &[String],
        values: &[SqlValue],
        where_clause: Option<&str>,
    ) -> Result<u64> {
        check_arity(table, columns, values)?;
        let sql = self.statements().update(table, columns, where_clause)?;
        self.execute(&sql, values).await
    }

    async fn delete(&mut self, table: &SchemaQualifiedName, where_clause: Option<&str>) -> Result<u64> {
        let sql = self.statements().delete(table, where_clause)?;
        self.execute(&sql, &[]).await
    }

    async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        self.execute(sql, &[]).await
    }

    /// First column of the first row, or NULL for an empty result.
    async fn execute_scalar(&mut self, sql: &str) -> Result<SqlValue> {
        let rows = self.query(sql, &[]).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(SqlValue::Null))
    }

    async fn execute_query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.query(sql, &[]).await
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    /// Create `SchemaInfo`, or rebuild a legacy table with the `Key` column.
    async fn ensure_schema_info(&mut self) -> Result<()> {
        let table = schema_info();
        let staging = table.sibling(SCHEMA_INFO_STAGING_TABLE);

        if !self.table_exists(&table).await? {
            // An interrupted rebuild leaves every row in the staging table.
            if self.table_exists(&staging).await? {
                warn!("Resuming interrupted upgrade of {}", SCHEMA_INFO_TABLE);
                return self.rename_table(&staging, SCHEMA_INFO_TABLE).await;
            }
            info!("Creating bookkeeping table {}", SCHEMA_INFO_TABLE);
            self.add_table(&table, &schema_info_columns()).await?;
            return Ok(());
        }

        if !self.column_exists(&table, KEY_COLUMN).await? {
            info!(
                "Upgrading legacy {} table to a ({}, {}) primary key",
                SCHEMA_INFO_TABLE, VERSION_COLUMN, KEY_COLUMN
            );
            self.remove_table(&staging).await?;
            self.add_table(&staging, &schema_info_columns()).await?;

            let empty_key = self.dialect().literal(&SqlValue::Text(String::new()));
            let copy = self.dialect().format(
                "INSERT INTO {0:NAME} ({1:NAME}, {2:NAME}) SELECT {1:NAME}, {3} FROM {4:NAME}",
                &[
                    FormatArg::Name(&staging),
                    FormatArg::Text(VERSION_COLUMN),
                    FormatArg::Text(KEY_COLUMN),
                    FormatArg::Text(&empty_key),
                    FormatArg::Name(&table),
                ],
            )?;
            let copied = self.execute(&copy, &[]).await?;
            debug!("Copied {} legacy bookkeeping rows", copied);

            self.remove_table(&table).await?;
            self.rename_table(&staging, SCHEMA_INFO_TABLE).await?;
        }
        Ok(())
    }

    /// Applied versions for a series, ascending.
    async fn applied_versions(&mut self, key: &str) -> Result<Vec<i64>> {
        self.ensure_schema_info().await?;
        select_versions(self, Some(key)).await
    }

    /// Applied versions for a series without creating or upgrading
    /// `SchemaInfo`. Rows of a legacy table belong to the default series.
    async fn recorded_versions(&mut self, key: &str) -> Result<Vec<i64>> {
        let table = schema_info();
        if !self.table_exists(&table).await? {
            return Ok(Vec::new());
        }
        if self.column_exists(&table, KEY_COLUMN).await? {
            select_versions(self, Some(key)).await
        } else if key.is_empty() {
            select_versions(self, None).await
        } else {
            Ok(Vec::new())
        }
    }

    /// Record `version` as applied. Recording it twice is a no-op.
    async fn mark_applied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_schema_info().await?;
        let params = [SqlValue::Int(version), SqlValue::Text(key.to_string())];

        let filter = version_filter(self.dialect())?;
        let count_sql = self.dialect().format(
            "SELECT COUNT(*) FROM {0:NAME} WHERE {1}",
            &[FormatArg::Name(&schema_info()), FormatArg::Text(&filter)],
        )?;
        if self.query_count(&count_sql, &params).await? > 0 {
            debug!("Version {} already recorded for series '{}'", version, key);
            return Ok(());
        }

        let columns = [VERSION_COLUMN.to_string(), KEY_COLUMN.to_string()];
        let sql = self.statements().insert(&schema_info(), &columns)?;
        self.execute(&sql, &params).await?;
        Ok(())
    }

    /// Forget `version`. Removing an unrecorded version is a no-op.
    async fn mark_unapplied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_schema_info().await?;
        let filter = version_filter(self.dialect())?;
        let sql = self.statements().delete(&schema_info(), Some(&filter))?;
        self.execute(&sql, &[SqlValue::Int(version), SqlValue::Text(key.to_string())])
            .await?;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    async fn begin(&mut self) -> Result<()> {
        let sql = self.dialect().statements().begin.clone();
        self.batch(&sql).await
    }

    async fn commit(&mut self) -> Result<()> {
        let sql = self.dialect().statements().commit.clone();
        self.batch(&sql).await
    }

    async fn rollback(&mut self) -> Result<()> {
        let sql = self.dialect().statements().rollback.clone();
        self.batch(&sql).await
    }
}

/// `"Version" = p1 AND "Key" = p2`
fn version_filter(dialect: &Dialect) -> Result<String> {
    Ok(format!(
        "{} = {} AND {} = {}",
        dialect.quote_ident(VERSION_COLUMN)?,
        dialect.param(1),
        dialect.quote_ident(KEY_COLUMN)?,
        dialect.param(2)
    ))
}

fn check_arity(table: &SchemaQualifiedName, columns: &[String], values: &[SqlValue]) -> Result<()> {
    if columns.len() != values.len() {
        return Err(MigrateError::invalid_object(format!(
            "{} columns but {} values for {}",
            columns.len(),
            values.len(),
            table
        )));
    }
    Ok(())
}

/// Versions in `SchemaInfo`, restricted to one series when `key` is given.
async fn select_versions<P>(db: &mut P, key: Option<&str>) -> Result<Vec<i64>>
where
    P: TransformationProvider + ?Sized,
{
    let dialect = db.dialect();
    let table = schema_info();
    let (sql, params) = match key {
        Some(key) => {
            let param = dialect.param(1);
            let sql = dialect.format(
                "SELECT {0:NAME} FROM {1:NAME} WHERE {2:NAME} = {3} ORDER BY {0:NAME}",
                &[
                    FormatArg::Text(VERSION_COLUMN),
                    FormatArg::Name(&table),
                    FormatArg::Text(KEY_COLUMN),
                    FormatArg::Text(&param),
                ],
            )?;
            (sql, vec![SqlValue::Text(key.to_string())])
        }
        None => {
            let sql = dialect.format(
                "SELECT {0:NAME} FROM {1:NAME} ORDER BY {0:NAME}",
                &[FormatArg::Text(VERSION_COLUMN), FormatArg::Name(&table)],
            )?;
            (sql, Vec::new())
        }
    };

    let rows = db.query(&sql, &params).await?;
    let mut versions: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.first().and_then(SqlValue::as_i64))
        .collect();
    versions.sort_unstable();
    Ok(versions)
}

async fn add_constraint<P>(db: &mut P, table: &SchemaQualifiedName, name: &str, sql: &str) -> Result<Outcome>
where
    P: TransformationProvider + ?Sized,
{
    if db.constraint_exists(table, name).await? {
        debug!("Constraint {} on {} already exists", name, table);
        return Ok(Outcome::AlreadyExists);
    }
    db.execute(sql, &[]).await?;
    info!("Added constraint {} on {}", name, table);
    Ok(Outcome::Created)
}
