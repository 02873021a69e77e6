//! SQLite connection over `sqlx`.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Connection as _, Executor, Row as _, TypeInfo, ValueRef};
use tracing::info;

use crate::core::value::{Row, SqlValue};
use crate::drivers::Connection;
use crate::error::{BoxError, MigrateError, Result};

use super::NAME;

/// A single SQLite database handle.
pub struct SqliteConnection {
    conn: sqlx::SqliteConnection,
}

impl SqliteConnection {
    /// Open `sqlite::memory:` or a `sqlite://path?mode=rwc` URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = sqlx::SqliteConnection::connect(url)
            .await
            .map_err(|e| MigrateError::connect(NAME, e))?;

        info!("Opened SQLite database");
        Ok(Self { conn })
    }
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
    }
}

fn build_query<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(sql), bind)
}

/// SQLite values carry their own storage class, so decode by that rather
/// than by the declared column type.
fn decode(row: &SqliteRow, idx: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(idx)?),
        "BLOB" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &'static str {
        "sqlx-sqlite"
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<u64, BoxError> {
        let result = build_query(sql, params).execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<Vec<Row>, BoxError> {
        let rows = build_query(sql, params).fetch_all(&mut self.conn).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = (0..row.len())
                .map(|i| decode(row, i))
                .collect::<std::result::Result<Row, sqlx::Error>>()?;
            out.push(values);
        }
        Ok(out)
    }

    async fn batch(&mut self, sql: &str) -> std::result::Result<(), BoxError> {
        self.conn.execute(sql).await?;
        Ok(())
    }
}
