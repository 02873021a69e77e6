//! SQL Server connection over `tiberius`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{Client, ColumnData, Config, FromSql, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::core::value::{Row, SqlValue};
use crate::drivers::Connection;
use crate::error::{BoxError, MigrateError, Result};

use super::NAME;

/// A single SQL Server session.
pub struct MssqlConnection {
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnection {
    /// Connect using an ADO.NET connection string
    /// (`server=tcp:host,1433;user=sa;password=...;TrustServerCertificate=true`).
    pub async fn connect(url: &str) -> Result<Self> {
        let config = Config::from_ado_string(url).map_err(|e| MigrateError::connect(NAME, e))?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MigrateError::connect(NAME, e))?;
        tcp.set_nodelay(true)
            .map_err(|e| MigrateError::connect(NAME, e))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MigrateError::connect(NAME, e))?;

        info!("Connected to SQL Server");
        Ok(Self { client })
    }
}

fn bind<'a>(query: &mut Query<'a>, value: &SqlValue) {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
    }
}

fn build_query<'a>(sql: &'a str, params: &[SqlValue]) -> Query<'a> {
    let mut query = Query::new(sql);
    for value in params {
        bind(&mut query, value);
    }
    query
}

fn temporal<T, F>(data: &ColumnData<'static>, render: F) -> SqlValue
where
    T: for<'a> FromSql<'a>,
    F: Fn(T) -> String,
{
    match T::from_sql(data) {
        Ok(value) => value.map(render).into(),
        Err(e) => {
            debug!("Could not decode temporal column: {}", e);
            SqlValue::Null
        }
    }
}

fn column_value(data: ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v.map(i64::from).into(),
        ColumnData::I16(v) => v.map(i64::from).into(),
        ColumnData::I32(v) => v.map(i64::from).into(),
        ColumnData::I64(v) => v.into(),
        ColumnData::F32(v) => v.map(f64::from).into(),
        ColumnData::F64(v) => v.into(),
        ColumnData::Bit(v) => v.into(),
        ColumnData::String(v) => v.map(|s| s.into_owned()).into(),
        ColumnData::Binary(v) => v.map(|b| b.into_owned()).into(),
        ColumnData::Guid(v) => v.map(|g| g.to_string()).into(),
        ColumnData::Numeric(v) => v.map(|n| n.to_string()).into(),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            temporal::<NaiveDateTime, _>(&data, |v| v.to_string())
        }
        ColumnData::Date(_) => temporal::<NaiveDate, _>(&data, |v| v.to_string()),
        ColumnData::Time(_) => temporal::<NaiveTime, _>(&data, |v| v.to_string()),
        ColumnData::DateTimeOffset(_) => {
            temporal::<DateTime<FixedOffset>, _>(&data, |v| v.to_rfc3339())
        }
        other => {
            debug!("Unsupported SQL Server column type, returning NULL: {:?}", other);
            SqlValue::Null
        }
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &'static str {
        "tiberius"
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<u64, BoxError> {
        let result = build_query(sql, params).execute(&mut self.client).await?;
        Ok(result.total())
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<Vec<Row>, BoxError> {
        let stream = build_query(sql, params).query(&mut self.client).await?;
        let rows = stream.into_first_result().await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(column_value).collect())
            .collect())
    }

    // Transaction statements must not go through sp_executesql, which
    // rejects a changed @@TRANCOUNT (error 266).
    async fn batch(&mut self, sql: &str) -> std::result::Result<(), BoxError> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}
