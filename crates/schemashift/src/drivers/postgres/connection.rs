//! PostgreSQL connection over `tokio-postgres`.

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{info, warn};

use crate::core::value::{Row, SqlValue};
use crate::drivers::Connection;
use crate::error::{BoxError, MigrateError, Result};

use super::NAME;

/// A single PostgreSQL session.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    /// Connect using a libpq-style key/value string or a `postgres://` URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| MigrateError::connect(NAME, e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection closed with error: {}", e);
            }
        });

        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| MigrateError::connect(NAME, e))?;

        info!("Connected to PostgreSQL");
        Ok(Self { client })
    }
}

/// Binds a [`SqlValue`] to whatever type the server inferred for the
/// placeholder, narrowing integers and floats as needed.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Text(v) => v.as_str().to_sql(ty, out),
            SqlValue::Bytes(v) => v.as_slice().to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decode(row: &tokio_postgres::Row, idx: usize) -> std::result::Result<SqlValue, BoxError> {
    let ty = row.columns()[idx].type_().clone();
    let value: SqlValue = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(i64::from).into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| v.to_string())
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| v.to_rfc3339())
            .into(),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| v.to_string())
            .into(),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| v.to_string())
            .into(),
        _ => row.try_get::<_, Option<String>>(idx)?.into(),
    };
    Ok(value)
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &'static str {
        "tokio-postgres"
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<u64, BoxError> {
        let wrapped: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = wrapped.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(self.client.execute(sql, &refs).await?)
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<Vec<Row>, BoxError> {
        if params.is_empty() {
            // Simple protocol: every value arrives as text.
            let messages = self.client.simple_query(sql).await?;
            let rows = messages
                .into_iter()
                .filter_map(|m| match m {
                    SimpleQueryMessage::Row(row) => Some(row),
                    _ => None,
                })
                .map(|row| {
                    (0..row.len())
                        .map(|i| SqlValue::from(row.get(i).map(str::to_string)))
                        .collect()
                })
                .collect();
            return Ok(rows);
        }

        let wrapped: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = wrapped.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self.client.query(sql, &refs).await?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| decode(row, i))
                    .collect::<std::result::Result<Row, BoxError>>()
            })
            .collect()
    }

    async fn batch(&mut self, sql: &str) -> std::result::Result<(), BoxError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }
}
