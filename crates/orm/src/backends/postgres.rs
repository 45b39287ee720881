//! PostgreSQL Backend Implementation
//!
//! [`PostgresDriver`] implements the driver traits on top of a sqlx `PgPool`.
//! Statements use named `:placeholder`s; they are rewritten to PostgreSQL's
//! positional `$n` parameters right before execution.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::{debug, info, trace};

use super::core::{DatabaseValue, Driver, DriverTransaction, ParamKind, Row};
use crate::binding::{scan_placeholders, Bindings};
use crate::database::DatabaseConfig;
use crate::error::{ModelError, ModelResult};

/// PostgreSQL driver backed by a connection pool
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    pool: PgPool,
}

impl PostgresDriver {
    /// Validate `config` and open a pool
    pub async fn connect(config: &DatabaseConfig) -> ModelResult<Self> {
        let info = config.validate()?;
        debug!(
            "Creating database pool for {}: max={}, min={}, timeout={}s",
            info,
            config.pool().max_connections,
            config.pool().min_connections,
            config.pool().acquire_timeout
        );

        let pool = config
            .pool()
            .pool_options()
            .connect(config.database_url())
            .await
            .map_err(|e| ModelError::Connection(format!("Failed to create database pool: {}", e)))?;

        info!(
            "Database pool created for {} with {} max connections",
            info,
            config.pool().max_connections
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn begin(&self) -> ModelResult<Box<dyn DriverTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ModelError::Transaction(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresTransaction {
            tx: Some(tx),
            sql: String::new(),
            bindings: Bindings::new(),
        }))
    }

    async fn fetch_all(&self, sql: &str, bindings: &Bindings) -> ModelResult<Vec<Row>> {
        let (sql, params) = to_positional(sql, bindings)?;
        let mut query = sqlx::query(&sql);
        for (value, kind) in params {
            query = bind_database_value(query, value, kind);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(postgres_row_to_row).collect()
    }

    /// Highest primary key in `table`.
    ///
    /// Only correct for monotonically increasing keys and when no other
    /// session inserted into the table in between.
    async fn last_inserted_row(&self, table: &str, primary_key: &str) -> ModelResult<Vec<Row>> {
        let sql = format!("SELECT * FROM {} ORDER BY {} DESC LIMIT 1", table, primary_key);
        self.fetch_all(&sql, &Bindings::new()).await
    }
}

/// Transaction on a pooled connection
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    sql: String,
    bindings: Bindings,
}

impl PostgresTransaction {
    fn completed() -> ModelError {
        ModelError::Transaction("Transaction already completed".to_string())
    }
}

#[async_trait]
impl DriverTransaction for PostgresTransaction {
    fn sql(&mut self, statement: &str) {
        self.sql = statement.to_string();
        self.bindings = Bindings::new();
    }

    fn bind_value(&mut self, placeholder: &str, value: DatabaseValue, kind: ParamKind) {
        self.bindings.bind(placeholder, value, kind);
    }

    async fn execute(&mut self) -> ModelResult<u64> {
        let tx = self.tx.as_mut().ok_or_else(Self::completed)?;
        let (sql, params) = to_positional(&self.sql, &self.bindings)?;

        let mut query = sqlx::query(&sql);
        for (value, kind) in params {
            query = bind_database_value(query, value, kind);
        }

        let result = query.execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn commit(mut self: Box<Self>) -> ModelResult<()> {
        let tx = self.tx.take().ok_or_else(Self::completed)?;
        tx.commit()
            .await
            .map_err(|e| ModelError::Transaction(format!("Transaction commit failed: {}", e)))
    }

    async fn rollback(mut self: Box<Self>) -> ModelResult<()> {
        let tx = self.tx.take().ok_or_else(Self::completed)?;
        tx.rollback()
            .await
            .map_err(|e| ModelError::Transaction(format!("Transaction rollback failed: {}", e)))
    }
}

/// Rewrite `:name` placeholders to `$n` and list the bound values in `$n` order.
///
/// A placeholder used twice maps to the same `$n`. Bindings the statement does
/// not mention are ignored.
fn to_positional<'b>(sql: &str, bindings: &'b Bindings) -> ModelResult<(String, Vec<(&'b DatabaseValue, ParamKind)>)> {
    let mut rewritten = String::with_capacity(sql.len());
    let mut order: Vec<&str> = Vec::new();
    let mut params = Vec::new();
    let mut last = 0;

    for (range, name) in scan_placeholders(sql) {
        let position = match order.iter().position(|seen| *seen == name) {
            Some(index) => index + 1,
            None => {
                let entry = bindings
                    .get(name)
                    .ok_or_else(|| ModelError::Query(format!("No value bound for placeholder {}", name)))?;
                order.push(name);
                params.push((&entry.value, entry.kind));
                order.len()
            }
        };
        rewritten.push_str(&sql[last..range.start]);
        rewritten.push_str(&format!("${}", position));
        last = range.end;
    }
    rewritten.push_str(&sql[last..]);

    if params.len() < bindings.len() {
        trace!(
            "{} binding(s) not referenced by statement",
            bindings.len() - params.len()
        );
    }
    Ok((rewritten, params))
}

/// Bind a DatabaseValue to a sqlx query; NULLs are typed by `kind`
fn bind_database_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
    kind: ParamKind,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => match kind {
            ParamKind::Int => query.bind(Option::<i64>::None),
            ParamKind::Bool => query.bind(Option::<bool>::None),
            _ => query.bind(Option::<String>::None),
        },
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Uuid(u) => query.bind(*u),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}

fn postgres_row_to_row(row: &PgRow) -> ModelResult<Row> {
    use sqlx::{Column, Row as _};

    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| Ok((column.name().to_string(), postgres_value_to_database_value(row, index)?)))
        .collect()
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> ModelResult<DatabaseValue> {
    use sqlx::{Column, Row as _, TypeInfo, ValueRef};

    let column = &row.columns()[index];
    let type_name = column.type_info().name();

    if row.try_get_raw(index)?.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let decode_error = |e: sqlx::Error| {
        ModelError::Query(format!(
            "Failed to decode column '{}' of type {}: {}",
            column.name(),
            type_name,
            e
        ))
    };

    let value = match type_name {
        "BOOL" => DatabaseValue::Bool(row.try_get(index).map_err(decode_error)?),
        "INT2" => DatabaseValue::Int32(row.try_get::<i16, _>(index).map_err(decode_error)?.into()),
        "INT4" => DatabaseValue::Int32(row.try_get(index).map_err(decode_error)?),
        "INT8" => DatabaseValue::Int64(row.try_get(index).map_err(decode_error)?),
        "FLOAT4" => DatabaseValue::Float64(row.try_get::<f32, _>(index).map_err(decode_error)?.into()),
        "FLOAT8" => DatabaseValue::Float64(row.try_get(index).map_err(decode_error)?),
        "BYTEA" => DatabaseValue::Bytes(row.try_get(index).map_err(decode_error)?),
        "UUID" => DatabaseValue::Uuid(row.try_get(index).map_err(decode_error)?),
        "TIMESTAMPTZ" => DatabaseValue::DateTime(row.try_get(index).map_err(decode_error)?),
        "TIMESTAMP" => {
            let naive: chrono::NaiveDateTime = row.try_get(index).map_err(decode_error)?;
            DatabaseValue::DateTime(chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc))
        }
        "DATE" => DatabaseValue::Date(row.try_get(index).map_err(decode_error)?),
        "JSON" | "JSONB" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index).map_err(decode_error)?),
        _ => DatabaseValue::String(row.try_get(index).map_err(decode_error)?),
    };
    Ok(value)
}
