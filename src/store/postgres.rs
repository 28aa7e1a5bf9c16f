//! PostgreSQL store: one table per entity in the configured schema.

use super::{format_timestamp, Row, Store};
use crate::config::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::error::StorageError;
use crate::migration::foreign_key_name;
use crate::query::{ListQuery, Predicate};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres};
use std::str::FromStr;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Vec<Row>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(&q.sql, &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(entity, &q.params, e))?;
        rows.iter().map(|r| decode_row(entity, r)).collect()
    }

    async fn fetch_optional(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Option<Row>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(&q.sql, &q.params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(entity, &q.params, e))?;
        row.map(|r| decode_row(entity, &r)).transpose()
    }
}

fn bind_all<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |q, p| q.bind(PgBindValue::from_json(p)))
}

/// Turn constraint failures into typed errors; anything else stays a database error.
fn classify(entity: &ResolvedEntity, params: &[Value], e: sqlx::Error) -> StorageError {
    let info = match &e {
        sqlx::Error::Database(db) => Some((
            db.code().map(|c| c.to_string()).unwrap_or_default(),
            db.constraint().unwrap_or_default().to_string(),
            db.message().to_string(),
        )),
        _ => None,
    };
    let Some((code, constraint, message)) = info else {
        return StorageError::Db(e);
    };
    if code == FOREIGN_KEY_VIOLATION {
        if let Some((column, target)) = entity
            .references()
            .find(|(col, _)| foreign_key_name(entity, col) == constraint)
        {
            return StorageError::ForeignKeyViolation {
                table: entity.table_name.clone(),
                column: column.to_string(),
                target: target.to_string(),
                value: message.clone(),
            };
        }
    }
    if code == UNIQUE_VIOLATION {
        tracing::warn!(constraint = %constraint, params = ?params, "unique violation");
        return StorageError::UniqueViolation {
            table: entity.table_name.clone(),
            column: constraint,
            value: message.clone(),
        };
    }
    StorageError::Db(e)
}

fn decode_row(entity: &ResolvedEntity, row: &PgRow) -> Result<Row, StorageError> {
    let mut out = Row::new();
    for c in entity.visible_columns() {
        out.insert(c.name.clone(), decode_cell(row, c)?);
    }
    Ok(out)
}

/// Decode by the catalog type rather than probing the driver type.
fn decode_cell(row: &PgRow, c: &ColumnInfo) -> Result<Value, sqlx::Error> {
    use sqlx::Row as _;
    let name = c.name.as_str();
    let v = match c.kind {
        ColumnType::Uuid => row
            .try_get::<Option<Uuid>, _>(name)?
            .map(|u| Value::String(u.to_string())),
        ColumnType::Text { .. } | ColumnType::Money => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        ColumnType::Integer => row
            .try_get::<Option<i32>, _>(name)?
            .map(|n| Value::Number(n.into())),
        ColumnType::BigSerial => row
            .try_get::<Option<i64>, _>(name)?
            .map(|n| Value::Number(n.into())),
        ColumnType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        ColumnType::Timestamp => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)?
            .map(|d| Value::String(format_timestamp(d))),
    };
    Ok(v.unwrap_or(Value::Null))
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Row>, StorageError> {
        self.fetch_all(entity, &sql::select_list(entity, query)).await
    }

    async fn count(&self, entity: &ResolvedEntity, predicates: &[Predicate]) -> Result<u64, StorageError> {
        let q = sql::count(entity, predicates);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = q
            .params
            .iter()
            .fold(sqlx::query_scalar::<Postgres, i64>(&q.sql), |s, p| s.bind(PgBindValue::from_json(p)))
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn find(&self, entity: &ResolvedEntity, key: Uuid, active_only: bool) -> Result<Option<Row>, StorageError> {
        self.fetch_optional(entity, &sql::select_by_key(entity, key, active_only))
            .await
    }

    async fn find_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Row>, StorageError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_all(entity, &sql::select_by_column_in(entity, column, values))
            .await
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Row) -> Result<Row, StorageError> {
        self.fetch_optional(entity, &sql::insert(entity, values))
            .await?
            .ok_or(StorageError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, entity: &ResolvedEntity, key: Uuid, values: &Row) -> Result<Option<Row>, StorageError> {
        self.fetch_optional(entity, &sql::update(entity, key, values)).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StorageError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// (`postgres` admin URL, database name) from a connection URL.
fn split_database_url(url: &str) -> Result<(String, String), StorageError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StorageError::Db(sqlx::Error::Configuration("DATABASE_URL: no path".into())))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match parts.next() {
        Some(query) => format!("{}postgres?{}", base, query),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name))
}
