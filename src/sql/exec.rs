//! Execute list scopes and turn rows into JSON objects.

use crate::error::DbError;
use crate::response::Meta;
use crate::sql::builder::{ListScope, QueryBuf};
use crate::sql::params::PgBindValue;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};

/// Rows for the scope's page plus paging metadata (total over the unpaginated filter set).
pub async fn fetch_page(pool: &PgPool, scope: &ListScope) -> Result<(Vec<Value>, Meta), DbError> {
    let rows = fetch_all(pool, &scope.select()?).await?;
    let total = fetch_count(pool, &scope.count()?).await?;
    let page = scope.pagination().unwrap_or_default();
    let meta = Meta {
        total_records: total,
        current_offset: page.offset,
        limit: page.limit,
    };
    Ok((rows, meta))
}

pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, DbError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

pub async fn fetch_count(pool: &PgPool, q: &QueryBuf) -> Result<i64, DbError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "count");
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    Ok(query.fetch_one(pool).await?)
}

pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Best-effort decode of one cell: tries the common Postgres types in turn, NULL or unknown -> `null`.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
