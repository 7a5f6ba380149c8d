//! PostgreSQL DAL: one table per entity scope, SQL from [`crate::sql`], rows returned as JSON objects.

use crate::config::ResolvedEntity;
use crate::dal::{Dal, FilterOperator, Query};
use crate::error::DalError;
use crate::sql::{self, bind_all, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

pub struct PgDal {
    pool: PgPool,
    entity: ResolvedEntity,
    schema: Option<String>,
}

impl PgDal {
    pub fn new(pool: PgPool, entity: ResolvedEntity) -> Self {
        PgDal {
            pool,
            entity,
            schema: None,
        }
    }

    /// Qualify the entity table with a PostgreSQL schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, DalError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn query_optional(&self, q: &QueryBuf) -> Result<Option<Value>, DalError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

#[async_trait]
impl Dal for PgDal {
    fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    async fn do_create(&self, query: &Query, record: Map<String, Value>) -> Result<Value, DalError> {
        let q = sql::insert(&self.entity, &record, query.id_user, self.schema());
        self.query_optional(&q)
            .await?
            .ok_or_else(|| DalError::Db(sqlx::Error::RowNotFound))
    }

    async fn do_read(&self, query: &Query) -> Result<Option<Value>, DalError> {
        let mut single = query.clone();
        single.set_cap(Some(1));
        let q = sql::select(&self.entity, &single, self.schema());
        self.query_optional(&q).await
    }

    async fn do_reads(&self, query: &Query) -> Result<Option<Vec<Value>>, DalError> {
        let q = sql::select(&self.entity, query, self.schema());
        Ok(Some(self.query_many(&q).await?))
    }

    async fn do_update(&self, query: &Query, record: Map<String, Value>) -> Result<Option<Value>, DalError> {
        let id = record
            .get(&self.entity.default_identifier)
            .cloned()
            .ok_or_else(|| DalError::Rejected(format!("update requires {}", self.entity.default_identifier)))?;
        let q = sql::update(&self.entity, &id, &record, query.id_user, self.schema());
        if q.sql.is_empty() {
            return Err(DalError::Rejected("entity has no identifier column".into()));
        }
        self.query_optional(&q).await
    }

    async fn do_delete(&self, query: &Query) -> Result<u64, DalError> {
        // an unfiltered delete would wipe the table
        if !query
            .filters
            .iter()
            .any(|f| {
                !matches!(f.operator, FilterOperator::OpenParen | FilterOperator::CloseParen)
                    && self.entity.has_column(&f.field)
            })
        {
            return Err(DalError::Rejected("delete requires a filter".into()));
        }
        let q = sql::delete(&self.entity, query, self.schema());
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn do_count(&self, query: &Query) -> Result<u64, DalError> {
        let q = sql::count(&self.entity, query, self.schema());
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        use sqlx::Row;
        let n: i64 = row.try_get("Count")?;
        Ok(n.max(0) as u64)
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
