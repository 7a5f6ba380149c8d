//! Bind serde_json values to PostgreSQL queries; placeholders carry a cast to the column type.

use crate::config::ColumnType;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query as SqlxQuery;

/// PostgreSQL type used to cast a bound parameter for a column.
pub fn pg_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::AutoIdentity
        | ColumnType::CreateIdUser
        | ColumnType::UpdateIdUser
        | ColumnType::DeleteIdUser
        | ColumnType::Integer => "bigint",
        ColumnType::Numeric | ColumnType::Decimal => "numeric",
        ColumnType::Deleted | ColumnType::Boolean => "boolean",
        ColumnType::CreateDate | ColumnType::UpdateDate | ColumnType::DeleteDate | ColumnType::DateTime => {
            "timestamptz"
        }
        ColumnType::AutoGuid | ColumnType::String | ColumnType::Text => "text",
    }
}

/// Bind one JSON value with the Rust type matching its JSON kind. Strings rely on the SQL cast.
pub fn bind_value<'q>(query: SqlxQuery<'q, Postgres, PgArguments>, v: &Value) -> SqlxQuery<'q, Postgres, PgArguments> {
    match v {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(v.clone()),
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: SqlxQuery<'q, Postgres, PgArguments>,
    params: &[Value],
) -> SqlxQuery<'q, Postgres, PgArguments> {
    for p in params {
        query = bind_value(query, p);
    }
    query
}
