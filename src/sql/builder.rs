//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE from a resolved entity and a [`Query`].

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::dal::{FilterOperator, Query, SortDirection};
use crate::sql::params::pg_type;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table named after the entity scope, optionally schema-qualified.
fn qualified_table(entity: &ResolvedEntity, schema: Option<&str>) -> String {
    match schema {
        Some(s) => format!("{}.{}", quoted(s), quoted(&entity.scope)),
        None => quoted(&entity.scope),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a parameter and return its cast placeholder.
    fn placeholder(&mut self, v: Value, column: &ColumnInfo) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), pg_type(column.column_type))
    }
}

fn column<'a>(entity: &'a ResolvedEntity, name: &str) -> Option<&'a ColumnInfo> {
    entity.columns.iter().find(|c| c.name == name)
}

/// Select expression for a column; numerics come back as float8 so they decode without a decimal crate.
fn select_expr(c: &ColumnInfo) -> String {
    match c.column_type {
        ColumnType::Numeric | ColumnType::Decimal => format!("{}::float8 AS {}", quoted(&c.name), quoted(&c.name)),
        _ => quoted(&c.name),
    }
}

fn column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(select_expr)
        .collect::<Vec<_>>()
        .join(", ")
}

/// WHERE body from the query filters plus the soft-delete guard. Unknown columns are skipped.
fn where_clause(entity: &ResolvedEntity, query: &Query, q: &mut QueryBuf) -> String {
    let mut sql = String::new();
    // true at the start and right after an opening parenthesis
    let mut at_group_start = true;
    let mut depth = 0usize;
    for f in &query.filters {
        let connector = if at_group_start {
            String::new()
        } else {
            format!(" {} ", f.connector.as_sql())
        };
        match f.operator {
            FilterOperator::OpenParen => {
                sql.push_str(&connector);
                sql.push('(');
                depth += 1;
                at_group_start = true;
            }
            FilterOperator::CloseParen => {
                if depth == 0 {
                    continue;
                }
                if at_group_start {
                    sql.push_str("1 = 1");
                }
                sql.push(')');
                depth -= 1;
                at_group_start = false;
            }
            op => {
                let Some(col) = column(entity, &f.field) else { continue };
                let lhs = quoted(&col.name);
                let predicate = match op {
                    FilterOperator::IsNull | FilterOperator::IsNotNull => format!("{} {}", lhs, op.as_sql()),
                    FilterOperator::In | FilterOperator::NotIn => {
                        let items = match &f.value {
                            Value::Array(items) => items.clone(),
                            single => vec![single.clone()],
                        };
                        if items.is_empty() {
                            if op == FilterOperator::In { String::from("1 = 0") } else { String::from("1 = 1") }
                        } else {
                            let phs: Vec<String> = items.into_iter().map(|v| q.placeholder(v, col)).collect();
                            format!("{} {} ({})", lhs, op.as_sql(), phs.join(", "))
                        }
                    }
                    FilterOperator::Like | FilterOperator::NotLike => {
                        q.params.push(f.value.clone());
                        format!("{}::text {} ${}", lhs, op.as_sql(), q.params.len())
                    }
                    _ => {
                        let ph = q.placeholder(f.value.clone(), col);
                        format!("{} {} {}", lhs, op.as_sql(), ph)
                    }
                };
                sql.push_str(&connector);
                sql.push_str(&predicate);
                at_group_start = false;
            }
        }
    }
    if at_group_start && depth > 0 {
        sql.push_str("1 = 1");
    }
    for _ in 0..depth {
        sql.push(')');
    }

    let deleted = entity
        .column_of_type(ColumnType::Deleted)
        .map(|c| format!("{} = false", quoted(c)));
    match (sql.is_empty(), deleted) {
        (true, None) => String::new(),
        (true, Some(d)) => format!(" WHERE {}", d),
        (false, None) => format!(" WHERE {}", sql),
        (false, Some(d)) => format!(" WHERE ({}) AND {}", sql, d),
    }
}

fn paging(query: &Query) -> String {
    let mut out = String::new();
    if let Some(cap) = query.cap {
        out.push_str(&format!(" LIMIT {}", cap));
    }
    if let Some(begin) = query.begin {
        out.push_str(&format!(" OFFSET {}", begin));
    }
    out
}

/// SELECT with filters, sorts (default: identifier order), optional DISTINCT projection and paging.
pub fn select(entity: &ResolvedEntity, query: &Query, schema: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity, schema);
    let projected: Vec<&str> = query
        .data_elements
        .iter()
        .map(String::as_str)
        .filter(|c| entity.has_column(c))
        .collect();
    let cols = if projected.is_empty() {
        column_list(entity)
    } else {
        projected
            .iter()
            .filter_map(|c| column(entity, c))
            .map(select_expr)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let where_sql = where_clause(entity, query, &mut q);

    let mut order: Vec<String> = query
        .sort
        .iter()
        .filter(|s| entity.has_column(&s.column))
        .filter(|s| !query.distinct || projected.is_empty() || projected.contains(&s.column.as_str()))
        .map(|s| {
            let dir = match s.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!("{} {}", quoted(&s.column), dir)
        })
        .collect();
    if order.is_empty() {
        if query.distinct && !projected.is_empty() {
            order = projected.iter().map(|c| quoted(c)).collect();
        } else {
            order.push(quoted(&entity.default_identifier));
        }
    }

    q.sql = format!(
        "SELECT {}{} FROM {}{} ORDER BY {}{}",
        if query.distinct { "DISTINCT " } else { "" },
        cols,
        table,
        where_sql,
        order.join(", "),
        paging(query)
    );
    q
}

/// COUNT of rows matching the query filters.
pub fn count(entity: &ResolvedEntity, query: &Query, schema: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity, schema);
    let where_sql = where_clause(entity, query, &mut q);
    q.sql = format!("SELECT COUNT(*) AS \"Count\" FROM {}{}", table, where_sql);
    q
}

/// INSERT stamping audit columns; identity comes from the database.
pub fn insert(entity: &ResolvedEntity, record: &Map<String, Value>, id_user: i64, schema: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity, schema);
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for c in &entity.columns {
        let value = match c.column_type {
            ColumnType::AutoIdentity | ColumnType::DeleteDate => continue,
            ColumnType::AutoGuid => match record.get(&c.name) {
                Some(Value::String(s)) if !s.is_empty() => q.placeholder(Value::String(s.clone()), c),
                _ => q.placeholder(Value::String(uuid::Uuid::new_v4().to_string()), c),
            },
            ColumnType::CreateDate | ColumnType::UpdateDate => "NOW()".to_string(),
            ColumnType::CreateIdUser | ColumnType::UpdateIdUser => q.placeholder(Value::from(id_user), c),
            ColumnType::Deleted => "false".to_string(),
            ColumnType::DeleteIdUser => "0".to_string(),
            _ => match record.get(&c.name).or_else(|| entity.default_object.get(&c.name)) {
                Some(v) => q.placeholder(v.clone(), c),
                None => continue,
            },
        };
        cols.push(quoted(&c.name));
        values.push(value);
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        values.join(", "),
        column_list(entity)
    );
    q
}

/// UPDATE by identifier: SET only writable columns present in the record, then stamp the update audit columns.
pub fn update(
    entity: &ResolvedEntity,
    id: &Value,
    record: &Map<String, Value>,
    id_user: i64,
    schema: Option<&str>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity, schema);
    let mut sets = Vec::new();
    for c in &entity.columns {
        match c.column_type {
            ColumnType::UpdateDate => sets.push(format!("{} = NOW()", quoted(&c.name))),
            ColumnType::UpdateIdUser => {
                let ph = q.placeholder(Value::from(id_user), c);
                sets.push(format!("{} = {}", quoted(&c.name), ph));
            }
            t if t.is_managed() || t == ColumnType::AutoGuid => {}
            _ => {
                if let Some(v) = record.get(&c.name) {
                    let ph = q.placeholder(v.clone(), c);
                    sets.push(format!("{} = {}", quoted(&c.name), ph));
                }
            }
        }
    }
    let Some(id_col) = column(entity, &entity.default_identifier) else {
        return q;
    };
    let id_ph = q.placeholder(id.clone(), id_col);
    if sets.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            column_list(entity),
            table,
            quoted(&id_col.name),
            id_ph
        );
        return q;
    }
    let deleted = entity
        .column_of_type(ColumnType::Deleted)
        .map(|c| format!(" AND {} = false", quoted(c)))
        .unwrap_or_default();
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}{} RETURNING {}",
        table,
        sets.join(", "),
        quoted(&id_col.name),
        id_ph,
        deleted,
        column_list(entity)
    );
    q
}

/// DELETE rows matching the query; soft delete when the entity has a Deleted column.
pub fn delete(entity: &ResolvedEntity, query: &Query, schema: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity, schema);
    let Some(flag) = entity.column_of_type(ColumnType::Deleted) else {
        let where_sql = where_clause(entity, query, &mut q);
        q.sql = format!("DELETE FROM {}{}", table, where_sql);
        return q;
    };
    let mut sets = vec![format!("{} = true", quoted(flag))];
    if let Some(c) = entity.column_of_type(ColumnType::DeleteDate) {
        sets.push(format!("{} = NOW()", quoted(c)));
    }
    if let Some(c) = entity.columns.iter().find(|c| c.column_type == ColumnType::DeleteIdUser) {
        let ph = q.placeholder(Value::from(query.id_user), c);
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    let where_sql = where_clause(entity, query, &mut q);
    q.sql = format!("UPDATE {} SET {}{}", table, sets.join(", "), where_sql);
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};
    use crate::dal::{parse_filter, Connector};
    use serde_json::json;

    fn entity() -> ResolvedEntity {
        let config = load_from_str(
            r#"{
                "scope": "Book",
                "default_identifier": "IDBook",
                "schema": [
                    { "column": "IDBook", "type": "AutoIdentity" },
                    { "column": "UpdateDate", "type": "UpdateDate" },
                    { "column": "Deleted", "type": "Deleted" },
                    { "column": "Title", "type": "String" },
                    { "column": "PublicationYear", "type": "Integer" }
                ]
            }"#,
        )
        .unwrap();
        resolve(&config).unwrap()
    }

    #[test]
    fn select_with_filters_and_paging() {
        let e = entity();
        let mut query = Query::new();
        parse_filter("FBV~Title~LK~%Dune%~FBVOR~PublicationYear~GT~1960", &mut query).unwrap();
        query.set_begin(Some(10)).set_cap(Some(5));
        let q = select(&e, &query, Some("library"));
        assert_eq!(
            q.sql,
            "SELECT \"IDBook\", \"UpdateDate\", \"Deleted\", \"Title\", \"PublicationYear\" FROM \"library\".\"Book\" \
             WHERE (\"Title\"::text LIKE $1 OR \"PublicationYear\" > $2::bigint) AND \"Deleted\" = false \
             ORDER BY \"IDBook\" LIMIT 5 OFFSET 10"
        );
        assert_eq!(q.params, vec![json!("%Dune%"), json!("1960")]);
    }

    #[test]
    fn unknown_columns_are_skipped() {
        let e = entity();
        let mut query = Query::new();
        query.add_filter("Nope; DROP TABLE", json!(1), FilterOperator::Eq, Connector::And, "x");
        let q = select(&e, &query, None);
        assert!(!q.sql.contains("DROP"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn distinct_orders_by_projection() {
        let e = entity();
        let mut query = Query::new();
        query.set_distinct(true).set_data_elements(vec!["Title".into()]);
        let q = select(&e, &query, None);
        assert!(q.sql.starts_with("SELECT DISTINCT \"Title\" FROM \"Book\""));
        assert!(q.sql.ends_with("ORDER BY \"Title\""));
    }

    #[test]
    fn in_list_expands_placeholders() {
        let e = entity();
        let mut query = Query::new();
        parse_filter("FBL~IDBook~IN~1,2,3", &mut query).unwrap();
        let q = count(&e, &query, None);
        assert!(q.sql.contains("\"IDBook\" IN ($1::bigint, $2::bigint, $3::bigint)"));
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn delete_is_soft_when_flag_exists() {
        let e = entity();
        let mut query = Query::new();
        query.add_filter("IDBook", json!(4), FilterOperator::Eq, Connector::And, "IDBook");
        let q = delete(&e, &query, None);
        assert!(q.sql.starts_with("UPDATE \"Book\" SET \"Deleted\" = true"));
    }

    #[test]
    fn update_skips_managed_columns() {
        let e = entity();
        let record = json!({ "IDBook": 4, "Title": "Emma", "Deleted": true });
        let q = update(&e, &json!(4), record.as_object().unwrap(), 2, None);
        assert!(q.sql.contains("\"UpdateDate\" = NOW()"));
        assert!(q.sql.contains("\"Title\" = $1::text"));
        assert!(!q.sql.contains("\"Deleted\" = $"));
    }
}
