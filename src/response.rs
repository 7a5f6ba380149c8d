//! Response marshalling: single records, streamed record arrays, counts, and list shapes.

use crate::behavior::BehaviorRegistry;
use crate::config::ResolvedEntity;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::convert::Infallible;

/// Template consulted for lite and select list display values.
pub const SELECT_LIST_TEMPLATE: &str = "SelectList";

/// What a successful pipeline hands to the transport.
#[derive(Debug)]
pub enum Payload {
    Record(Value),
    Records(Vec<Value>),
    Count(u64),
}

impl Payload {
    /// Result count for logs.
    pub fn len(&self) -> usize {
        match self {
            Payload::Record(_) | Payload::Count(_) => 1,
            Payload::Records(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        match self {
            Payload::Record(r) => send_record(r),
            Payload::Records(r) => stream_records(r),
            Payload::Count(n) => send_count(n),
        }
    }
}

pub fn send_record(record: Value) -> Response {
    (StatusCode::OK, Json(record)).into_response()
}

pub fn send_count(count: u64) -> Response {
    (StatusCode::OK, Json(json!({ "Count": count }))).into_response()
}

/// Stream records as one JSON array, a record per chunk, preserving order.
pub fn stream_records(records: Vec<Value>) -> Response {
    if records.is_empty() {
        return (StatusCode::OK, Json(Value::Array(Vec::new()))).into_response();
    }
    let last = records.len() - 1;
    let chunks = records.into_iter().enumerate().map(move |(i, record)| {
        let mut chunk = String::from(if i == 0 { "[" } else { "," });
        chunk.push_str(&record.to_string());
        if i == last {
            chunk.push(']');
        }
        Ok::<_, Infallible>(chunk)
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(tokio_stream::iter(chunks)),
    )
        .into_response()
}

fn display_value(entity: &ResolvedEntity, behaviors: &BehaviorRegistry, record: &Value) -> Value {
    let fallback = format!("{} #<%= Record.{} %>", entity.scope, entity.default_identifier);
    let data = json!({ "Record": record });
    Value::String(behaviors.process_template(SELECT_LIST_TEMPLATE, &data, Some(&fallback)))
}

fn field(record: &Value, name: &str) -> Value {
    record.get(name).cloned().unwrap_or(Value::Null)
}

/// Lightweight records for drop-downs: display value, identifiers, `UpdateDate`, and every `ID*`/`GUID*` field.
///
/// Which optional fields appear is decided by the first record.
pub fn lite_list(entity: &ResolvedEntity, behaviors: &BehaviorRegistry, records: &[Value]) -> Vec<Value> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let has_update_date = first.get("UpdateDate").is_some();
    let id_fields: Vec<String> = first
        .as_object()
        .map(|m| {
            m.keys()
                .filter(|k| k.starts_with("ID") || k.starts_with("GUID"))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    records
        .iter()
        .map(|record| {
            let mut lite = Map::new();
            lite.insert("Value".into(), display_value(entity, behaviors, record));
            lite.insert(entity.default_identifier.clone(), field(record, &entity.default_identifier));
            if let Some(guid) = entity.guid_identifier.as_deref().filter(|g| !g.is_empty()) {
                lite.insert(guid.to_string(), field(record, guid));
            }
            if has_update_date {
                lite.insert("UpdateDate".into(), field(record, "UpdateDate"));
            }
            for f in &id_fields {
                lite.insert(f.clone(), field(record, f));
            }
            Value::Object(lite)
        })
        .collect()
}

/// `{Hash, Value}` pairs keyed by the default identifier.
pub fn select_list(entity: &ResolvedEntity, behaviors: &BehaviorRegistry, records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            json!({
                "Hash": field(record, &entity.default_identifier),
                "Value": display_value(entity, behaviors, record),
            })
        })
        .collect()
}

/// Each record reduced to the distinct columns, in the order requested.
pub fn distinct_list(columns: &[String], records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let projected: Map<String, Value> = columns
                .iter()
                .map(|c| (c.clone(), field(record, c)))
                .collect();
            Value::Object(projected)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};

    fn entity() -> ResolvedEntity {
        let config = load_from_str(
            r#"{ "scope": "Book", "default_identifier": "IDBook", "guid_identifier": "GUIDBook",
                 "schema": [{ "column": "IDBook", "type": "AutoIdentity" },
                            { "column": "GUIDBook", "type": "AutoGUID" },
                            { "column": "UpdateDate", "type": "UpdateDate" },
                            { "column": "IDAuthor", "type": "Integer" },
                            { "column": "Title", "type": "String" }] }"#,
        )
        .unwrap();
        resolve(&config).unwrap()
    }

    fn books() -> Vec<Value> {
        vec![
            json!({ "IDBook": 1, "GUIDBook": "g-1", "UpdateDate": "2020-01-01", "IDAuthor": 9, "Title": "Dune" }),
            json!({ "IDBook": 2, "GUIDBook": "g-2", "UpdateDate": "2020-01-02", "IDAuthor": 9, "Title": "Emma" }),
        ]
    }

    #[test]
    fn lite_list_keeps_identifiers_and_fallback_value() {
        let lite = lite_list(&entity(), &BehaviorRegistry::new(), &books());
        assert_eq!(
            lite[1],
            json!({ "Value": "Book #2", "IDBook": 2, "GUIDBook": "g-2", "UpdateDate": "2020-01-02", "IDAuthor": 9 })
        );
        assert!(lite[0].get("Title").is_none());
    }

    #[test]
    fn select_list_uses_registered_template() {
        let behaviors = BehaviorRegistry::new();
        behaviors.set_template(SELECT_LIST_TEMPLATE, "<%= Record.Title %> (<%= Record.IDBook %>)");
        let list = select_list(&entity(), &behaviors, &books());
        assert_eq!(list[0], json!({ "Hash": 1, "Value": "Dune (1)" }));
    }

    #[test]
    fn distinct_list_projects_requested_columns() {
        let list = distinct_list(&["IDAuthor".to_string()], &books());
        assert_eq!(list, vec![json!({ "IDAuthor": 9 }), json!({ "IDAuthor": 9 })]);
    }

    #[tokio::test]
    async fn streamed_array_is_valid_json() {
        let response = stream_records(books());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, Value::Array(books()));
    }
}
