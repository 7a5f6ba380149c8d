//! In-memory DAL: insertion-ordered rows behind a lock. Backs tests and the demo consumer.
//!
//! Filters are folded left to right; parentheses group, but AND does not bind tighter than OR.

use crate::config::{ColumnType, ResolvedEntity};
use crate::dal::query::{Connector, Filter, FilterOperator, Query, SortDirection};
use crate::dal::Dal;
use crate::error::DalError;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::RwLock;

pub struct MemoryDal {
    entity: ResolvedEntity,
    rows: RwLock<Vec<Map<String, Value>>>,
    next_id: AtomicI64,
}

impl MemoryDal {
    pub fn new(entity: ResolvedEntity) -> Self {
        MemoryDal {
            entity,
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert records as if created by `id_user`, in order.
    pub fn seed(&self, records: Vec<Value>, id_user: i64) -> Result<(), DalError> {
        for record in records {
            let Value::Object(map) = record else {
                return Err(DalError::Rejected("seed records must be objects".into()));
            };
            let row = self.stamp_new(map, id_user);
            self.write()?.push(row);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Map<String, Value>>>, DalError> {
        self.rows
            .write()
            .map_err(|_| DalError::Storage("record store lock poisoned".into()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Map<String, Value>>>, DalError> {
        self.rows
            .read()
            .map_err(|_| DalError::Storage("record store lock poisoned".into()))
    }

    fn stamp_new(&self, record: Map<String, Value>, id_user: i64) -> Map<String, Value> {
        let now = Value::String(chrono::Utc::now().to_rfc3339());
        let mut row = Map::new();
        for c in &self.entity.columns {
            let supplied = record.get(&c.name).cloned();
            let value = match c.column_type {
                ColumnType::AutoIdentity => match supplied.as_ref().and_then(Value::as_i64) {
                    Some(id) if id > 0 => {
                        self.next_id.fetch_max(id + 1, AtomicOrdering::SeqCst);
                        Value::from(id)
                    }
                    _ => Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst)),
                },
                ColumnType::AutoGuid => match supplied {
                    Some(Value::String(s)) if !s.is_empty() && s != "0x0000000000000000" => Value::String(s),
                    _ => Value::String(uuid::Uuid::new_v4().to_string()),
                },
                ColumnType::CreateDate | ColumnType::UpdateDate => now.clone(),
                ColumnType::CreateIdUser | ColumnType::UpdateIdUser => Value::from(id_user),
                ColumnType::Deleted => Value::Bool(false),
                ColumnType::DeleteDate => Value::Null,
                ColumnType::DeleteIdUser => Value::from(0),
                _ => supplied
                    .or_else(|| self.entity.default_object.get(&c.name).cloned())
                    .unwrap_or(Value::Null),
            };
            row.insert(c.name.clone(), value);
        }
        row
    }

    fn is_live(&self, row: &Map<String, Value>) -> bool {
        match self.entity.column_of_type(ColumnType::Deleted) {
            Some(col) => !truthy(row.get(col)),
            None => true,
        }
    }

    fn select(&self, query: &Query) -> Result<Vec<Value>, DalError> {
        let rows = self.read()?;
        let mut matched: Vec<&Map<String, Value>> = rows
            .iter()
            .filter(|r| self.is_live(r) && matches(r, &query.filters))
            .collect();

        for sort in query.sort.iter().rev() {
            matched.sort_by(|a, b| {
                let ord = compare(a.get(&sort.column), b.get(&sort.column)).unwrap_or(Ordering::Equal);
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let mut projected: Vec<Value> = matched
            .into_iter()
            .map(|r| {
                if query.data_elements.is_empty() {
                    Value::Object(r.clone())
                } else {
                    let mut m = Map::new();
                    for col in &query.data_elements {
                        m.insert(col.clone(), r.get(col).cloned().unwrap_or(Value::Null));
                    }
                    Value::Object(m)
                }
            })
            .collect();

        if query.distinct {
            let mut seen: Vec<Value> = Vec::new();
            projected.retain(|v| {
                if seen.contains(v) {
                    false
                } else {
                    seen.push(v.clone());
                    true
                }
            });
        }

        let begin = query.begin.unwrap_or(0) as usize;
        let cap = query.cap.map(|c| c as usize).unwrap_or(usize::MAX);
        Ok(projected.into_iter().skip(begin).take(cap).collect())
    }
}

#[async_trait]
impl Dal for MemoryDal {
    fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    async fn do_create(&self, query: &Query, record: Map<String, Value>) -> Result<Value, DalError> {
        let row = self.stamp_new(record, query.id_user);
        self.write()?.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn do_read(&self, query: &Query) -> Result<Option<Value>, DalError> {
        let mut single = query.clone();
        single.set_cap(Some(1));
        Ok(self.select(&single)?.into_iter().next())
    }

    async fn do_reads(&self, query: &Query) -> Result<Option<Vec<Value>>, DalError> {
        Ok(Some(self.select(query)?))
    }

    async fn do_update(&self, query: &Query, record: Map<String, Value>) -> Result<Option<Value>, DalError> {
        let id_col = self.entity.default_identifier.clone();
        let id = record
            .get(&id_col)
            .cloned()
            .ok_or_else(|| DalError::Rejected(format!("update requires {}", id_col)))?;
        let now = Value::String(chrono::Utc::now().to_rfc3339());
        let mut rows = self.write()?;
        let live: Vec<bool> = rows.iter().map(|r| self.is_live(r)).collect();
        let Some(row) = rows
            .iter_mut()
            .zip(live)
            .find(|(r, live)| *live && values_eq(r.get(&id_col), Some(&id)))
            .map(|(r, _)| r)
        else {
            return Ok(None);
        };
        for c in &self.entity.columns {
            match c.column_type {
                ColumnType::UpdateDate => {
                    row.insert(c.name.clone(), now.clone());
                }
                ColumnType::UpdateIdUser => {
                    row.insert(c.name.clone(), Value::from(query.id_user));
                }
                t if t.is_managed() || t == ColumnType::AutoGuid => {}
                _ => {
                    if let Some(v) = record.get(&c.name) {
                        row.insert(c.name.clone(), v.clone());
                    }
                }
            }
        }
        Ok(Some(Value::Object(row.clone())))
    }

    async fn do_delete(&self, query: &Query) -> Result<u64, DalError> {
        let deleted_col = self.entity.column_of_type(ColumnType::Deleted).map(str::to_string);
        let delete_date = self.entity.column_of_type(ColumnType::DeleteDate).map(str::to_string);
        let delete_user = self.entity.column_of_type(ColumnType::DeleteIdUser).map(str::to_string);
        let mut rows = self.write()?;
        let mut count = 0u64;
        match deleted_col {
            Some(flag) => {
                for row in rows.iter_mut() {
                    if truthy(row.get(&flag)) || !matches(row, &query.filters) {
                        continue;
                    }
                    row.insert(flag.clone(), Value::Bool(true));
                    if let Some(col) = &delete_date {
                        row.insert(col.clone(), Value::String(chrono::Utc::now().to_rfc3339()));
                    }
                    if let Some(col) = &delete_user {
                        row.insert(col.clone(), Value::from(query.id_user));
                    }
                    count += 1;
                }
            }
            None => {
                let before = rows.len();
                rows.retain(|r| !matches(r, &query.filters));
                count = (before - rows.len()) as u64;
            }
        }
        Ok(count)
    }

    async fn do_count(&self, query: &Query) -> Result<u64, DalError> {
        let mut unpaged = query.clone();
        unpaged.set_begin(None).set_cap(None);
        Ok(self.select(&unpaged)?.len() as u64)
    }
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Loose comparison: numbers and numeric strings compare numerically, everything else as text.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(text(a).cmp(&text(b))),
        },
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

fn like(value: Option<&Value>, pattern: &Value) -> bool {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return false;
    };
    let pattern = regex::escape(&text(pattern)).replace('%', ".*").replace('_', ".");
    Regex::new(&format!("(?is)^{}$", pattern))
        .map(|re| re.is_match(&text(value)))
        .unwrap_or(false)
}

fn predicate(row: &Map<String, Value>, f: &Filter) -> bool {
    let field = row.get(&f.field);
    match f.operator {
        FilterOperator::Eq => values_eq(field, Some(&f.value)),
        FilterOperator::Ne => !values_eq(field, Some(&f.value)),
        FilterOperator::Gt => compare(field, Some(&f.value)) == Some(Ordering::Greater),
        FilterOperator::Ge => matches!(compare(field, Some(&f.value)), Some(Ordering::Greater | Ordering::Equal)),
        FilterOperator::Lt => compare(field, Some(&f.value)) == Some(Ordering::Less),
        FilterOperator::Le => matches!(compare(field, Some(&f.value)), Some(Ordering::Less | Ordering::Equal)),
        FilterOperator::Like => like(field, &f.value),
        FilterOperator::NotLike => !like(field, &f.value),
        FilterOperator::In | FilterOperator::NotIn => {
            let found = match &f.value {
                Value::Array(items) => items.iter().any(|v| values_eq(field, Some(v))),
                single => values_eq(field, Some(single)),
            };
            (f.operator == FilterOperator::In) == found
        }
        FilterOperator::IsNull => field.map(Value::is_null).unwrap_or(true),
        FilterOperator::IsNotNull => field.map(|v| !v.is_null()).unwrap_or(false),
        FilterOperator::OpenParen | FilterOperator::CloseParen => true,
    }
}

fn fold(slot: &mut (Option<bool>, Connector), value: bool, connector: Connector) {
    slot.0 = Some(match slot.0 {
        None => value,
        Some(acc) => match connector {
            Connector::And => acc && value,
            Connector::Or => acc || value,
        },
    });
}

fn matches(row: &Map<String, Value>, filters: &[Filter]) -> bool {
    let mut stack: Vec<(Option<bool>, Connector)> = vec![(None, Connector::And)];
    for f in filters {
        match f.operator {
            FilterOperator::OpenParen => stack.push((None, f.connector)),
            FilterOperator::CloseParen => {
                if stack.len() > 1 {
                    if let Some((group, connector)) = stack.pop() {
                        if let Some(outer) = stack.last_mut() {
                            fold(outer, group.unwrap_or(true), connector);
                        }
                    }
                }
            }
            _ => {
                let value = predicate(row, f);
                if let Some(top) = stack.last_mut() {
                    fold(top, value, f.connector);
                }
            }
        }
    }
    while stack.len() > 1 {
        if let Some((group, connector)) = stack.pop() {
            if let Some(outer) = stack.last_mut() {
                fold(outer, group.unwrap_or(true), connector);
            }
        }
    }
    stack.first().and_then(|s| s.0).unwrap_or(true)
}
