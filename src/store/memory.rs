//! In-process store with the same observable behavior as the PostgreSQL one: server-assigned keys
//! and timestamps, column defaults, foreign keys, insertion ordering. Used by tests and `INVENTORY_STORE=memory`.

use super::{format_timestamp, Row, Store};
use crate::config::{ColumnDefault, ColumnType, ResolvedEntity, OBJECT_ID_COLUMN};
use crate::error::StorageError;
use crate::query::{CompareOp, ListQuery, Predicate};
use crate::service::validation::parse_money;
use crate::status::STATUS_COLUMN;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

const UPDATED_ON: &str = "updated_on";

#[derive(Default)]
struct Table {
    next_id: i64,
    /// (internal id, row), ascending by id.
    rows: Vec<(i64, Row)>,
}

impl Table {
    fn by_key(&self, key: &str) -> Option<&Row> {
        self.rows.iter().map(|(_, r)| r).find(|r| r.get(OBJECT_ID_COLUMN).and_then(Value::as_str) == Some(key))
    }
}

/// Tables keyed by entity id.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_active(entity: &ResolvedEntity, row: &Row) -> bool {
    row.get(STATUS_COLUMN).and_then(Value::as_str) != Some(entity.status.inactive())
}

fn parse_time(v: &Value) -> Option<DateTime<Utc>> {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Typed comparison of a stored value with a predicate operand.
fn compare(kind: ColumnType, cell: &Value, operand: &Value) -> Option<Ordering> {
    match kind {
        ColumnType::Money => parse_money(cell)?.partial_cmp(&parse_money(operand)?),
        ColumnType::Timestamp => parse_time(cell)?.partial_cmp(&parse_time(operand)?),
        ColumnType::Integer | ColumnType::BigSerial => cell.as_i64()?.partial_cmp(&operand.as_i64()?),
        ColumnType::Boolean => cell.as_bool()?.partial_cmp(&operand.as_bool()?),
        ColumnType::Text { .. } | ColumnType::Uuid => cell.as_str()?.partial_cmp(operand.as_str()?),
    }
}

/// SQL semantics: a comparison against a NULL cell never holds; `eq null`/`ne null` test for NULL.
fn matches(entity: &ResolvedEntity, row: &Row, p: &Predicate) -> bool {
    let Some(c) = entity.column(&p.column) else { return true };
    let cell = row.get(&c.name).unwrap_or(&Value::Null);
    if p.value.is_null() {
        return (p.op == CompareOp::Eq) == cell.is_null();
    }
    if cell.is_null() {
        return false;
    }
    compare(c.kind, cell, &p.value).map_or(false, |o| p.op.holds(o))
}

/// Every non-null reference in `values` must name an existing row of the target entity (any status).
fn check_references(
    tables: &HashMap<String, Table>,
    entity: &ResolvedEntity,
    values: &Row,
) -> Result<(), StorageError> {
    for (column, target) in entity.references() {
        let Some(key) = values.get(column).and_then(Value::as_str) else { continue };
        let found = tables.get(target).and_then(|t| t.by_key(key)).is_some();
        if !found {
            return Err(StorageError::ForeignKeyViolation {
                table: entity.table_name.clone(),
                column: column.to_string(),
                target: target.to_string(),
                value: key.to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        let Some(table) = tables.get(&entity.id) else { return Ok(Vec::new()) };
        Ok(table
            .rows
            .iter()
            .map(|(_, r)| r)
            .filter(|r| is_active(entity, r) && query.predicates.iter().all(|p| matches(entity, r, p)))
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, entity: &ResolvedEntity, predicates: &[Predicate]) -> Result<u64, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        let Some(table) = tables.get(&entity.id) else { return Ok(0) };
        Ok(table
            .rows
            .iter()
            .filter(|(_, r)| is_active(entity, r) && predicates.iter().all(|p| matches(entity, r, p)))
            .count() as u64)
    }

    async fn find(&self, entity: &ResolvedEntity, key: Uuid, active_only: bool) -> Result<Option<Row>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        Ok(tables
            .get(&entity.id)
            .and_then(|t| t.by_key(&key.to_string()))
            .filter(|r| !active_only || is_active(entity, r))
            .cloned())
    }

    async fn find_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        let Some(table) = tables.get(&entity.id) else { return Ok(Vec::new()) };
        Ok(table
            .rows
            .iter()
            .map(|(_, r)| r)
            .filter(|r| r.get(column).map_or(false, |v| values.contains(v)))
            .cloned()
            .collect())
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Row) -> Result<Row, StorageError> {
        let mut tables = self.tables.write().map_err(|_| StorageError::Poisoned)?;
        check_references(&tables, entity, values)?;
        let now = format_timestamp(Utc::now());
        let key = Uuid::new_v4().to_string();
        let mut row = Row::new();
        for c in entity.visible_columns() {
            let v = if c.name == OBJECT_ID_COLUMN {
                Value::String(key.clone())
            } else if let Some(v) = values.get(&c.name).filter(|_| !c.managed) {
                v.clone()
            } else {
                match &c.default {
                    Some(ColumnDefault::Value(v)) => v.clone(),
                    Some(ColumnDefault::Now) => Value::String(now.clone()),
                    None => Value::Null,
                }
            };
            row.insert(c.name.clone(), v);
        }
        let table = tables.entry(entity.id.clone()).or_default();
        if table.by_key(&key).is_some() {
            return Err(StorageError::UniqueViolation {
                table: entity.table_name.clone(),
                column: OBJECT_ID_COLUMN.to_string(),
                value: key,
            });
        }
        table.next_id += 1;
        table.rows.push((table.next_id, row.clone()));
        Ok(row)
    }

    async fn update(&self, entity: &ResolvedEntity, key: Uuid, values: &Row) -> Result<Option<Row>, StorageError> {
        let mut tables = self.tables.write().map_err(|_| StorageError::Poisoned)?;
        check_references(&tables, entity, values)?;
        let key = key.to_string();
        let Some(row) = tables.get_mut(&entity.id).and_then(|t| {
            t.rows
                .iter_mut()
                .map(|(_, r)| r)
                .find(|r| r.get(OBJECT_ID_COLUMN).and_then(Value::as_str) == Some(key.as_str()))
        }) else {
            return Ok(None);
        };
        for c in entity.writable_columns() {
            if let Some(v) = values.get(&c.name) {
                row.insert(c.name.clone(), v.clone());
            }
        }
        let now = Utc::now();
        let refreshed = match row.get(UPDATED_ON).and_then(parse_time) {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        row.insert(UPDATED_ON.to_string(), Value::String(format_timestamp(refreshed)));
        Ok(Some(row.clone()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.tables.read().map(|_| ()).map_err(|_| StorageError::Poisoned)
    }
}
