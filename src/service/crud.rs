//! Generic CRUD over any catalog entity. Deletion is logical: the row moves to the inactive status.

use crate::config::{IncludeDirection, IncludeSpec, ResolvedEntity, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::query::ListQuery;
use crate::service::RequestValidator;
use crate::status::STATUS_COLUMN;
use crate::store::{Row, Store};
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct CrudService;

impl CrudService {
    /// Active rows matching the query, shaped for the API. The total is counted only when `$count` asked for it.
    pub async fn list(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        query: &ListQuery,
    ) -> Result<(Vec<Value>, Option<u64>), AppError> {
        let rows = store.list(entity, query).await?;
        let total = if query.count {
            Some(store.count(entity, &query.predicates).await?)
        } else {
            None
        };
        let data = Self::shape(store, model, entity, &rows, query).await?;
        Ok((data, total))
    }

    /// One active row by object id; inactive rows read as not found.
    pub async fn read(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        key: Uuid,
        query: &ListQuery,
    ) -> Result<Value, AppError> {
        let row = store
            .find(entity, key, true)
            .await?
            .ok_or_else(|| AppError::not_found(&entity.path_segment, key))?;
        let mut data = Self::shape(store, model, entity, std::slice::from_ref(&row), query).await?;
        Ok(data.pop().unwrap_or(Value::Null))
    }

    /// Insert with the entity's initial status; the store assigns key and timestamps.
    pub async fn create(store: &dyn Store, entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<Value, AppError> {
        let mut values = RequestValidator::validate_create(entity, body)?;
        values.insert(STATUS_COLUMN.into(), Value::String(entity.status.initial().into()));
        let row = store.insert(entity, &values).await?;
        tracing::info!(entity = %entity.id, key = ?row.get("object_id"), "created");
        Ok(to_api(entity, &row))
    }

    /// Apply the supplied fields to the row with `key`, whatever its status.
    pub async fn patch(
        store: &dyn Store,
        entity: &ResolvedEntity,
        key: Uuid,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let values = RequestValidator::validate_patch(entity, body)?;
        let row = store
            .update(entity, key, &values)
            .await?
            .ok_or_else(|| AppError::not_found(&entity.path_segment, key))?;
        tracing::info!(entity = %entity.id, %key, fields = values.len(), "patched");
        Ok(to_api(entity, &row))
    }

    /// Soft delete. Deleting an already inactive row succeeds again; a missing key is not found.
    pub async fn delete(store: &dyn Store, entity: &ResolvedEntity, key: Uuid) -> Result<(), AppError> {
        let mut values = Row::new();
        values.insert(STATUS_COLUMN.into(), Value::String(entity.status.inactive().into()));
        store
            .update(entity, key, &values)
            .await?
            .ok_or_else(|| AppError::not_found(&entity.path_segment, key))?;
        tracing::info!(entity = %entity.id, %key, "deactivated");
        Ok(())
    }

    /// Project `$select` and embed `$expand` navigations. Related rows are batch-loaded once per navigation.
    async fn shape(
        store: &dyn Store,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        rows: &[Row],
        query: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        let mut out: Vec<Map<String, Value>> = rows
            .iter()
            .map(|r| project(entity, r, query.select.as_deref()))
            .collect();
        for nav in &query.expand {
            let Some(inc) = entity.include(nav) else { continue };
            let related = model.entity(&inc.related_entity_id).ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: inc.related_entity_id.clone(),
            })?;
            let found = store
                .find_where_in(related, &inc.their_key_column, &join_keys(rows, inc))
                .await?;
            for (row, obj) in rows.iter().zip(out.iter_mut()) {
                obj.insert(inc.name.clone(), embed(related, inc, row, &found));
            }
        }
        Ok(out.into_iter().map(Value::Object).collect())
    }
}

/// Distinct non-null values of our side of the join.
fn join_keys(rows: &[Row], inc: &IncludeSpec) -> Vec<Value> {
    let mut keys: Vec<Value> = Vec::new();
    for v in rows.iter().filter_map(|r| r.get(&inc.our_key_column)) {
        if !v.is_null() && !keys.contains(v) {
            keys.push(v.clone());
        }
    }
    keys
}

fn embed(related: &ResolvedEntity, inc: &IncludeSpec, row: &Row, found: &[Row]) -> Value {
    let ours = row.get(&inc.our_key_column).filter(|v| !v.is_null());
    let mut matching = found
        .iter()
        .filter(|f| ours.is_some() && f.get(&inc.their_key_column) == ours)
        .map(|f| to_api(related, f));
    match inc.direction {
        IncludeDirection::ToOne => matching.next().unwrap_or(Value::Null),
        IncludeDirection::ToMany => Value::Array(matching.collect()),
    }
}

fn project(entity: &ResolvedEntity, row: &Row, select: Option<&[String]>) -> Map<String, Value> {
    entity
        .visible_columns()
        .filter(|c| select.map_or(true, |s| s.contains(&c.name)))
        .map(|c| (c.api_name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// Column-keyed store row to its camelCase API form.
pub fn to_api(entity: &ResolvedEntity, row: &Row) -> Value {
    Value::Object(project(entity, row, None))
}
