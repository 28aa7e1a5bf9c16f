//! Entity CRUD handlers: list, create, read, update, delete.
//! Handlers resolve the entity from the collection segment, translate query options, and delegate to [`CrudService`].

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::query::odata::{parse_list_query, parse_read_query};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

fn resolve_entity<'a>(model: &'a ResolvedModel, path_segment: &str) -> Result<&'a ResolvedEntity, AppError> {
    model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::not_found("collection", path_segment))
}

fn parse_key(entity: &ResolvedEntity, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid {} key", raw, entity.path_segment)))
}

fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(Value::Object(m))) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state.model, &path_segment)?;
    let params = query_params(params)?;
    let query = parse_list_query(entity, &params)?;
    let (rows, total) = CrudService::list(state.store.as_ref(), &state.model, entity, &query).await?;
    Ok(success_many(rows, total))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state.model, &path_segment)?;
    let body = body_object(body)?;
    let row = CrudService::create(state.store.as_ref(), entity, &body).await?;
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state.model, &path_segment)?;
    let key = parse_key(entity, &key)?;
    let params = query_params(params)?;
    let query = parse_read_query(entity, &params)?;
    let row = CrudService::read(state.store.as_ref(), &state.model, entity, key, &query).await?;
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state.model, &path_segment)?;
    let key = parse_key(entity, &key)?;
    let body = body_object(body)?;
    let row = CrudService::patch(state.store.as_ref(), entity, key, &body).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state.model, &path_segment)?;
    let key = parse_key(entity, &key)?;
    CrudService::delete(state.store.as_ref(), entity, key).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct CollectionRef {
    name: String,
    url: String,
}

/// Service document: the collections served under `/api/v1`.
pub async fn service_document(State(state): State<AppState>) -> impl IntoResponse {
    let collections: Vec<CollectionRef> = state
        .model
        .entities
        .iter()
        .map(|e| CollectionRef {
            name: e.path_segment.clone(),
            url: format!("/api/v1/{}", e.path_segment),
        })
        .collect();
    success_many(collections, None)
}

/// Unmatched routes answer with the standard error body.
pub async fn fallback(uri: Uri) -> AppError {
    AppError::not_found("route", uri.path())
}
