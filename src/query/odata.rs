//! Translate OData-style query options into a [`ListQuery`].
//!
//! Supported: `$filter` (comparisons joined by `and`), `$select`, `$expand`, `$top`, `$skip`, `$count`.
//! Plain `field=value` parameters are exact-match filters. Field and navigation names match
//! case-insensitively.

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::error::AppError;
use crate::query::{CompareOp, ListQuery, Predicate, MAX_PAGE_SIZE};
use crate::service::validation::normalize_value;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// One `field op literal` clause, optionally followed by `and`.
const CLAUSE: &str = r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s+([A-Za-z]+)\s+('(?:[^']|'')*'|[^\s']+)(?:\s+((?i)and)\s+|\s*$)";

/// Options for a collection read.
pub fn parse_list_query(entity: &ResolvedEntity, params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    parse(entity, params, true)
}

/// Options for a by-key read: only `$select` and `$expand` apply.
pub fn parse_read_query(entity: &ResolvedEntity, params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    parse(entity, params, false)
}

fn parse(entity: &ResolvedEntity, params: &HashMap<String, String>, collection: bool) -> Result<ListQuery, AppError> {
    let mut q = ListQuery::new();
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    for key in keys {
        let value = &params[key];
        match key.to_lowercase().as_str() {
            "$select" => q.select = Some(parse_select(entity, value)?),
            "$expand" => q.expand = parse_expand(entity, value)?,
            "$filter" if collection => q.predicates.extend(parse_filter(entity, value)?),
            "$top" if collection => {
                let n = parse_u32(key, value)?;
                if n > MAX_PAGE_SIZE {
                    return Err(AppError::BadRequest(format!(
                        "the limit of {} for $top has been exceeded",
                        MAX_PAGE_SIZE
                    )));
                }
                q.top = Some(n);
            }
            "$skip" if collection => q.skip = Some(parse_u32(key, value)?),
            "$count" if collection => {
                q.count = match value.to_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(AppError::BadRequest("$count must be true or false".into())),
                }
            }
            other if other.starts_with('$') => {
                return Err(AppError::BadRequest(format!("query option {} is not supported here", key)));
            }
            _ if collection => {
                if let Some(c) = entity.column_for_field(key) {
                    let v = raw_value(c, value).map_err(|msg| AppError::BadRequest(format!("{} {}", c.api_name, msg)))?;
                    q.predicates.push(Predicate {
                        column: c.name.clone(),
                        op: CompareOp::Eq,
                        value: v,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(q)
}

fn parse_u32(key: &str, value: &str) -> Result<u32, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", key)))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_select(entity: &ResolvedEntity, value: &str) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::new();
    for field in split_list(value) {
        let c = entity
            .column_for_field(field)
            .ok_or_else(|| AppError::BadRequest(format!("unknown field '{}' in $select", field)))?;
        if !out.contains(&c.name) {
            out.push(c.name.clone());
        }
    }
    Ok(out)
}

fn parse_expand(entity: &ResolvedEntity, value: &str) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::new();
    for nav in split_list(value) {
        let inc = entity.include(nav).ok_or_else(|| {
            AppError::BadRequest(format!("unknown navigation '{}' on {}", nav, entity.path_segment))
        })?;
        if !out.contains(&inc.name) {
            out.push(inc.name.clone());
        }
    }
    Ok(out)
}

pub fn parse_filter(entity: &ResolvedEntity, filter: &str) -> Result<Vec<Predicate>, AppError> {
    let re = Regex::new(CLAUSE).map_err(|e| AppError::BadRequest(format!("$filter pattern: {}", e)))?;
    let mut predicates = Vec::new();
    let mut rest = filter;
    while !rest.trim().is_empty() {
        let caps = re
            .captures(rest)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported $filter expression near '{}'", rest.trim())))?;
        let field = &caps[1];
        let c = entity
            .column_for_field(field)
            .ok_or_else(|| AppError::BadRequest(format!("unknown field '{}' in $filter", field)))?;
        let op = CompareOp::parse(&caps[2])
            .ok_or_else(|| AppError::BadRequest(format!("unsupported operator '{}' in $filter", &caps[2])))?;
        let value = literal_value(c, &caps[3]).map_err(|msg| AppError::BadRequest(format!("$filter: {} {}", c.api_name, msg)))?;
        if value.is_null() && !matches!(op, CompareOp::Eq | CompareOp::Ne) {
            return Err(AppError::BadRequest("null can only be compared with eq or ne".into()));
        }
        predicates.push(Predicate {
            column: c.name.clone(),
            op,
            value,
        });
        let consumed = caps.get(0).map(|m| m.end()).unwrap_or(rest.len());
        rest = &rest[consumed..];
        if caps.get(4).is_some() && rest.trim().is_empty() {
            return Err(AppError::BadRequest("$filter ends with a dangling 'and'".into()));
        }
    }
    Ok(predicates)
}

/// `$filter` literal: `'quoted'`, `null`, `true`/`false`, a number, or a bare token (UUIDs, timestamps).
fn literal_value(c: &ColumnInfo, token: &str) -> Result<Value, String> {
    if let Some(inner) = token.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return normalize_value(c.kind, &Value::String(inner.replace("''", "'")));
    }
    if token.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    if matches!(c.kind, ColumnType::Text { .. }) {
        return Err("must be compared with a quoted string".into());
    }
    let parsed = match token.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => serde_json::from_str::<serde_json::Number>(token)
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(token.to_string())),
    };
    normalize_value(c.kind, &parsed)
}

/// Plain `field=value` parameter: the raw text is the value.
fn raw_value(c: &ColumnInfo, raw: &str) -> Result<Value, String> {
    let parsed = match c.kind {
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| "must be an integer".to_string())?,
        ColumnType::Boolean => match raw.trim().to_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err("must be true or false".into()),
        },
        _ => Value::String(raw.to_string()),
    };
    normalize_value(c.kind, &parsed)
}
