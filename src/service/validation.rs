//! Request validation from column rules. Values are normalized to their canonical JSON form on the way in.

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity, ValidationRule};
use crate::error::{AppError, FieldError};
use crate::status::STATUS_COLUMN;
use crate::store::{format_timestamp, Row};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// `NUMERIC(18, 2)` leaves 16 integer digits.
const MONEY_INTEGER_DIGITS: u32 = 16;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. All required fields must be present; server-managed and unknown
    /// fields are dropped, and so is `status` (create always starts from the initial status).
    /// Returns column-keyed values.
    pub fn validate_create(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<Row, AppError> {
        let supplied = supplied_columns(entity, body);
        let mut out = Row::new();
        let mut errors = Vec::new();
        for c in entity.writable_columns() {
            if c.name == STATUS_COLUMN {
                continue;
            }
            let rule = entity.validation.get(&c.name);
            match supplied.get(c.name.as_str()) {
                None | Some(Value::Null) => {
                    if is_required(rule) {
                        errors.push(FieldError::new(&c.api_name, format!("{} is required", c.api_name)));
                    }
                }
                Some(v) => match validate_field(c, rule, v) {
                    Ok(n) => {
                        out.insert(c.name.clone(), n);
                    }
                    Err(e) => errors.push(e),
                },
            }
        }
        finish(out, errors)
    }

    /// Validate only the fields present in body (for PATCH). Required is only enforced against explicit nulls.
    pub fn validate_patch(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<Row, AppError> {
        let supplied = supplied_columns(entity, body);
        let mut out = Row::new();
        let mut errors = Vec::new();
        for c in entity.writable_columns() {
            let Some(v) = supplied.get(c.name.as_str()) else { continue };
            let rule = entity.validation.get(&c.name);
            if v.is_null() {
                if is_required(rule) || !c.nullable {
                    errors.push(FieldError::new(&c.api_name, format!("{} cannot be null", c.api_name)));
                } else {
                    out.insert(c.name.clone(), Value::Null);
                }
                continue;
            }
            match validate_field(c, rule, v) {
                Ok(n) => {
                    out.insert(c.name.clone(), n);
                }
                Err(e) => errors.push(e),
            }
        }
        finish(out, errors)
    }
}

fn finish(out: Row, errors: Vec<FieldError>) -> Result<Row, AppError> {
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn is_required(rule: Option<&ValidationRule>) -> bool {
    rule.and_then(|r| r.required).unwrap_or(false)
}

/// Body values keyed by the column they address; fields matching no column are dropped.
fn supplied_columns<'a>(entity: &'a ResolvedEntity, body: &'a Map<String, Value>) -> HashMap<&'a str, &'a Value> {
    body.iter()
        .filter_map(|(k, v)| entity.column_for_field(k).map(|c| (c.name.as_str(), v)))
        .collect()
}

fn validate_field(c: &ColumnInfo, rule: Option<&ValidationRule>, v: &Value) -> Result<Value, FieldError> {
    let field_error = |msg: String| FieldError::new(&c.api_name, format!("{} {}", c.api_name, msg));
    let value = normalize_value(c.kind, v).map_err(field_error)?;
    let Some(rule) = rule else { return Ok(value) };
    if let (Some(max), Some(s)) = (rule.max_length, value.as_str()) {
        if s.chars().count() > max as usize {
            return Err(field_error(format!("must be at most {} characters", max)));
        }
    }
    if let (Some(allowed), Some(s)) = (&rule.allowed, value.as_str()) {
        if !allowed.iter().any(|a| a == s) {
            return Err(field_error(format!("must be one of: {}", allowed.join(", "))));
        }
    }
    if let (Some(min), Some(n)) = (rule.min, value.as_i64()) {
        if n < min {
            return Err(field_error(format!("must be at least {}", min)));
        }
    }
    Ok(value)
}

/// Coerce a JSON value to the canonical representation for a column type. Error text completes
/// the sentence "<field> ...".
pub fn normalize_value(kind: ColumnType, v: &Value) -> Result<Value, String> {
    match kind {
        ColumnType::Text { .. } => v
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| "must be a string".to_string()),
        ColumnType::Uuid => v
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
            .map(|u| Value::String(u.to_string()))
            .ok_or_else(|| "must be a valid UUID".to_string()),
        ColumnType::Money => normalize_money(v),
        ColumnType::Integer => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(|n| Value::Number(n.into()))
            .ok_or_else(|| "must be a 32-bit integer".to_string()),
        ColumnType::Boolean => v
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "must be a boolean".to_string()),
        ColumnType::Timestamp => v
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|d| Value::String(format_timestamp(d.with_timezone(&chrono::Utc))))
            .ok_or_else(|| "must be an RFC 3339 timestamp".to_string()),
        ColumnType::BigSerial => Err("is assigned by the server".to_string()),
    }
}

/// Parse a decimal amount and render it with exactly two fractional digits.
pub fn parse_money(v: &Value) -> Option<Decimal> {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn normalize_money(v: &Value) -> Result<Value, String> {
    let d = parse_money(v).ok_or_else(|| "must be a decimal number".to_string())?;
    let mut d = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if d.abs() >= Decimal::from(10u64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(format!("must have at most {} integer digits", MONEY_INTEGER_DIGITS));
    }
    d.rescale(2);
    Ok(Value::String(d.to_string()))
}
