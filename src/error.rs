//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate column {column} on {entity}")]
    DuplicateColumn { entity: String, column: String },
    #[error("invalid setting {name}: {reason}")]
    Setting { name: &'static str, reason: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Failure of the backing store. Never retried.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("unique constraint violated: {table}.{column} = {value}")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },
    #[error("foreign key violated: {table}.{column} references missing {target} '{value}'")]
    ForeignKeyViolation {
        table: String,
        column: String,
        target: String,
        value: String,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

/// One offending request field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn field_list(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.field.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{entity} '{key}' not found")]
    NotFound { entity: String, key: String },
    #[error("validation failed: {}", field_list(.0))]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn not_found(entity: &str, key: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None),
            AppError::NotFound { key, .. } => (
                StatusCode::NOT_FOUND,
                "not_found",
                Some(serde_json::json!({ "key": key })),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                serde_json::to_value(errors).ok(),
            ),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
