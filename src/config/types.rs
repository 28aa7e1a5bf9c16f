//! Raw catalog types: entities, their domain columns, and alternate-key relationships.

use crate::status::StatusKind;
use serde::{Deserialize, Serialize};

/// Logical column type. Drives DDL, request normalization, and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "name")]
pub enum ColumnType {
    Text { max_length: u32 },
    Uuid,
    /// Fixed-point `NUMERIC(18, 2)`.
    Money,
    Integer,
    Boolean,
    Timestamp,
    BigSerial,
}

impl ColumnType {
    /// PostgreSQL type used in DDL and in parameter casts.
    pub fn pg_type(&self) -> String {
        match self {
            ColumnType::Text { max_length } => format!("varchar({})", max_length),
            ColumnType::Uuid => "uuid".into(),
            ColumnType::Money => "numeric(18, 2)".into(),
            ColumnType::Integer => "integer".into(),
            ColumnType::Boolean => "boolean".into(),
            ColumnType::Timestamp => "timestamptz".into(),
            ColumnType::BigSerial => "bigint".into(),
        }
    }

    /// Type name for `$n::type` casts (DDL-only modifiers stripped).
    pub fn cast_type(&self) -> &'static str {
        match self {
            ColumnType::Text { .. } => "text",
            ColumnType::Uuid => "uuid",
            ColumnType::Money => "numeric",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::BigSerial => "bigint",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    Value(serde_json::Value),
    Now,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// snake_case column name; the API name is its camelCase form.
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<ColumnDefault>,
    /// Inclusive lower bound for integer columns.
    #[serde(default)]
    pub min: Option<i64>,
}

impl ColumnConfig {
    pub fn new(name: &str, type_: ColumnType) -> Self {
        ColumnConfig {
            name: name.to_string(),
            type_,
            required: false,
            default: None,
            min: None,
        }
    }

    pub fn text(name: &str, max_length: u32) -> Self {
        Self::new(name, ColumnType::Text { max_length })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(ColumnDefault::Value(value));
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(ColumnDefault::Now);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub table: String,
    /// Collection name used in the URL, e.g. `InventoryItems`.
    pub path_segment: String,
    pub status: StatusKind,
    /// Domain columns only; base columns (`id`, `object_id`, timestamps, `status`) are added on resolve.
    pub columns: Vec<ColumnConfig>,
}

/// Foreign key from `from_entity.from_column` to the target's `object_id` alternate key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub id: String,
    pub from_entity: String,
    pub from_column: String,
    pub to_entity: String,
    /// Navigation name on the referencing side (to-one).
    pub navigation: String,
    /// Navigation name on the referenced side (to-many), when the target owns a collection.
    #[serde(default)]
    pub inverse_navigation: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub allowed: Option<Vec<String>>,
    #[serde(default)]
    pub min: Option<i64>,
}

/// All catalog types in one struct for in-memory loading.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub entities: Vec<EntityConfig>,
    pub relationships: Vec<RelationshipConfig>,
}
