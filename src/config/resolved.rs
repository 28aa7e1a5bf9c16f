//! Resolved entity model: catalog validated and flattened for runtime use.

use crate::config::{ColumnDefault, ColumnType, ValidationRule};
use crate::status::StatusKind;
use std::collections::HashMap;

/// Direction of a navigation: to_one (we hold the FK) or to_many (they hold the FK to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

/// A navigation that `$expand` can embed.
#[derive(Clone, Debug)]
pub struct IncludeSpec {
    /// API name, e.g. `part` or `inventoryItems`.
    pub name: String,
    pub direction: IncludeDirection,
    pub related_entity_id: String,
    /// Our column used in the join (our FK for to_one; our object_id for to_many).
    pub our_key_column: String,
    /// Their column used in the join (their object_id for to_one; their FK for to_many).
    pub their_key_column: String,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub api_name: String,
    pub kind: ColumnType,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    /// Assigned by the server (`id`, `object_id`, `created_on`, `updated_on`); ignored in request bodies.
    pub managed: bool,
    /// Never selected nor serialized (`id`).
    pub hidden: bool,
}

impl ColumnInfo {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub id: String,
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub status: StatusKind,
    pub columns: Vec<ColumnInfo>,
    pub includes: Vec<IncludeSpec>,
    /// Keyed by column name.
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column for an API field name, compared case-insensitively so `Code` and `code` both resolve.
    pub fn column_for_field(&self, field: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .filter(|c| !c.hidden)
            .find(|c| c.api_name.eq_ignore_ascii_case(field))
    }

    pub fn include(&self, name: &str) -> Option<&IncludeSpec> {
        self.includes.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Columns that appear in responses, in declaration order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.hidden)
    }

    /// Columns a client may write.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.managed && !c.hidden)
    }

    /// Foreign keys held by this entity: (column, referenced entity id).
    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.includes
            .iter()
            .filter(|i| i.direction == IncludeDirection::ToOne)
            .map(|i| (i.our_key_column.as_str(), i.related_entity_id.as_str()))
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    /// Lowercased path segment -> index into `entities`.
    pub by_path: HashMap<String, usize>,
    pub by_id: HashMap<String, usize>,
}

impl ResolvedModel {
    /// Collection lookup is case-insensitive, as in `/api/v1/units`.
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.by_path
            .get(&path.to_lowercase())
            .and_then(|i| self.entities.get(*i))
    }

    pub fn entity(&self, id: &str) -> Option<&ResolvedEntity> {
        self.by_id.get(id).and_then(|i| self.entities.get(*i))
    }
}
