//! Catalog validation: referential integrity and naming consistency.

use crate::case::{to_camel_case, to_snake_case};
use crate::config::{CatalogConfig, ColumnType};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Columns every entity gets on resolve; catalog columns may not reuse these names.
pub const BASE_COLUMNS: &[&str] = &["id", "object_id", "created_on", "updated_on", "status"];

pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
    let mut entity_ids = HashSet::new();
    let mut path_segments = HashSet::new();

    for e in &config.entities {
        if !entity_ids.insert(e.id.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.id.clone()));
        }
        if !path_segments.insert(e.path_segment.to_lowercase()) {
            return Err(ConfigError::DuplicatePathSegment(e.path_segment.clone()));
        }
        let mut names: HashSet<&str> = BASE_COLUMNS.iter().copied().collect();
        for c in &e.columns {
            if !names.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    entity: e.id.clone(),
                    column: c.name.clone(),
                });
            }
            // The API name must map back to the column name.
            if to_snake_case(&to_camel_case(&c.name)) != c.name {
                return Err(ConfigError::Validation(format!(
                    "column {}.{} must be snake_case",
                    e.id, c.name
                )));
            }
            if c.min.is_some() && c.type_ != ColumnType::Integer {
                return Err(ConfigError::Validation(format!(
                    "column {}.{}: a minimum applies to integer columns only",
                    e.id, c.name
                )));
            }
        }
    }

    let mut navigations: HashSet<(String, String)> = HashSet::new();
    for r in &config.relationships {
        let from = config
            .entities
            .iter()
            .find(|e| e.id == r.from_entity)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: r.from_entity.clone(),
            })?;
        if !entity_ids.contains(r.to_entity.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "entity",
                id: r.to_entity.clone(),
            });
        }
        let column = from
            .columns
            .iter()
            .find(|c| c.name == r.from_column)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{}", r.from_entity, r.from_column),
            })?;
        if column.type_ != ColumnType::Uuid {
            return Err(ConfigError::Validation(format!(
                "relationship {}: {}.{} must be a uuid column",
                r.id, r.from_entity, r.from_column
            )));
        }
        if !navigations.insert((r.from_entity.clone(), r.navigation.to_lowercase())) {
            return Err(ConfigError::Validation(format!(
                "duplicate navigation {} on {}",
                r.navigation, r.from_entity
            )));
        }
        if let Some(inverse) = &r.inverse_navigation {
            if !navigations.insert((r.to_entity.clone(), inverse.to_lowercase())) {
                return Err(ConfigError::Validation(format!(
                    "duplicate navigation {} on {}",
                    inverse, r.to_entity
                )));
            }
        }
    }

    Ok(())
}
