//! Build the runtime model from the catalog.

use crate::case::to_camel_case;
use crate::config::resolved::{ColumnInfo, IncludeDirection, IncludeSpec, ResolvedEntity, ResolvedModel};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::status::STATUS_COLUMN;
use std::collections::HashMap;

/// Column every relationship targets.
pub const OBJECT_ID_COLUMN: &str = "object_id";

/// Validate the catalog and resolve it against the PostgreSQL schema holding the tables.
pub fn resolve(config: &CatalogConfig, schema_name: &str) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut entities = Vec::with_capacity(config.entities.len());
    let mut by_path = HashMap::new();
    let mut by_id = HashMap::new();

    for e in &config.entities {
        let mut columns = vec![
            base_column("id", ColumnType::BigSerial, None, true),
            base_column(OBJECT_ID_COLUMN, ColumnType::Uuid, None, false),
        ];
        let mut validation = HashMap::new();

        for c in &e.columns {
            columns.push(ColumnInfo {
                name: c.name.clone(),
                api_name: to_camel_case(&c.name),
                kind: c.type_,
                nullable: !c.required && c.default.is_none(),
                default: c.default.clone(),
                managed: false,
                hidden: false,
            });
            let rule = ValidationRule {
                required: Some(c.required),
                max_length: match c.type_ {
                    ColumnType::Text { max_length } => Some(max_length),
                    _ => None,
                },
                allowed: None,
                min: c.min,
            };
            validation.insert(c.name.clone(), rule);
        }

        let values = e.status.values();
        columns.push(ColumnInfo {
            name: STATUS_COLUMN.into(),
            api_name: STATUS_COLUMN.into(),
            kind: ColumnType::Text { max_length: 20 },
            nullable: false,
            default: Some(ColumnDefault::Value(e.status.initial().into())),
            managed: false,
            hidden: false,
        });
        validation.insert(
            STATUS_COLUMN.into(),
            ValidationRule {
                required: Some(false),
                max_length: None,
                allowed: Some(values.iter().map(|v| v.to_string()).collect()),
                min: None,
            },
        );
        columns.push(base_column("created_on", ColumnType::Timestamp, Some(ColumnDefault::Now), false));
        columns.push(base_column("updated_on", ColumnType::Timestamp, Some(ColumnDefault::Now), false));

        let includes = build_includes_for_entity(&e.id, &config.relationships);
        by_path.insert(e.path_segment.to_lowercase(), entities.len());
        by_id.insert(e.id.clone(), entities.len());
        entities.push(ResolvedEntity {
            id: e.id.clone(),
            schema_name: schema_name.to_string(),
            table_name: e.table.clone(),
            path_segment: e.path_segment.clone(),
            status: e.status,
            columns,
            includes,
            validation,
        });
    }

    tracing::debug!(entities = entities.len(), schema = %schema_name, "resolved model");
    Ok(ResolvedModel {
        entities,
        by_path,
        by_id,
    })
}

fn base_column(name: &str, kind: ColumnType, default: Option<ColumnDefault>, hidden: bool) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        api_name: to_camel_case(name),
        kind,
        nullable: false,
        default,
        managed: true,
        hidden,
    }
}

fn build_includes_for_entity(our_entity_id: &str, relationships: &[RelationshipConfig]) -> Vec<IncludeSpec> {
    let mut includes = Vec::new();
    for rel in relationships {
        if rel.from_entity == our_entity_id {
            includes.push(IncludeSpec {
                name: rel.navigation.clone(),
                direction: IncludeDirection::ToOne,
                related_entity_id: rel.to_entity.clone(),
                our_key_column: rel.from_column.clone(),
                their_key_column: OBJECT_ID_COLUMN.into(),
            });
        }
        if rel.to_entity == our_entity_id {
            if let Some(inverse) = &rel.inverse_navigation {
                includes.push(IncludeSpec {
                    name: inverse.clone(),
                    direction: IncludeDirection::ToMany,
                    related_entity_id: rel.from_entity.clone(),
                    our_key_column: OBJECT_ID_COLUMN.into(),
                    their_key_column: rel.from_column.clone(),
                });
            }
        }
    }
    includes
}
