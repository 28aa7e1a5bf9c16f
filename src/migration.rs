//! Apply the resolved model to the database: schema, tables, indexes, then foreign keys.
//! Safe to run on every start: tables and indexes use IF NOT EXISTS, constraints are added only when missing.

use crate::config::{ColumnDefault, ColumnInfo, ColumnType, IncludeDirection, ResolvedEntity, ResolvedModel, OBJECT_ID_COLUMN};
use crate::error::StorageError;
use crate::sql::{qualified_table, quoted};
use crate::status::STATUS_COLUMN;
use serde_json::Value;
use sqlx::PgPool;

/// Constraint name of the foreign key held by `column`.
pub fn foreign_key_name(entity: &ResolvedEntity, column: &str) -> String {
    format!("fk_{}_{}", entity.id, column)
}

fn literal(v: &Value) -> String {
    match v {
        Value::Null => "NULL".into(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn column_def(c: &ColumnInfo) -> String {
    if c.kind == ColumnType::BigSerial {
        return format!("{} BIGSERIAL PRIMARY KEY", quoted(&c.name));
    }
    let mut def = format!("{} {}", quoted(&c.name), c.kind.pg_type());
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if c.name == OBJECT_ID_COLUMN {
        def.push_str(" DEFAULT gen_random_uuid()");
    }
    match &c.default {
        Some(ColumnDefault::Now) => def.push_str(" DEFAULT NOW()"),
        Some(ColumnDefault::Value(v)) => {
            def.push_str(" DEFAULT ");
            def.push_str(&literal(v));
        }
        None => {}
    }
    def
}

pub fn create_table_sql(entity: &ResolvedEntity) -> String {
    let mut defs: Vec<String> = entity.columns.iter().map(column_def).collect();
    defs.push(format!(
        "CONSTRAINT {} UNIQUE ({})",
        quoted(&format!("uq_{}_{}", entity.table_name, OBJECT_ID_COLUMN)),
        quoted(OBJECT_ID_COLUMN)
    ));
    let allowed: Vec<String> = entity
        .status
        .values()
        .iter()
        .map(|v| literal(&Value::String(v.to_string())))
        .collect();
    defs.push(format!(
        "CONSTRAINT {} CHECK ({} IN ({}))",
        quoted(&format!("ck_{}_{}", entity.table_name, STATUS_COLUMN)),
        quoted(STATUS_COLUMN),
        allowed.join(", ")
    ));
    for c in &entity.columns {
        if let Some(min) = entity.validation.get(&c.name).and_then(|r| r.min) {
            defs.push(format!(
                "CONSTRAINT {} CHECK ({} >= {})",
                quoted(&format!("ck_{}_{}", entity.table_name, c.name)),
                quoted(&c.name),
                min
            ));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(entity),
        defs.join(",\n  ")
    )
}

/// One index per foreign key column, plus the status column every list filters on.
pub fn index_sql(entity: &ResolvedEntity) -> Vec<String> {
    let mut columns: Vec<&str> = entity.references().map(|(col, _)| col).collect();
    columns.push(STATUS_COLUMN);
    columns
        .into_iter()
        .map(|col| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("ix_{}_{}", entity.table_name, col)),
                qualified_table(entity),
                quoted(col)
            )
        })
        .collect()
}

/// (constraint name, ALTER TABLE) for each reference held by `entity`.
pub fn foreign_key_sql(model: &ResolvedModel, entity: &ResolvedEntity) -> Result<Vec<(String, String)>, StorageError> {
    let mut out = Vec::new();
    for inc in entity.includes.iter().filter(|i| i.direction == IncludeDirection::ToOne) {
        let target = model.entity(&inc.related_entity_id).ok_or_else(|| {
            StorageError::Db(sqlx::Error::Configuration(
                format!("reference to unknown entity {}", inc.related_entity_id).into(),
            ))
        })?;
        let name = foreign_key_name(entity, &inc.our_key_column);
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE NO ACTION ON DELETE NO ACTION",
            qualified_table(entity),
            quoted(&name),
            quoted(&inc.our_key_column),
            qualified_table(target),
            quoted(&inc.their_key_column)
        );
        out.push((name, sql));
    }
    Ok(out)
}

pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), StorageError> {
    let Some(first) = model.entities.first() else { return Ok(()) };
    let schema = first.schema_name.clone();
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&schema)))
        .execute(pool)
        .await?;

    for e in &model.entities {
        tracing::debug!(table = %e.table_name, "ensuring table");
        sqlx::query(&create_table_sql(e)).execute(pool).await?;
        for sql in index_sql(e) {
            sqlx::query(&sql).execute(pool).await?;
        }
    }

    for e in &model.entities {
        for (name, sql) in foreign_key_sql(model, e)? {
            let exists: (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM pg_constraint c JOIN pg_namespace n ON n.oid = c.connamespace WHERE c.conname = $1 AND n.nspname = $2)",
            )
            .bind(&name)
            .bind(&e.schema_name)
            .fetch_one(pool)
            .await?;
            if !exists.0 {
                tracing::info!(constraint = %name, "adding foreign key");
                sqlx::query(&sql).execute(pool).await?;
            }
        }
    }

    tracing::info!(schema = %schema, tables = model.entities.len(), "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{catalog, resolve};

    fn model() -> ResolvedModel {
        resolve(&catalog(), "inventory").unwrap()
    }

    #[test]
    fn sale_table_ddl() {
        let m = model();
        let sql = create_table_sql(m.entity("sale").unwrap());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"inventory\".\"sales\" (\n  \"id\" BIGSERIAL PRIMARY KEY,\n  \"object_id\" uuid NOT NULL DEFAULT gen_random_uuid(),"));
        assert!(sql.contains("\"customer\" varchar(180) NOT NULL,"));
        assert!(sql.contains("\"total\" numeric(18, 2) NOT NULL DEFAULT '0.00',"));
        assert!(sql.contains("\"timestamp\" timestamptz NOT NULL DEFAULT NOW(),"));
        assert!(sql.contains("\"remarks\" varchar(200),"));
        assert!(sql.contains("\"status\" varchar(20) NOT NULL DEFAULT 'Created',"));
        assert!(sql.contains("CHECK (\"status\" IN ('Created', 'Pending', 'Completed', 'Inactive'))"));
        assert!(sql.contains("CONSTRAINT \"uq_sales_object_id\" UNIQUE (\"object_id\")"));
    }

    #[test]
    fn boolean_default_is_a_keyword() {
        let m = model();
        let sql = create_table_sql(m.entity("inventory").unwrap());
        assert!(sql.contains("\"is_original\" boolean NOT NULL DEFAULT FALSE"));
    }

    #[test]
    fn quantity_has_a_lower_bound() {
        let m = model();
        let sql = create_table_sql(m.entity("sale_item").unwrap());
        assert!(sql.contains("CONSTRAINT \"ck_sale_items_quantity\" CHECK (\"quantity\" >= 0)"));
        assert!(!create_table_sql(m.entity("sale").unwrap()).contains(">="));
    }

    #[test]
    fn foreign_keys_target_object_id() {
        let m = model();
        let item = m.entity("sale_item").unwrap();
        let fks = foreign_key_sql(&m, item).unwrap();
        let names: Vec<_> = fks.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["fk_sale_item_sale_id", "fk_sale_item_inventory_item_id"]);
        assert!(fks[1].1.contains(
            "FOREIGN KEY (\"inventory_item_id\") REFERENCES \"inventory\".\"inventory_items\" (\"object_id\")"
        ));
    }

    #[test]
    fn indexes_cover_references_and_status() {
        let m = model();
        let stmts = index_sql(m.entity("part").unwrap());
        assert_eq!(stmts.len(), 3);
        assert!(stmts[2].contains("\"ix_parts_status\""));
        assert!(index_sql(m.entity("unit").unwrap())[0].ends_with("(\"status\")"));
    }
}
