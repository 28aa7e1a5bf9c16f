//! Builds parameterized SELECT, INSERT and UPDATE from a resolved entity.
//! Identifiers come from the catalog only; every value is a text parameter cast to the column type.

use crate::config::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::query::{CompareOp, ListQuery, Predicate};
use crate::status::STATUS_COLUMN;
use crate::store::Row;
use serde_json::Value;
use uuid::Uuid;

/// Quote identifier for PostgreSQL (safe: only from catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its `$n::type` placeholder.
    fn push_param(&mut self, v: Value, cast: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), cast)
    }
}

/// SELECT list: visible columns; numeric as text so amounts keep their two decimals.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .visible_columns()
        .map(|c| {
            let q = quoted(&c.name);
            if c.kind == ColumnType::Money {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn predicate_sql(q: &mut QueryBuf, c: &ColumnInfo, p: &Predicate) -> String {
    let col = quoted(&c.name);
    match (&p.value, p.op) {
        (Value::Null, CompareOp::Eq) => format!("{} IS NULL", col),
        (Value::Null, _) => format!("{} IS NOT NULL", col),
        (v, op) => {
            let ph = q.push_param(v.clone(), c.kind.cast_type());
            format!("{} {} {}", col, op.sql(), ph)
        }
    }
}

/// WHERE clause excluding inactive rows plus the given predicates (unknown columns are skipped).
fn active_where(q: &mut QueryBuf, entity: &ResolvedEntity, predicates: &[Predicate]) -> String {
    let inactive = q.push_param(Value::String(entity.status.inactive().into()), "text");
    let mut parts = vec![format!("{} <> {}", quoted(STATUS_COLUMN), inactive)];
    for p in predicates {
        if let Some(c) = entity.column(&p.column) {
            parts.push(predicate_sql(q, c, p));
        }
    }
    format!(" WHERE {}", parts.join(" AND "))
}

/// SELECT active rows with predicates, ORDER BY internal id, LIMIT/OFFSET from the query.
pub fn select_list(entity: &ResolvedEntity, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = active_where(&mut q, entity, &query.predicates);
    let offset_clause = match query.offset() {
        0 => String::new(),
        n => format!(" OFFSET {}", n),
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {}{}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        quoted("id"),
        query.limit(),
        offset_clause
    );
    q
}

/// SELECT COUNT(*) of active rows matching the predicates.
pub fn count(entity: &ResolvedEntity, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = active_where(&mut q, entity, predicates);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_clause);
    q
}

/// SELECT by object id, optionally hiding inactive rows.
pub fn select_by_key(entity: &ResolvedEntity, key: Uuid, active_only: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let key_ph = q.push_param(Value::String(key.to_string()), "uuid");
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted("object_id"),
        key_ph
    );
    if active_only {
        let inactive = q.push_param(Value::String(entity.status.inactive().into()), "text");
        sql.push_str(&format!(" AND {} <> {}", quoted(STATUS_COLUMN), inactive));
    }
    q.sql = sql;
    q
}

/// SELECT rows where column IN (values) ORDER BY id. Used for batch-fetching related rows;
/// callers skip the query when `values` is empty.
pub fn select_by_column_in(entity: &ResolvedEntity, column_name: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity);
    let cols = select_column_list(entity);
    let cast = entity
        .column(column_name)
        .map(|c| c.kind.cast_type())
        .unwrap_or("text");
    let placeholders: Vec<String> = values.iter().map(|v| q.push_param(v.clone(), cast)).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(column_name),
        placeholders.join(", "),
        quoted("id")
    );
    q
}

/// INSERT the writable columns present in `values`; everything else takes its DB default.
pub fn insert(entity: &ResolvedEntity, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(entity);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.writable_columns() {
        let Some(v) = values.get(&c.name) else { continue };
        placeholders.push(q.push_param(v.clone(), c.kind.cast_type()));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by object id: SET the writable columns present in `values` and refresh updated_on.
/// updated_on never moves backwards, even if the server clock does.
pub fn update(entity: &ResolvedEntity, key: Uuid, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in entity.writable_columns() {
        let Some(v) = values.get(&c.name) else { continue };
        let ph = q.push_param(v.clone(), c.kind.cast_type());
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    let updated_on = quoted("updated_on");
    sets.push(format!("{} = GREATEST(NOW(), {})", updated_on, updated_on));
    let key_ph = q.push_param(Value::String(key.to_string()), "uuid");
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted("object_id"),
        key_ph,
        select_column_list(entity)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&catalog(), "inventory").unwrap()
    }

    const KEY: &str = "6f1c2f6e-8d0a-4c4e-9a55-0d9f3a1f8f11";

    #[test]
    fn list_excludes_inactive_and_pages() {
        let m = model();
        let unit = m.entity("unit").unwrap();
        let query = ListQuery::new()
            .filter("code", CompareOp::Eq, json!("PCS"))
            .filter("remarks", CompareOp::Ne, Value::Null)
            .top(10)
            .skip(5);
        let q = select_list(unit, &query);
        assert_eq!(
            q.sql,
            "SELECT \"object_id\", \"code\", \"description\", \"remarks\", \"symbol\", \"status\", \"created_on\", \"updated_on\" \
             FROM \"inventory\".\"units\" WHERE \"status\" <> $1::text AND \"code\" = $2::text AND \"remarks\" IS NOT NULL \
             ORDER BY \"id\" LIMIT 10 OFFSET 5"
        );
        assert_eq!(q.params, vec![json!("Inactive"), json!("PCS")]);
    }

    #[test]
    fn money_is_selected_as_text() {
        let m = model();
        let q = select_by_key(m.entity("inventory_item").unwrap(), Uuid::parse_str(KEY).unwrap(), true);
        assert!(q.sql.contains("\"price\"::text AS \"price\""));
        assert!(q.sql.ends_with("WHERE \"object_id\" = $1::uuid AND \"status\" <> $2::text"));
        assert_eq!(q.params, vec![json!(KEY), json!("Inactive")]);
    }

    #[test]
    fn key_lookup_without_status_filter() {
        let m = model();
        let q = select_by_key(m.entity("unit").unwrap(), Uuid::parse_str(KEY).unwrap(), false);
        assert!(!q.sql.contains("status\" <>"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn insert_only_supplied_columns() {
        let m = model();
        let unit = m.entity("unit").unwrap();
        let mut values = Row::new();
        values.insert("code".into(), json!("PCS"));
        values.insert("symbol".into(), json!("pcs"));
        values.insert("status".into(), json!("Active"));
        let q = insert(unit, &values);
        assert!(q.sql.starts_with(
            "INSERT INTO \"inventory\".\"units\" (\"code\", \"symbol\", \"status\") VALUES ($1::text, $2::text, $3::text) RETURNING "
        ));
        assert_eq!(q.params, vec![json!("PCS"), json!("pcs"), json!("Active")]);
    }

    #[test]
    fn update_refreshes_updated_on_even_when_empty() {
        let m = model();
        let q = update(m.entity("sale").unwrap(), Uuid::parse_str(KEY).unwrap(), &Row::new());
        assert!(q.sql.starts_with(
            "UPDATE \"inventory\".\"sales\" SET \"updated_on\" = GREATEST(NOW(), \"updated_on\") WHERE \"object_id\" = $1::uuid RETURNING "
        ));
        assert_eq!(q.params, vec![json!(KEY)]);
    }

    #[test]
    fn update_casts_typed_columns() {
        let m = model();
        let mut values = Row::new();
        values.insert("total".into(), json!("10.00"));
        values.insert("timestamp".into(), json!("2024-01-01T00:00:00.000000Z"));
        let q = update(m.entity("sale").unwrap(), Uuid::parse_str(KEY).unwrap(), &values);
        assert!(q.sql.contains("\"timestamp\" = $1::timestamptz"));
        assert!(q.sql.contains("\"total\" = $2::numeric"));
    }

    #[test]
    fn column_in_binds_each_value() {
        let m = model();
        let q = select_by_column_in(m.entity("inventory_item").unwrap(), "inventory_id", &[json!(KEY)]);
        assert!(q.sql.contains("WHERE \"inventory_id\" IN ($1::uuid) ORDER BY \"id\""));
    }
}
