//! Built-in catalog: the five master files and four transaction records served by this crate.

use crate::config::types::{CatalogConfig, ColumnConfig, ColumnType, EntityConfig, RelationshipConfig};
use crate::status::StatusKind;
use serde_json::json;

pub const CODE_MAX: u32 = 30;
pub const DESCRIPTION_MAX: u32 = 200;
pub const REMARKS_MAX: u32 = 200;
pub const PART_NUMBER_MAX: u32 = 120;
pub const MODEL_MAX: u32 = 200;
pub const CUSTOMER_MAX: u32 = 180;
pub const SYMBOL_MAX: u32 = 30;

/// code / description / remarks; `code` is mandatory on master files only.
fn descriptive(code_required: bool) -> Vec<ColumnConfig> {
    let code = ColumnConfig::text("code", CODE_MAX);
    vec![
        if code_required { code.required() } else { code },
        ColumnConfig::text("description", DESCRIPTION_MAX),
        ColumnConfig::text("remarks", REMARKS_MAX),
    ]
}

fn entity(id: &str, table: &str, path_segment: &str, status: StatusKind, columns: Vec<ColumnConfig>) -> EntityConfig {
    EntityConfig {
        id: id.into(),
        table: table.into(),
        path_segment: path_segment.into(),
        status,
        columns,
    }
}

fn master(id: &str, table: &str, path_segment: &str, extra: Vec<ColumnConfig>) -> EntityConfig {
    let mut columns = descriptive(true);
    columns.extend(extra);
    entity(id, table, path_segment, StatusKind::Generic, columns)
}

fn reference(from_entity: &str, from_column: &str, to_entity: &str, navigation: &str, inverse: Option<&str>) -> RelationshipConfig {
    RelationshipConfig {
        id: format!("fk_{}_{}", from_entity, from_column),
        from_entity: from_entity.into(),
        from_column: from_column.into(),
        to_entity: to_entity.into(),
        navigation: navigation.into(),
        inverse_navigation: inverse.map(String::from),
    }
}

pub fn catalog() -> CatalogConfig {
    let money = |name: &str| ColumnConfig::new(name, ColumnType::Money);
    let key = |name: &str| ColumnConfig::new(name, ColumnType::Uuid).required();

    let entities = vec![
        master("classification", "classifications", "Classifications", vec![]),
        master(
            "unit",
            "units",
            "Units",
            vec![ColumnConfig::text("symbol", SYMBOL_MAX).required()],
        ),
        master("part", "parts", "Parts", vec![key("classification_id"), key("unit_id")]),
        master("manufacturer", "manufacturers", "Manufacturers", vec![]),
        master("supplier", "suppliers", "Suppliers", vec![]),
        entity("inventory", "inventories", "Inventories", StatusKind::Generic, {
            let mut cols = descriptive(false);
            cols.extend([
                key("part_id"),
                key("manufacturer_id"),
                ColumnConfig::text("part_number", PART_NUMBER_MAX).required(),
                ColumnConfig::text("model", MODEL_MAX).required(),
                ColumnConfig::new("is_original", ColumnType::Boolean).default_value(json!(false)),
            ]);
            cols
        }),
        entity("inventory_item", "inventory_items", "InventoryItems", StatusKind::Generic, {
            let mut cols = descriptive(false);
            cols.extend([key("inventory_id"), key("supplier_id"), money("price").required()]);
            cols
        }),
        entity("sale", "sales", "Sales", StatusKind::Sale, {
            let mut cols = descriptive(false);
            cols.extend([
                ColumnConfig::new("timestamp", ColumnType::Timestamp).default_now(),
                ColumnConfig::text("customer", CUSTOMER_MAX).required(),
                money("amount").default_value(json!("0.00")),
                money("markup").default_value(json!("0.00")),
                money("total").default_value(json!("0.00")),
            ]);
            cols
        }),
        entity("sale_item", "sale_items", "SaleItems", StatusKind::Generic, {
            let mut cols = descriptive(false);
            cols.extend([
                key("sale_id"),
                key("inventory_item_id"),
                money("amount").default_value(json!("0.00")),
                ColumnConfig::new("quantity", ColumnType::Integer).required().min(0),
                money("total").default_value(json!("0.00")),
            ]);
            cols
        }),
    ];

    let relationships = vec![
        reference("part", "classification_id", "classification", "classification", None),
        reference("part", "unit_id", "unit", "unit", None),
        reference("inventory", "part_id", "part", "part", None),
        reference("inventory", "manufacturer_id", "manufacturer", "manufacturer", None),
        reference("inventory_item", "inventory_id", "inventory", "inventory", Some("inventoryItems")),
        reference("inventory_item", "supplier_id", "supplier", "supplier", None),
        reference("sale_item", "sale_id", "sale", "sale", Some("saleItems")),
        reference("sale_item", "inventory_item_id", "inventory_item", "inventoryItem", None),
    ];

    CatalogConfig {
        entities,
        relationships,
    }
}
