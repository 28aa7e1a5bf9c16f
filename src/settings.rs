//! Process settings from the environment.

use crate::error::ConfigError;
use std::str::FromStr;

/// Backing store selected at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::Setting {
                name: "INVENTORY_STORE",
                reason: format!("expected postgres or memory, got '{}'", other),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
    pub schema: String,
    pub max_connections: u32,
    pub store: StoreKind,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let schema = get("INVENTORY_SCHEMA", "inventory");
        if schema.is_empty() || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Setting {
                name: "INVENTORY_SCHEMA",
                reason: format!("'{}' is not a plain identifier", schema),
            });
        }
        let max_connections = get("DATABASE_MAX_CONNECTIONS", "5")
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::Setting {
                name: "DATABASE_MAX_CONNECTIONS",
                reason: "must be a positive integer".into(),
            })?;

        Ok(Settings {
            database_url: get("DATABASE_URL", "postgres://localhost/inventory"),
            allowed_origins: parse_origins(&get("ALLOWED_ORIGINS", "")),
            bind_addr: get("BIND_ADDR", "0.0.0.0:3000"),
            schema,
            max_connections,
            store: get("INVENTORY_STORE", "postgres").parse()?,
        })
    }
}

/// Semicolon-separated origins; `*` alone allows any.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
