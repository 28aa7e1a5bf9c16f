//! Persistence behind the CRUD service. Rows are JSON objects keyed by column name; the internal
//! `id` never leaves the store.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::ResolvedEntity;
use crate::error::StorageError;
use crate::query::{ListQuery, Predicate};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

pub type Row = serde_json::Map<String, Value>;

/// Timestamps are exchanged as RFC 3339 UTC with microsecond precision (PostgreSQL's resolution).
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One table per entity. Every method is a single-statement unit of work.
#[async_trait]
pub trait Store: Send + Sync {
    /// Rows whose status is not inactive, matching all predicates, ordered by insertion, paged.
    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Row>, StorageError>;

    /// Number of non-inactive rows matching all predicates.
    async fn count(&self, entity: &ResolvedEntity, predicates: &[Predicate]) -> Result<u64, StorageError>;

    /// Row by object id; with `active_only`, inactive rows are treated as absent.
    async fn find(&self, entity: &ResolvedEntity, key: Uuid, active_only: bool) -> Result<Option<Row>, StorageError>;

    /// Rows of any status where `column` is one of `values`. Used to expand navigations.
    async fn find_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Row>, StorageError>;

    /// Insert one row. The store assigns `id`, `object_id`, `created_on` and `updated_on`, and applies column defaults.
    async fn insert(&self, entity: &ResolvedEntity, values: &Row) -> Result<Row, StorageError>;

    /// Apply `values` to the row with `key` (any status) and refresh `updated_on`. `None` if no such row.
    async fn update(&self, entity: &ResolvedEntity, key: Uuid, values: &Row) -> Result<Option<Row>, StorageError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StorageError>;
}
