//! Inventory service: master-data and sales REST backend over PostgreSQL.
//!
//! Nine catalog entities share one generic CRUD contract with logical deletion.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod status;
pub mod store;

pub use config::{catalog, resolve, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError, FieldError, StorageError};
pub use migration::apply_migrations;
pub use query::{CompareOp, ListQuery, Predicate};
pub use response::{success_many, success_one};
pub use routes::{app, common_routes, entity_routes};
pub use service::CrudService;
pub use settings::{Settings, StoreKind};
pub use state::AppState;
pub use status::{GenericEntityStatus, SaleStatus};
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
