//! Inventory service binary: reads settings from the environment, prepares the store, serves HTTP.
//!
//! Run from repo root: `cargo run -p inventory-server`
//! `INVENTORY_STORE=memory` runs without a database.

use inventory_service::{
    app, apply_migrations, catalog, ensure_database_exists, resolve, AppState, MemoryStore, PgStore, Settings,
    StoreKind, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inventory_service=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let model = resolve(&catalog(), &settings.schema)?;

    let store: Arc<dyn Store> = match settings.store {
        StoreKind::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.database_url)
                .await?;
            apply_migrations(&pool, &model).await?;
            Arc::new(PgStore::new(pool))
        }
    };

    let router = app(AppState::new(store, model), &settings);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("inventory service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
