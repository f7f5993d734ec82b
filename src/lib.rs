pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the catalog core
pub use logic::{
    Catalog, CatalogError, CatalogResult, ErrorKind, ProductValidator, VariantContext, Verdict,
    Violation,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{InMemoryStore, PostgresStore, Store};

use api::handlers::ApiState;
use config::AppConfig;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the API for `store` on an already bound listener
pub async fn serve_with<S: Store + 'static>(
    listener: TcpListener,
    store: S,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let state = Arc::new(ApiState::new(
        store,
        config.catalog.channel_locales(),
        config.app_name.clone(),
    ));
    let app = routes::create_router().with_state(state);

    info!("{} listening on http://{}", config.app_name, listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect to PostgreSQL and bring the schema up to date
pub async fn connect_postgres(config: &AppConfig) -> anyhow::Result<PostgresStore> {
    let database_url = config.database_url()?;
    let store =
        PostgresStore::new(&database_url, config.database.max_connections.unwrap_or(20)).await?;
    store.migrate().await?;
    Ok(store)
}
