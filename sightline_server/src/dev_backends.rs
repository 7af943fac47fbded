//! Store wiring for local and deployed runs.
//!
//! With `SIGHTLINE_DATABASE_URL` set the server runs against Postgres;
//! otherwise it falls back to a SQLite file under the dev data directory so
//! `sightline serve` works with zero setup.

use crate::server::AppState;
use sightline_core::config::{ReportingConfig, StoreConfig};
use sightline_core::reporting::ReportingEngine;
use sightline_core::seed;
use sightline_core::store::postgres::PostgresStore;
use sightline_core::store::sqlite::SqliteStore;
use sightline_core::store::traits::CatalogStore;
use std::path::Path;
use std::sync::Arc;

#[tracing::instrument(level = "info", skip_all)]
pub async fn build_store(data_dir: &Path) -> anyhow::Result<Arc<dyn CatalogStore>> {
    match StoreConfig::from_env() {
        Some(cfg) => {
            tracing::info!(
                max_connections = cfg.max_connections,
                "using postgres store"
            );
            Ok(Arc::new(PostgresStore::connect(&cfg).await?))
        }
        None => {
            let path = data_dir.join("sightline.db");
            tracing::info!(path = %path.display(), "no postgres url configured; using sqlite store");
            Ok(Arc::new(SqliteStore::new(path).await?))
        }
    }
}

/// Connect, migrate, seed the sample data if absent, and assemble the
/// application state. Any failure here is fatal to startup.
#[tracing::instrument(level = "info", skip_all)]
pub async fn build_state(data_dir: &Path) -> anyhow::Result<AppState> {
    let store = build_store(data_dir).await?;
    store.migrate().await?;
    let seeded = seed::seed_if_empty(store.as_ref()).await?;
    tracing::info!(seeded, "store ready");

    let reporting = ReportingEngine::new(store.clone(), ReportingConfig::from_env());
    Ok(AppState::new(store, reporting))
}
