use crate::routes;
use axum::routing::get;
use axum::{Extension, Router};
use sightline_core::reporting::ReportingEngine;
use sightline_core::store::traits::CatalogStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub reporting: ReportingEngine,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, reporting: ReportingEngine) -> Self {
        Self {
            store,
            reporting,
            started_at: Instant::now(),
        }
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(routes::router())
        .route("/health", get(routes::health::get_health))
        .layer(Extension(state))
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "sightline listening");
    axum::serve(listener, app).await?;
    Ok(())
}
