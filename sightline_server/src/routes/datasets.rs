//! Dataset connection registry routes.
//!
//! Registration is metadata-only: no connectivity is attempted on create or
//! test, and the schema endpoint returns a fixed document describing the
//! bundled sample tables. Stored passwords are never serialized back out.

use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sightline_core::models::{DatasetKind, DatasetRecord, DatasetStatus, SchemaDoc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct DatasetCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub host: String,
    pub port: i32,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Public view of a dataset row. Credentials stay out of every response.
#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    pub host: String,
    pub port: i32,
    pub database: String,
    pub status: DatasetStatus,
    pub tables_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<DatasetRecord> for DatasetResponse {
    fn from(r: DatasetRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            kind: r.kind,
            host: r.host,
            port: r.port,
            database: r.database,
            status: r.status,
            tables_count: r.tables_count,
            created_at: r.created_at,
        }
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/datasets", get(list_datasets).post(create_dataset))
        .route("/datasets/{id}", axum::routing::delete(delete_dataset))
        .route("/datasets/{id}/test", post(test_connection))
        .route("/datasets/{id}/schema", get(get_schema))
}

/// GET /api/v1/datasets — all registered connections, newest first.
#[tracing::instrument(level = "debug", skip_all)]
async fn list_datasets(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<DatasetResponse>>, ApiError> {
    let rows = state.store.list_datasets().await?;
    Ok(Json(rows.into_iter().map(DatasetResponse::from).collect()))
}

fn require_field(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// POST /api/v1/datasets — register a connection. Shape validation only;
/// the row is stored as `connected` without any network attempt.
#[tracing::instrument(level = "info", skip_all)]
async fn create_dataset(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<DatasetCreate>,
) -> Result<Json<DatasetResponse>, ApiError> {
    require_field(&body.name, "name")?;
    require_field(&body.host, "host")?;
    require_field(&body.database, "database")?;
    require_field(&body.username, "username")?;
    let kind = DatasetKind::parse_str(&body.kind).ok_or_else(|| {
        ApiError::InvalidInput(format!("unknown dataset type: {}", body.kind))
    })?;
    if body.port <= 0 || body.port > 65_535 {
        return Err(ApiError::InvalidInput(format!(
            "port out of range: {}",
            body.port
        )));
    }

    let now = Utc::now();
    let record = DatasetRecord {
        id: Uuid::new_v4(),
        name: body.name,
        kind,
        host: body.host,
        port: body.port,
        database: body.database,
        username: body.username,
        password: body.password,
        status: DatasetStatus::Connected,
        tables_count: 0,
        created_at: now,
        updated_at: now,
    };
    state.store.create_dataset(&record).await?;
    Ok(Json(DatasetResponse::from(record)))
}

/// DELETE /api/v1/datasets/{id}
#[tracing::instrument(level = "info", skip_all, fields(dataset_id = %id))]
async fn delete_dataset(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_dataset(id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Dataset deleted successfully" }),
    ))
}

/// POST /api/v1/datasets/{id}/test — stubbed connectivity check: flips the
/// row to `connected` and reports success.
#[tracing::instrument(level = "info", skip_all, fields(dataset_id = %id))]
async fn test_connection(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.mark_dataset_connected(id, Utc::now()).await?;
    Ok(Json(
        serde_json::json!({ "status": "connected", "message": "Connection successful" }),
    ))
}

/// GET /api/v1/datasets/{id}/schema — fixed schema document for the sample
/// tables; 404 when the dataset id is unknown.
#[tracing::instrument(level = "debug", skip_all, fields(dataset_id = %id))]
async fn get_schema(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SchemaDoc>, ApiError> {
    if !state.store.dataset_exists(id).await? {
        return Err(sightline_core::Error::NotFound(format!("dataset {id} not found")).into());
    }
    Ok(Json(SchemaDoc::sample()))
}
