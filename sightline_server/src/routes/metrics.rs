//! Metric registry routes plus the dashboard/chart reporting endpoints.

use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Path;
use axum::routing::{get, post, put};
use axum::{Extension, Json};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sightline_core::models::{MetricRecord, MetricRunRecord, MetricStatus};
use sightline_core::reporting::ChartSeries;
use sightline_core::store::traits::MetricUpdate;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MetricCreate {
    pub name: String,
    pub description: String,
    pub sql_query: String,
    pub category: String,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/metrics", get(list_metrics).post(create_metric))
        .route("/metrics/dashboard", get(get_dashboard))
        .route("/metrics/charts", get(get_charts))
        .route(
            "/metrics/{id}",
            put(update_metric).delete(delete_metric),
        )
        .route("/metrics/{id}/run", post(run_metric))
}

/// GET /api/v1/metrics — all metric definitions, newest first.
#[tracing::instrument(level = "debug", skip_all)]
async fn list_metrics(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<MetricRecord>>, ApiError> {
    Ok(Json(state.store.list_metrics().await?))
}

/// POST /api/v1/metrics — new definition at version 1, status `active`.
/// `sql_query` is opaque text; nothing validates or executes it.
#[tracing::instrument(level = "info", skip_all)]
async fn create_metric(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<MetricCreate>,
) -> Result<Json<MetricRecord>, ApiError> {
    let now = Utc::now();
    let record = MetricRecord {
        id: Uuid::new_v4(),
        name: body.name,
        description: body.description,
        sql_query: body.sql_query,
        category: body.category,
        version: 1,
        status: MetricStatus::Active,
        created_at: now,
        updated_at: now,
        last_run: None,
    };
    state.store.create_metric(&record).await?;
    Ok(Json(record))
}

/// PUT /api/v1/metrics/{id} — replace the mutable fields; the store bumps
/// `version` by one.
#[tracing::instrument(level = "info", skip_all, fields(metric_id = %id))]
async fn update_metric(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MetricCreate>,
) -> Result<Json<MetricRecord>, ApiError> {
    let update = MetricUpdate {
        name: body.name,
        description: body.description,
        sql_query: body.sql_query,
        category: body.category,
    };
    let updated = state.store.update_metric(id, &update, Utc::now()).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/metrics/{id} — cascades to stored results.
#[tracing::instrument(level = "info", skip_all, fields(metric_id = %id))]
async fn delete_metric(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_metric(id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Metric deleted successfully" }),
    ))
}

/// POST /api/v1/metrics/{id}/run — simulated execution: synthesizes a
/// random value echoing the stored query, appends a result row, and stamps
/// `last_run`. Real execution against a registered dataset is out of scope.
#[tracing::instrument(level = "info", skip_all, fields(metric_id = %id))]
async fn run_metric(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let metric = state
        .store
        .get_metric(id)
        .await?
        .ok_or_else(|| sightline_core::Error::NotFound(format!("metric {id} not found")))?;

    let now = Utc::now();
    let (value, execution_time_ms) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(100..=10_000), rng.gen_range(50..=500))
    };
    let sample_result = serde_json::json!({
        "value": value,
        "timestamp": now.to_rfc3339(),
        "query_executed": metric.sql_query,
    });

    let run = MetricRunRecord {
        id: Uuid::new_v4(),
        metric_id: id,
        result_data: sample_result.clone(),
        execution_time_ms,
        created_at: now,
    };
    state.store.record_metric_run(&run).await?;

    Ok(Json(serde_json::json!({
        "message": "Metric executed successfully",
        "result": sample_result,
    })))
}

/// GET /api/v1/metrics/dashboard — windowed KPI summary, display-formatted.
#[tracing::instrument(level = "debug", skip_all)]
async fn get_dashboard(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.reporting.dashboard_summary().await?;
    Ok(Json(serde_json::json!({
        "total_revenue": format_currency(summary.total_revenue),
        "total_orders": format_count(summary.total_orders),
        "active_users": format_count(summary.active_customers),
        "avg_order_value": format!("${:.2}", summary.avg_order_value),
    })))
}

/// GET /api/v1/metrics/charts — the four dashboard chart series.
#[tracing::instrument(level = "debug", skip_all)]
async fn get_charts(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ChartSeries>, ApiError> {
    Ok(Json(state.reporting.chart_series().await?))
}

fn group_thousands(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(number.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}

fn format_count(n: i64) -> String {
    group_thousands(&n.to_string())
}

fn format_currency(amount: f64) -> String {
    let fixed = format!("{amount:.2}");
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("${}.{frac}", group_thousands(int_part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_group_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn grouping_keeps_the_sign_out_of_the_digits() {
        assert_eq!(format_count(-123), "-123");
        assert_eq!(format_count(-123_456), "-123,456");
        assert_eq!(format_count(-1_000), "-1,000");
    }

    #[test]
    fn currency_groups_and_keeps_two_decimals() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(999999.999), "$1,000,000.00");
    }
}
