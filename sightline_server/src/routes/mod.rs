use axum::routing::get;
use axum::Router;

pub mod chat;
pub mod datasets;
pub mod health;
pub mod metrics;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .route("/health", get(health::get_health))
            .merge(datasets::router())
            .merge(metrics::router())
            .merge(chat::router()),
    )
}

#[cfg(test)]
mod tests {
    use crate::server::{router, AppState};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use sightline_core::config::ReportingConfig;
    use sightline_core::reporting::ReportingEngine;
    use sightline_core::store::sqlite::SqliteStore;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("api.db")).await.unwrap());
        let reporting = ReportingEngine::new(store.clone(), ReportingConfig::default());
        (dir, router(AppState::new(store, reporting)))
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok_at_root_and_api_paths() {
        let (_dir, app) = test_app().await;
        for uri in ["/health", "/api/v1/health"] {
            let resp = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body = body_json(resp).await;
            assert_eq!(body["status"], "ok");
        }
    }

    #[tokio::test]
    async fn deleting_unknown_dataset_returns_404_error_body() {
        let (_dir, app) = test_app().await;
        let uri = format!("/api/v1/datasets/{}", Uuid::new_v4());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn dataset_create_validates_input_and_hides_password() {
        let (_dir, app) = test_app().await;

        let bad_type = json_request(
            "POST",
            "/api/v1/datasets",
            serde_json::json!({
                "name": "warehouse", "type": "oracle", "host": "db.internal",
                "port": 5432, "database": "wh", "username": "svc", "password": "s3cret"
            }),
        );
        let resp = app.clone().oneshot(bad_type).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bad_port = json_request(
            "POST",
            "/api/v1/datasets",
            serde_json::json!({
                "name": "warehouse", "type": "postgresql", "host": "db.internal",
                "port": 0, "database": "wh", "username": "svc", "password": "s3cret"
            }),
        );
        let resp = app.clone().oneshot(bad_port).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let ok = json_request(
            "POST",
            "/api/v1/datasets",
            serde_json::json!({
                "name": "warehouse", "type": "postgresql", "host": "db.internal",
                "port": 5432, "database": "wh", "username": "svc", "password": "s3cret"
            }),
        );
        let resp = app.clone().oneshot(ok).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "connected");
        assert!(!body.to_string().contains("s3cret"));

        let resp = app.oneshot(get_request("/api/v1/datasets")).await.unwrap();
        let body = body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert!(!body.to_string().contains("s3cret"));
    }

    #[tokio::test]
    async fn schema_is_fixed_but_requires_a_known_dataset() {
        let (_dir, app) = test_app().await;

        let uri = format!("/api/v1/datasets/{}/schema", Uuid::new_v4());
        let resp = app.clone().oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let create = json_request(
            "POST",
            "/api/v1/datasets",
            serde_json::json!({
                "name": "warehouse", "type": "mysql", "host": "db.internal",
                "port": 3306, "database": "wh", "username": "svc", "password": "pw"
            }),
        );
        let created = body_json(app.clone().oneshot(create).await.unwrap()).await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(get_request(&format!("/api/v1/datasets/{id}/schema")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let tables = body["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0]["name"], "customers");
    }

    #[tokio::test]
    async fn metric_create_update_run_scenario() {
        let (_dir, app) = test_app().await;

        let create = json_request(
            "POST",
            "/api/v1/metrics",
            serde_json::json!({
                "name": "Monthly Revenue",
                "description": "Completed revenue per month",
                "sql_query": "SELECT SUM(total_amount) FROM orders",
                "category": "finance"
            }),
        );
        let resp = app.clone().oneshot(create).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        assert_eq!(created["version"], 1);
        assert_eq!(created["status"], "active");
        assert!(created["last_run"].is_null());
        let id = created["id"].as_str().unwrap().to_string();

        let update = json_request(
            "PUT",
            &format!("/api/v1/metrics/{id}"),
            serde_json::json!({
                "name": "Monthly Revenue",
                "description": "Completed revenue per calendar month",
                "sql_query": "SELECT SUM(total_amount) FROM orders WHERE status = 'completed'",
                "category": "finance"
            }),
        );
        let updated = body_json(app.clone().oneshot(update).await.unwrap()).await;
        assert_eq!(updated["version"], 2);

        let run = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/metrics/{id}/run"))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(run).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Metric executed successfully");
        let value = body["result"]["value"].as_i64().unwrap();
        assert!((100..=10_000).contains(&value));
        assert!(body["result"]["query_executed"]
            .as_str()
            .unwrap()
            .contains("completed"));

        let listed = body_json(app.oneshot(get_request("/api/v1/metrics")).await.unwrap()).await;
        assert!(!listed[0]["last_run"].is_null());
    }

    #[tokio::test]
    async fn running_unknown_metric_is_404() {
        let (_dir, app) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/metrics/{}/run", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_dashboard_formats_zero_strings() {
        let (_dir, app) = test_app().await;
        let resp = app
            .oneshot(get_request("/api/v1/metrics/dashboard"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["total_revenue"], "$0.00");
        assert_eq!(body["total_orders"], "0");
        assert_eq!(body["active_users"], "0");
        assert_eq!(body["avg_order_value"], "$0.00");
        // The payload keys are a published contract for dashboard consumers.
        assert!(body.get("active_users").is_some());
        assert!(body.get("active_customers").is_none());
    }

    #[tokio::test]
    async fn charts_cover_full_window_on_empty_store() {
        let (_dir, app) = test_app().await;
        let resp = app
            .oneshot(get_request("/api/v1/metrics/charts"))
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["revenue_trend"].as_array().unwrap().len(), 30);
        assert_eq!(body["user_growth"].as_array().unwrap().len(), 30);
        assert!(body["orders_by_status"].as_array().unwrap().is_empty());
        assert!(body["top_products"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_matches_revenue_before_customers() {
        let (_dir, app) = test_app().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/chat",
                serde_json::json!({ "message": "show revenue for my customers" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["response"].as_str().unwrap().contains("revenue"));
        assert!(body["sql_query"]
            .as_str()
            .unwrap()
            .contains("SUM(total_amount)"));
        assert_eq!(body["chart_data"]["type"], "line");
    }
}
