//! Store seam between the HTTP layer / engines and a concrete backend.

use crate::models::{
    CustomerRecord, DatasetRecord, MetricRecord, MetricRunRecord, OrderLineRecord, OrderRecord,
    OrderStatus, ProductRecord,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Mutable fields replaced by a metric update. The store bumps `version`
/// by exactly one and `updated_at` to the supplied timestamp.
#[derive(Debug, Clone)]
pub struct MetricUpdate {
    pub name: String,
    pub description: String,
    pub sql_query: String,
    pub category: String,
}

/// The relational store behind the registries, the reporting engine, and
/// the seed loader.
///
/// Each backend owns its SQL dialect; day-bucketed aggregates are returned
/// raw (one row per day with data) and gap-filled by the reporting engine.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Apply the schema. Idempotent; runs before any request is served.
    async fn migrate(&self) -> Result<()>;

    // ── Dataset registry ───────────────────────────────────────

    /// All dataset connections, newest first.
    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>>;

    async fn create_dataset(&self, record: &DatasetRecord) -> Result<()>;

    /// Errors with `NotFound` when no row matched.
    async fn delete_dataset(&self, id: Uuid) -> Result<()>;

    async fn dataset_exists(&self, id: Uuid) -> Result<bool>;

    /// Unconditionally flip the status to connected and bump `updated_at`.
    /// Errors with `NotFound` when no row matched. This is a known stub:
    /// no network connectivity is ever attempted.
    async fn mark_dataset_connected(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    // ── Metric registry ────────────────────────────────────────

    /// All metric definitions, newest first.
    async fn list_metrics(&self) -> Result<Vec<MetricRecord>>;

    async fn get_metric(&self, id: Uuid) -> Result<Option<MetricRecord>>;

    async fn create_metric(&self, record: &MetricRecord) -> Result<()>;

    /// Replace the mutable fields and increment `version` by one. Returns
    /// the updated record; errors with `NotFound` when the id is unknown.
    async fn update_metric(
        &self,
        id: Uuid,
        update: &MetricUpdate,
        at: DateTime<Utc>,
    ) -> Result<MetricRecord>;

    /// Cascades to the metric's result rows. Errors with `NotFound` when
    /// the id is unknown.
    async fn delete_metric(&self, id: Uuid) -> Result<()>;

    /// Append one result row and set the metric's `last_run`. Result rows
    /// are never mutated afterwards.
    async fn record_metric_run(&self, run: &MetricRunRecord) -> Result<()>;

    /// Result rows for one metric, newest first. Used by tests and the
    /// cascade property; not exposed over HTTP.
    async fn list_metric_runs(&self, metric_id: Uuid) -> Result<Vec<MetricRunRecord>>;

    // ── Seed loader ────────────────────────────────────────────

    async fn customer_count(&self) -> Result<i64>;
    async fn insert_customer(&self, record: &CustomerRecord) -> Result<()>;
    async fn insert_product(&self, record: &ProductRecord) -> Result<()>;
    /// Insert an order and its lines atomically.
    async fn insert_order(&self, order: &OrderRecord, lines: &[OrderLineRecord]) -> Result<()>;
    async fn order_line_count(&self, order_id: Uuid) -> Result<i64>;

    // ── Reporting aggregates ───────────────────────────────────

    /// Sum of completed orders' totals placed at or after `since`.
    async fn completed_revenue(&self, since: DateTime<Utc>) -> Result<f64>;

    /// Count of all orders placed at or after `since`.
    async fn order_count(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Distinct customers with at least one order at or after `since`.
    async fn active_customer_count(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Average completed-order total at or after `since`; zero on an empty set.
    async fn avg_completed_order_value(&self, since: DateTime<Utc>) -> Result<f64>;

    /// Completed revenue grouped by calendar day, days without orders absent.
    async fn completed_revenue_by_day(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, f64)>>;

    /// Order counts grouped by status, one entry per status present.
    async fn order_count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(OrderStatus, i64)>>;

    /// Product names with summed quantities across lines of in-window
    /// orders, highest first, capped at `limit`.
    async fn top_products_by_quantity(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(String, i64)>>;

    /// The calendar day of each customer's first order (one entry per
    /// customer that has ordered). Feeds the cumulative growth series.
    async fn customer_first_order_days(&self) -> Result<Vec<NaiveDate>>;
}
