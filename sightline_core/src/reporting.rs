//! Dashboard and chart aggregation over the sample e-commerce tables.
//!
//! The engine is stateless: every call derives its trailing window from the
//! current clock and issues one grouped aggregate per series, then fills
//! day gaps with zeros. Buckets are whole calendar days of the server
//! clock (UTC, matching how every timestamp is stored), oldest first,
//! today inclusive.

use crate::config::ReportingConfig;
use crate::models::OrderStatus;
use crate::store::traits::CatalogStore;
use crate::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const TOP_PRODUCTS_LIMIT: i64 = 5;
const PRODUCT_NAME_MAX: usize = 15;

/// Windowed KPI aggregates for the dashboard. All values are zero when no
/// orders fall inside the window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_revenue: f64,
    pub total_orders: i64,
    pub active_customers: i64,
    pub avg_order_value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenuePoint {
    pub date: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductSales {
    pub name: String,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GrowthPoint {
    pub date: String,
    pub users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub revenue_trend: Vec<RevenuePoint>,
    pub orders_by_status: Vec<StatusCount>,
    pub top_products: Vec<ProductSales>,
    pub user_growth: Vec<GrowthPoint>,
}

#[derive(Clone)]
pub struct ReportingEngine {
    store: Arc<dyn CatalogStore>,
    config: ReportingConfig,
}

impl ReportingEngine {
    pub fn new(store: Arc<dyn CatalogStore>, config: ReportingConfig) -> Self {
        Self { store, config }
    }

    /// The window's day buckets, oldest first, ending at `today`.
    fn window_buckets(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let days = i64::from(self.config.window_days);
        (0..days)
            .rev()
            .map(|offset| today - Duration::days(offset))
            .collect()
    }

    fn window_start(&self, today: NaiveDate) -> DateTime<Utc> {
        let first = today - Duration::days(i64::from(self.config.window_days) - 1);
        first.and_time(NaiveTime::MIN).and_utc()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        let since = self.window_start(Utc::now().date_naive());
        Ok(DashboardSummary {
            total_revenue: self.store.completed_revenue(since).await?,
            total_orders: self.store.order_count(since).await?,
            active_customers: self.store.active_customer_count(since).await?,
            avg_order_value: self.store.avg_completed_order_value(since).await?,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn chart_series(&self) -> Result<ChartSeries> {
        let today = Utc::now().date_naive();
        let buckets = self.window_buckets(today);
        let since = self.window_start(today);

        // Revenue per day: grouped query, then zero-fill the gaps.
        let revenue_rows: HashMap<NaiveDate, f64> = self
            .store
            .completed_revenue_by_day(since)
            .await?
            .into_iter()
            .collect();
        let revenue_trend = buckets
            .iter()
            .map(|day| RevenuePoint {
                date: bucket_label(*day),
                revenue: revenue_rows.get(day).copied().unwrap_or(0.0),
            })
            .collect();

        let orders_by_status = self
            .store
            .order_count_by_status(since)
            .await?
            .into_iter()
            .map(|(status, count)| StatusCount {
                name: status.display().to_string(),
                value: count,
            })
            .collect();

        let top_products = self
            .store
            .top_products_by_quantity(since, TOP_PRODUCTS_LIMIT)
            .await?
            .into_iter()
            .map(|(name, sales)| ProductSales {
                name: truncate_name(&name),
                sales,
            })
            .collect();

        // Cumulative distinct customers with an order on or before each
        // bucket day. Non-decreasing by construction.
        let mut first_days = self.store.customer_first_order_days().await?;
        first_days.sort_unstable();
        let user_growth = buckets
            .iter()
            .map(|day| GrowthPoint {
                date: bucket_label(*day),
                users: first_days.partition_point(|d| d <= day) as i64,
            })
            .collect();

        Ok(ChartSeries {
            revenue_trend,
            orders_by_status,
            top_products,
            user_growth,
        })
    }
}

fn bucket_label(day: NaiveDate) -> String {
    day.format("%m/%d").to_string()
}

/// Display truncation for long product names.
fn truncate_name(name: &str) -> String {
    if name.chars().count() > PRODUCT_NAME_MAX {
        let short: String = name.chars().take(PRODUCT_NAME_MAX).collect();
        format!("{short}...")
    } else {
        name.to_string()
    }
}
