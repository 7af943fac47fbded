//! Postgres-backed `CatalogStore` for multi-node / production deployments.

use crate::config::StoreConfig;
use crate::models::{
    CustomerRecord, DatasetKind, DatasetRecord, DatasetStatus, MetricRecord, MetricRunRecord,
    MetricStatus, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord,
};
use crate::store::traits::{CatalogStore, MetricUpdate};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const MIGRATION_0001: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[tracing::instrument(level = "debug", skip(cfg))]
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .min_connections(cfg.min_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect(&cfg.url)
            .await
            .map_err(|e| Error::backend("connect postgres", e))?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn dataset_from_row(row: &PgRow) -> Result<DatasetRecord> {
        let kind_str: String = row.try_get("kind").map_err(|e| Error::backend("kind", e))?;
        let kind = DatasetKind::parse_str(&kind_str).ok_or_else(|| {
            Error::BackendMessage(format!("invalid dataset kind in db: {kind_str}"))
        })?;
        let status_str: String = row
            .try_get("status")
            .map_err(|e| Error::backend("status", e))?;
        let status = DatasetStatus::parse_str(&status_str).ok_or_else(|| {
            Error::BackendMessage(format!("invalid dataset status in db: {status_str}"))
        })?;

        Ok(DatasetRecord {
            id: row.try_get("id").map_err(|e| Error::backend("id", e))?,
            name: row.try_get("name").map_err(|e| Error::backend("name", e))?,
            kind,
            host: row.try_get("host").map_err(|e| Error::backend("host", e))?,
            port: row.try_get("port").map_err(|e| Error::backend("port", e))?,
            database: row
                .try_get("database_name")
                .map_err(|e| Error::backend("database_name", e))?,
            username: row
                .try_get("username")
                .map_err(|e| Error::backend("username", e))?,
            password: row
                .try_get("password")
                .map_err(|e| Error::backend("password", e))?,
            status,
            tables_count: row
                .try_get("tables_count")
                .map_err(|e| Error::backend("tables_count", e))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| Error::backend("created_at", e))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| Error::backend("updated_at", e))?,
        })
    }

    fn metric_from_row(row: &PgRow) -> Result<MetricRecord> {
        let status_str: String = row
            .try_get("status")
            .map_err(|e| Error::backend("status", e))?;
        let status = MetricStatus::parse_str(&status_str).ok_or_else(|| {
            Error::BackendMessage(format!("invalid metric status in db: {status_str}"))
        })?;

        Ok(MetricRecord {
            id: row.try_get("id").map_err(|e| Error::backend("id", e))?,
            name: row.try_get("name").map_err(|e| Error::backend("name", e))?,
            description: row
                .try_get("description")
                .map_err(|e| Error::backend("description", e))?,
            sql_query: row
                .try_get("sql_query")
                .map_err(|e| Error::backend("sql_query", e))?,
            category: row
                .try_get("category")
                .map_err(|e| Error::backend("category", e))?,
            version: row
                .try_get("version")
                .map_err(|e| Error::backend("version", e))?,
            status,
            created_at: row
                .try_get("created_at")
                .map_err(|e| Error::backend("created_at", e))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| Error::backend("updated_at", e))?,
            last_run: row
                .try_get("last_run")
                .map_err(|e| Error::backend("last_run", e))?,
        })
    }

    fn run_from_row(row: &PgRow) -> Result<MetricRunRecord> {
        Ok(MetricRunRecord {
            id: row.try_get("id").map_err(|e| Error::backend("id", e))?,
            metric_id: row
                .try_get("metric_id")
                .map_err(|e| Error::backend("metric_id", e))?,
            result_data: row
                .try_get("result_data")
                .map_err(|e| Error::backend("result_data", e))?,
            execution_time_ms: row
                .try_get("execution_time_ms")
                .map_err(|e| Error::backend("execution_time_ms", e))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| Error::backend("created_at", e))?,
        })
    }
}

const METRIC_COLUMNS: &str =
    "id, name, description, sql_query, category, version, status, created_at, updated_at, last_run";

const DATASET_COLUMNS: &str = "id, name, kind, host, port, database_name, username, password, \
     status, tables_count, created_at, updated_at";

#[async_trait]
impl CatalogStore for PostgresStore {
    #[tracing::instrument(level = "info", skip(self))]
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_0001)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::backend("apply migrations", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {DATASET_COLUMNS} FROM datasets ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("list datasets", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(Self::dataset_from_row(&r)?);
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self, record))]
    async fn create_dataset(&self, record: &DatasetRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO datasets (id, name, kind, host, port, database_name, username, password,
                                  status, tables_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.kind.as_str())
        .bind(&record.host)
        .bind(record.port)
        .bind(&record.database)
        .bind(&record.username)
        .bind(&record.password)
        .bind(record.status.as_str())
        .bind(record.tables_count)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::backend("create dataset", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_dataset(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::backend("delete dataset", e))?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dataset {id}")));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn dataset_exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM datasets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::backend("dataset exists", e))?;
        Ok(row.is_some())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn mark_dataset_connected(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let res = sqlx::query("UPDATE datasets SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(DatasetStatus::Connected.as_str())
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::backend("mark dataset connected", e))?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dataset {id}")));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_metrics(&self) -> Result<Vec<MetricRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("list metrics", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(Self::metric_from_row(&r)?);
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_metric(&self, id: Uuid) -> Result<Option<MetricRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::backend("get metric", e))?;
        row.as_ref().map(Self::metric_from_row).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self, record))]
    async fn create_metric(&self, record: &MetricRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO metrics (id, name, description, sql_query, category, version, status,
                                 created_at, updated_at, last_run)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.sql_query)
        .bind(&record.category)
        .bind(record.version)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.last_run)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::backend("create metric", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, update))]
    async fn update_metric(
        &self,
        id: Uuid,
        update: &MetricUpdate,
        at: DateTime<Utc>,
    ) -> Result<MetricRecord> {
        let res = sqlx::query(
            r#"
            UPDATE metrics
            SET name = $1, description = $2, sql_query = $3, category = $4,
                version = version + 1, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.sql_query)
        .bind(&update.category)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::backend("update metric", e))?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("metric {id}")));
        }

        self.get_metric(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("metric {id}")))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_metric(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM metrics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::backend("delete metric", e))?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("metric {id}")));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, run))]
    async fn record_metric_run(&self, run: &MetricRunRecord) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::backend("begin metric run tx", e))?;

        sqlx::query(
            r#"
            INSERT INTO metric_results (id, metric_id, result_data, execution_time_ms, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(run.id)
        .bind(run.metric_id)
        .bind(&run.result_data)
        .bind(run.execution_time_ms)
        .bind(run.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::backend("insert metric result", e))?;

        sqlx::query("UPDATE metrics SET last_run = $1 WHERE id = $2")
            .bind(run.created_at)
            .bind(run.metric_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::backend("set metric last_run", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::backend("commit metric run tx", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_metric_runs(&self, metric_id: Uuid) -> Result<Vec<MetricRunRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, metric_id, result_data, execution_time_ms, created_at
            FROM metric_results
            WHERE metric_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(metric_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("list metric runs", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(Self::run_from_row(&r)?);
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn customer_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM customers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::backend("customer count", e))?;
        row.try_get("count").map_err(|e| Error::backend("count", e))
    }

    #[tracing::instrument(level = "debug", skip(self, record))]
    async fn insert_customer(&self, record: &CustomerRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, email, first_name, last_name, created_at, last_login, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.email)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.created_at)
        .bind(record.last_login)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::backend("insert customer", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, record))]
    async fn insert_product(&self, record: &ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, stock_quantity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.price)
        .bind(&record.category)
        .bind(record.stock_quantity)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::backend("insert product", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, order, lines))]
    async fn insert_order(&self, order: &OrderRecord, lines: &[OrderLineRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::backend("begin order tx", e))?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, total_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::backend("insert order", e))?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id)
            .bind(line.order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::backend("insert order line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::backend("commit order tx", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn order_line_count(&self, order_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM order_lines WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::backend("order line count", e))?;
        row.try_get("count").map_err(|e| Error::backend("count", e))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn completed_revenue(&self, since: DateTime<Utc>) -> Result<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)::DOUBLE PRECISION AS total
            FROM orders
            WHERE status = 'completed' AND created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::backend("completed revenue", e))?;
        row.try_get("total").map_err(|e| Error::backend("total", e))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn order_count(&self, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM orders WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::backend("order count", e))?;
        row.try_get("count").map_err(|e| Error::backend("count", e))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn active_customer_count(&self, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT customer_id) AS count FROM orders WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::backend("active customer count", e))?;
        row.try_get("count").map_err(|e| Error::backend("count", e))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn avg_completed_order_value(&self, since: DateTime<Utc>) -> Result<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(AVG(total_amount), 0)::DOUBLE PRECISION AS avg
            FROM orders
            WHERE status = 'completed' AND created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::backend("avg order value", e))?;
        row.try_get("avg").map_err(|e| Error::backend("avg", e))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn completed_revenue_by_day(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let rows = sqlx::query(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   SUM(total_amount)::DOUBLE PRECISION AS revenue
            FROM orders
            WHERE status = 'completed' AND created_at >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("revenue by day", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let day: NaiveDate = r.try_get("day").map_err(|e| Error::backend("day", e))?;
            let revenue: f64 = r
                .try_get("revenue")
                .map_err(|e| Error::backend("revenue", e))?;
            out.push((day, revenue));
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn order_count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(OrderStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM orders WHERE created_at >= $1 GROUP BY status",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("orders by status", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let status_str: String = r.try_get("status").map_err(|e| Error::backend("status", e))?;
            let status = OrderStatus::parse_str(&status_str).ok_or_else(|| {
                Error::BackendMessage(format!("invalid order status in db: {status_str}"))
            })?;
            let count: i64 = r.try_get("count").map_err(|e| Error::backend("count", e))?;
            out.push((status, count));
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn top_products_by_quantity(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT p.name AS name, SUM(ol.quantity) AS quantity
            FROM products p
            JOIN order_lines ol ON p.id = ol.product_id
            JOIN orders o ON ol.order_id = o.id
            WHERE o.created_at >= $1
            GROUP BY p.id, p.name
            ORDER BY quantity DESC, p.id
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("top products", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let name: String = r.try_get("name").map_err(|e| Error::backend("name", e))?;
            let quantity: i64 = r
                .try_get("quantity")
                .map_err(|e| Error::backend("quantity", e))?;
            out.push((name, quantity));
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn customer_first_order_days(&self) -> Result<Vec<NaiveDate>> {
        let rows = sqlx::query(
            r#"
            SELECT (MIN(created_at) AT TIME ZONE 'UTC')::date AS day
            FROM orders
            GROUP BY customer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::backend("first order days", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(r.try_get("day").map_err(|e| Error::backend("day", e))?);
        }
        Ok(out)
    }
}
