//! SQLite-backed `CatalogStore`.
//!
//! Single WAL-mode file, suitable for single-node / local development runs
//! and for tests. For multi-node production use the Postgres impl.

use crate::models::{
    CustomerRecord, DatasetKind, DatasetRecord, DatasetStatus, MetricRecord, MetricRunRecord,
    MetricStatus, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord,
};
use crate::store::traits::{CatalogStore, MetricUpdate};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create (or open) a SQLite store at the given file path.
    ///
    /// Creates the file and parent directories if they don't exist and
    /// applies the schema.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::backend("sqlite_store", e))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path.display()))
            .map_err(|e| Error::backend("sqlite_store", e))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| Error::backend("sqlite_store", e))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    host TEXT NOT NULL,
    port INTEGER NOT NULL,
    database_name TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'disconnected',
    tables_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS metrics (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    sql_query TEXT NOT NULL,
    category TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_run TEXT
);

CREATE TABLE IF NOT EXISTS metric_results (
    id TEXT PRIMARY KEY,
    metric_id TEXT NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
    result_data TEXT NOT NULL,
    execution_time_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price REAL NOT NULL,
    category TEXT NOT NULL,
    stock_quantity INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES customers(id),
    total_amount REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_lines (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    product_id TEXT NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    unit_price REAL NOT NULL,
    total_price REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_metric_results_metric_id ON metric_results(metric_id);
CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);
CREATE INDEX IF NOT EXISTS idx_order_lines_order_id ON order_lines(order_id);
"#;

// ── Helpers ─────────────────────────────────────────────────────

fn db_err(e: sqlx::Error) -> Error {
    Error::backend("sqlite_store", e)
}

fn parse_id(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or(Uuid::nil())
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now())
}

/// Fixed-width RFC 3339 with microseconds so lexicographic TEXT comparison
/// matches chronological order.
fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::backend(format!("parse day {s:?}"), e))
}

fn dataset_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<DatasetRecord> {
    let kind_str: String = r.get("kind");
    let kind = DatasetKind::parse_str(&kind_str)
        .ok_or_else(|| Error::BackendMessage(format!("invalid dataset kind in db: {kind_str}")))?;
    let status_str: String = r.get("status");
    let status = DatasetStatus::parse_str(&status_str).ok_or_else(|| {
        Error::BackendMessage(format!("invalid dataset status in db: {status_str}"))
    })?;

    let id: String = r.get("id");
    let created_at: String = r.get("created_at");
    let updated_at: String = r.get("updated_at");
    Ok(DatasetRecord {
        id: parse_id(&id),
        name: r.get("name"),
        kind,
        host: r.get("host"),
        port: r.get("port"),
        database: r.get("database_name"),
        username: r.get("username"),
        password: r.get("password"),
        status,
        tables_count: r.get("tables_count"),
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
    })
}

fn metric_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<MetricRecord> {
    let status_str: String = r.get("status");
    let status = MetricStatus::parse_str(&status_str).ok_or_else(|| {
        Error::BackendMessage(format!("invalid metric status in db: {status_str}"))
    })?;

    let id: String = r.get("id");
    let created_at: String = r.get("created_at");
    let updated_at: String = r.get("updated_at");
    let last_run: Option<String> = r.get("last_run");
    Ok(MetricRecord {
        id: parse_id(&id),
        name: r.get("name"),
        description: r.get("description"),
        sql_query: r.get("sql_query"),
        category: r.get("category"),
        version: r.get("version"),
        status,
        created_at: parse_dt(&created_at),
        updated_at: parse_dt(&updated_at),
        last_run: last_run.as_deref().map(parse_dt),
    })
}

fn run_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<MetricRunRecord> {
    let id: String = r.get("id");
    let metric_id: String = r.get("metric_id");
    let result_json: String = r.get("result_data");
    let created_at: String = r.get("created_at");
    Ok(MetricRunRecord {
        id: parse_id(&id),
        metric_id: parse_id(&metric_id),
        result_data: serde_json::from_str(&result_json)
            .map_err(|e| Error::backend("decode result_data", e))?,
        execution_time_ms: r.get("execution_time_ms"),
        created_at: parse_dt(&created_at),
    })
}

const METRIC_COLUMNS: &str =
    "id, name, description, sql_query, category, version, status, created_at, updated_at, last_run";

// ── CatalogStore impl ───────────────────────────────────────────

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::backend("sqlite_store_migration", e))?;
        Ok(())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, kind, host, port, database_name, username, password, status,
                    tables_count, created_at, updated_at
             FROM datasets ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(dataset_from_row).collect()
    }

    async fn create_dataset(&self, record: &DatasetRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO datasets (id, name, kind, host, port, database_name, username, password,
                                   status, tables_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(record.kind.as_str())
        .bind(&record.host)
        .bind(record.port)
        .bind(&record.database)
        .bind(&record.username)
        .bind(&record.password)
        .bind(record.status.as_str())
        .bind(record.tables_count)
        .bind(fmt_dt(record.created_at))
        .bind(fmt_dt(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_dataset(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM datasets WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dataset {id}")));
        }
        Ok(())
    }

    async fn dataset_exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM datasets WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn mark_dataset_connected(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let res = sqlx::query("UPDATE datasets SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(DatasetStatus::Connected.as_str())
            .bind(fmt_dt(at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dataset {id}")));
        }
        Ok(())
    }

    async fn list_metrics(&self) -> Result<Vec<MetricRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(metric_from_row).collect()
    }

    async fn get_metric(&self, id: Uuid) -> Result<Option<MetricRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(metric_from_row).transpose()
    }

    async fn create_metric(&self, record: &MetricRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO metrics (id, name, description, sql_query, category, version, status,
                                  created_at, updated_at, last_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.sql_query)
        .bind(&record.category)
        .bind(record.version)
        .bind(record.status.as_str())
        .bind(fmt_dt(record.created_at))
        .bind(fmt_dt(record.updated_at))
        .bind(record.last_run.map(fmt_dt))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_metric(
        &self,
        id: Uuid,
        update: &MetricUpdate,
        at: DateTime<Utc>,
    ) -> Result<MetricRecord> {
        let res = sqlx::query(
            "UPDATE metrics
             SET name = ?1, description = ?2, sql_query = ?3, category = ?4,
                 version = version + 1, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.sql_query)
        .bind(&update.category)
        .bind(fmt_dt(at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("metric {id}")));
        }

        self.get_metric(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("metric {id}")))
    }

    async fn delete_metric(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM metrics WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("metric {id}")));
        }
        Ok(())
    }

    async fn record_metric_run(&self, run: &MetricRunRecord) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO metric_results (id, metric_id, result_data, execution_time_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(run.id.to_string())
        .bind(run.metric_id.to_string())
        .bind(run.result_data.to_string())
        .bind(run.execution_time_ms)
        .bind(fmt_dt(run.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("UPDATE metrics SET last_run = ?1 WHERE id = ?2")
            .bind(fmt_dt(run.created_at))
            .bind(run.metric_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_metric_runs(&self, metric_id: Uuid) -> Result<Vec<MetricRunRecord>> {
        let rows = sqlx::query(
            "SELECT id, metric_id, result_data, execution_time_ms, created_at
             FROM metric_results WHERE metric_id = ?1 ORDER BY created_at DESC",
        )
        .bind(metric_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(run_from_row).collect()
    }

    async fn customer_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM customers")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.get("count"))
    }

    async fn insert_customer(&self, record: &CustomerRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO customers (id, email, first_name, last_name, created_at, last_login, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(record.id.to_string())
        .bind(&record.email)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(fmt_dt(record.created_at))
        .bind(record.last_login.map(fmt_dt))
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_product(&self, record: &ProductRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, category, stock_quantity, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.price)
        .bind(&record.category)
        .bind(record.stock_quantity)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_order(&self, order: &OrderRecord, lines: &[OrderLineRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, total_amount, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(order.id.to_string())
        .bind(order.customer_id.to_string())
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(fmt_dt(order.created_at))
        .bind(fmt_dt(order.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for line in lines {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price, total_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(line.id.to_string())
            .bind(line.order_id.to_string())
            .bind(line.product_id.to_string())
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn order_line_count(&self, order_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM order_lines WHERE order_id = ?1")
            .bind(order_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.get("count"))
    }

    async fn completed_revenue(&self, since: DateTime<Utc>) -> Result<f64> {
        let row = sqlx::query(
            "SELECT CAST(COALESCE(SUM(total_amount), 0) AS REAL) AS total
             FROM orders WHERE status = 'completed' AND created_at >= ?1",
        )
        .bind(fmt_dt(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get("total"))
    }

    async fn order_count(&self, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM orders WHERE created_at >= ?1")
            .bind(fmt_dt(since))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.get("count"))
    }

    async fn active_customer_count(&self, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT customer_id) AS count FROM orders WHERE created_at >= ?1",
        )
        .bind(fmt_dt(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get("count"))
    }

    async fn avg_completed_order_value(&self, since: DateTime<Utc>) -> Result<f64> {
        let row = sqlx::query(
            "SELECT CAST(COALESCE(AVG(total_amount), 0) AS REAL) AS avg
             FROM orders WHERE status = 'completed' AND created_at >= ?1",
        )
        .bind(fmt_dt(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get("avg"))
    }

    async fn completed_revenue_by_day(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let rows = sqlx::query(
            "SELECT date(created_at) AS day, CAST(SUM(total_amount) AS REAL) AS revenue
             FROM orders
             WHERE status = 'completed' AND created_at >= ?1
             GROUP BY day
             ORDER BY day",
        )
        .bind(fmt_dt(since))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let day: String = r.get("day");
            out.push((parse_day(&day)?, r.get("revenue")));
        }
        Ok(out)
    }

    async fn order_count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(OrderStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM orders WHERE created_at >= ?1 GROUP BY status",
        )
        .bind(fmt_dt(since))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let status_str: String = r.get("status");
            let status = OrderStatus::parse_str(&status_str).ok_or_else(|| {
                Error::BackendMessage(format!("invalid order status in db: {status_str}"))
            })?;
            out.push((status, r.get("count")));
        }
        Ok(out)
    }

    async fn top_products_by_quantity(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT p.name AS name, SUM(ol.quantity) AS quantity
             FROM products p
             JOIN order_lines ol ON p.id = ol.product_id
             JOIN orders o ON ol.order_id = o.id
             WHERE o.created_at >= ?1
             GROUP BY p.id, p.name
             ORDER BY quantity DESC, p.id
             LIMIT ?2",
        )
        .bind(fmt_dt(since))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|r| (r.get("name"), r.get("quantity")))
            .collect())
    }

    async fn customer_first_order_days(&self) -> Result<Vec<NaiveDate>> {
        let rows = sqlx::query(
            "SELECT date(MIN(created_at)) AS day FROM orders GROUP BY customer_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let day: String = r.get("day");
            out.push(parse_day(&day)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::new(dir.path().join("test.db"))
            .await
            .expect("open store");
        (dir, store)
    }

    fn metric(name: &str) -> MetricRecord {
        let now = Utc::now();
        MetricRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "d".to_string(),
            sql_query: "SELECT 1".to_string(),
            category: "c".to_string(),
            version: 1,
            status: MetricStatus::Active,
            created_at: now,
            updated_at: now,
            last_run: None,
        }
    }

    fn dataset(name: &str) -> DatasetRecord {
        let now = Utc::now();
        DatasetRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: DatasetKind::Postgresql,
            host: "db.internal".to_string(),
            port: 5432,
            database: "analytics".to_string(),
            username: "reader".to_string(),
            password: "hunter2".to_string(),
            status: DatasetStatus::Connected,
            tables_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(email: &str) -> CustomerRecord {
        CustomerRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "Customer".to_string(),
            created_at: Utc::now(),
            last_login: None,
            is_active: true,
        }
    }

    fn product(name: &str, price: f64) -> ProductRecord {
        ProductRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price,
            category: "Test".to_string(),
            stock_quantity: 10,
            is_active: true,
        }
    }

    fn order(
        customer_id: Uuid,
        status: OrderStatus,
        total: f64,
        at: DateTime<Utc>,
    ) -> OrderRecord {
        OrderRecord {
            id: Uuid::new_v4(),
            customer_id,
            total_amount: total,
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn metric_starts_at_version_one_and_updates_increment() {
        let (_dir, store) = test_store().await;
        let m = metric("Revenue");
        store.create_metric(&m).await.unwrap();

        let stored = store.get_metric(m.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, MetricStatus::Active);

        let update = MetricUpdate {
            name: "Revenue".to_string(),
            description: "d".to_string(),
            sql_query: "SELECT 2".to_string(),
            category: "c".to_string(),
        };
        for expected in 2..=4 {
            let updated = store.update_metric(m.id, &update, Utc::now()).await.unwrap();
            assert_eq!(updated.version, expected);
        }
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_metric_are_not_found() {
        let (_dir, store) = test_store().await;
        let update = MetricUpdate {
            name: "x".to_string(),
            description: String::new(),
            sql_query: "SELECT 1".to_string(),
            category: "c".to_string(),
        };
        let err = store
            .update_metric(Uuid::new_v4(), &update, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = store.delete_metric(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_metric_cascades_to_results() {
        let (_dir, store) = test_store().await;
        let m = metric("Churn");
        store.create_metric(&m).await.unwrap();

        let run = MetricRunRecord {
            id: Uuid::new_v4(),
            metric_id: m.id,
            result_data: serde_json::json!({"value": 42}),
            execution_time_ms: 120,
            created_at: Utc::now(),
        };
        store.record_metric_run(&run).await.unwrap();
        assert_eq!(store.list_metric_runs(m.id).await.unwrap().len(), 1);

        let stored = store.get_metric(m.id).await.unwrap().unwrap();
        assert!(stored.last_run.is_some());

        store.delete_metric(m.id).await.unwrap();
        assert!(store.list_metric_runs(m.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_order_cascades_to_lines() {
        let (_dir, store) = test_store().await;
        let c = customer("cascade@example.com");
        store.insert_customer(&c).await.unwrap();
        let p = product("Widget", 10.0);
        store.insert_product(&p).await.unwrap();

        let o = order(c.id, OrderStatus::Completed, 20.0, Utc::now());
        let lines = vec![OrderLineRecord {
            id: Uuid::new_v4(),
            order_id: o.id,
            product_id: p.id,
            quantity: 2,
            unit_price: 10.0,
            total_price: 20.0,
        }];
        store.insert_order(&o, &lines).await.unwrap();
        assert_eq!(store.order_line_count(o.id).await.unwrap(), 1);

        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(o.id.to_string())
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(store.order_line_count(o.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dataset_delete_of_unknown_id_is_not_found() {
        let (_dir, store) = test_store().await;
        let err = store.delete_dataset(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn dataset_roundtrip_and_test_connection() {
        let (_dir, store) = test_store().await;
        let d = dataset("warehouse");
        store.create_dataset(&d).await.unwrap();

        let listed = store.list_datasets().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "warehouse");
        assert_eq!(listed[0].kind, DatasetKind::Postgresql);

        store
            .mark_dataset_connected(d.id, Utc::now())
            .await
            .unwrap();
        assert!(store.dataset_exists(d.id).await.unwrap());

        store.delete_dataset(d.id).await.unwrap();
        assert!(!store.dataset_exists(d.id).await.unwrap());
    }

    #[tokio::test]
    async fn empty_window_aggregates_are_zero() {
        let (_dir, store) = test_store().await;
        let since = Utc::now() - Duration::days(30);
        assert_eq!(store.completed_revenue(since).await.unwrap(), 0.0);
        assert_eq!(store.order_count(since).await.unwrap(), 0);
        assert_eq!(store.active_customer_count(since).await.unwrap(), 0);
        assert_eq!(store.avg_completed_order_value(since).await.unwrap(), 0.0);
        assert!(store.completed_revenue_by_day(since).await.unwrap().is_empty());
        assert!(store.order_count_by_status(since).await.unwrap().is_empty());
        assert!(store
            .top_products_by_quantity(since, 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn windowed_aggregates_count_only_matching_orders() {
        let (_dir, store) = test_store().await;
        let c = customer("agg@example.com");
        store.insert_customer(&c).await.unwrap();

        let now = Utc::now();
        // In-window completed, in-window pending, out-of-window completed.
        store
            .insert_order(&order(c.id, OrderStatus::Completed, 100.0, now), &[])
            .await
            .unwrap();
        store
            .insert_order(&order(c.id, OrderStatus::Pending, 50.0, now), &[])
            .await
            .unwrap();
        store
            .insert_order(
                &order(c.id, OrderStatus::Completed, 999.0, now - Duration::days(60)),
                &[],
            )
            .await
            .unwrap();

        let since = now - Duration::days(30);
        assert_eq!(store.completed_revenue(since).await.unwrap(), 100.0);
        assert_eq!(store.order_count(since).await.unwrap(), 2);
        assert_eq!(store.active_customer_count(since).await.unwrap(), 1);
        assert_eq!(store.avg_completed_order_value(since).await.unwrap(), 100.0);

        let by_status = store.order_count_by_status(since).await.unwrap();
        assert_eq!(by_status.len(), 2);
        for (status, count) in by_status {
            match status {
                OrderStatus::Completed | OrderStatus::Pending => assert_eq!(count, 1),
                other => panic!("unexpected status {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn revenue_by_day_buckets_on_calendar_date() {
        let (_dir, store) = test_store().await;
        let c = customer("days@example.com");
        store.insert_customer(&c).await.unwrap();

        let now = Utc::now();
        store
            .insert_order(&order(c.id, OrderStatus::Completed, 100.0, now), &[])
            .await
            .unwrap();

        let buckets = store
            .completed_revenue_by_day(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].0, now.date_naive());
        assert_eq!(buckets[0].1, 100.0);
    }

    #[tokio::test]
    async fn first_order_day_is_per_customer_minimum() {
        let (_dir, store) = test_store().await;
        let c = customer("growth@example.com");
        store.insert_customer(&c).await.unwrap();

        let now = Utc::now();
        store
            .insert_order(
                &order(c.id, OrderStatus::Completed, 10.0, now - Duration::days(5)),
                &[],
            )
            .await
            .unwrap();
        store
            .insert_order(&order(c.id, OrderStatus::Pending, 20.0, now), &[])
            .await
            .unwrap();

        let days = store.customer_first_order_days().await.unwrap();
        assert_eq!(days, vec![(now - Duration::days(5)).date_naive()]);
    }
}
