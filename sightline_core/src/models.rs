//! Shared record types for the catalog store and the seed e-commerce tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine kind of a registered external dataset connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Postgresql,
    Mysql,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Postgresql => "postgresql",
            DatasetKind::Mysql => "mysql",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "postgresql" => Some(DatasetKind::Postgresql),
            "mysql" => Some(DatasetKind::Mysql),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Connected,
    Disconnected,
}

impl DatasetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Connected => "connected",
            DatasetStatus::Disconnected => "disconnected",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(DatasetStatus::Connected),
            "disconnected" => Some(DatasetStatus::Disconnected),
            _ => None,
        }
    }
}

/// A registered external database connection.
///
/// The stored password is plaintext (a known gap carried over from the
/// original contract); response DTOs must never serialize it back out.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: DatasetKind,
    pub host: String,
    pub port: i32,
    pub database: String,
    pub username: String,
    pub password: String,
    pub status: DatasetStatus,
    pub tables_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Draft,
    Active,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Draft => "draft",
            MetricStatus::Active => "active",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(MetricStatus::Draft),
            "active" => Some(MetricStatus::Active),
            _ => None,
        }
    }
}

/// A named, versioned SQL KPI definition.
///
/// `version` starts at 1 and increments by exactly one per update; no
/// version history is retained. `sql_query` is opaque text, never parsed
/// or executed against anything.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub sql_query: String,
    pub category: String,
    pub version: i32,
    pub status: MetricStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
}

/// One appended result row from a simulated metric run.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRunRecord {
    pub id: Uuid,
    pub metric_id: Uuid,
    pub result_data: serde_json::Value,
    pub execution_time_ms: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            "shipped" => Some(OrderStatus::Shipped),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Display form used by the charts payload ("Pending", "Completed", ...).
    pub fn display(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Completed => "Completed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

// ── Seed e-commerce entities ───────────────────────────────────

#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Sum of the line totals at creation time, stored denormalized and
    /// never recomputed afterwards.
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderLineRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price snapshot taken when the line was written; later product price
    /// changes do not touch existing lines.
    pub unit_price: f64,
    pub total_price: f64,
}

// ── Fixed schema document ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRelationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaTable {
    pub name: String,
    pub columns: Vec<SchemaColumn>,
    pub relationships: Vec<SchemaRelationship>,
}

/// Schema description returned by the dataset schema endpoint.
///
/// This is a fixed document describing the bundled sample tables; real
/// catalog introspection of the registered connection is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub tables: Vec<SchemaTable>,
}

fn col(name: &str, column_type: &str, nullable: bool, primary_key: bool, foreign_key: bool) -> SchemaColumn {
    SchemaColumn {
        name: name.to_string(),
        column_type: column_type.to_string(),
        nullable,
        primary_key,
        foreign_key,
    }
}

fn rel(from_table: &str, from_column: &str, to_table: &str, to_column: &str, kind: &str) -> SchemaRelationship {
    SchemaRelationship {
        from_table: from_table.to_string(),
        from_column: from_column.to_string(),
        to_table: to_table.to_string(),
        to_column: to_column.to_string(),
        relationship_type: kind.to_string(),
    }
}

impl SchemaDoc {
    /// The canned schema document for the sample e-commerce tables.
    pub fn sample() -> Self {
        SchemaDoc {
            tables: vec![
                SchemaTable {
                    name: "customers".to_string(),
                    columns: vec![
                        col("id", "uuid", false, true, false),
                        col("email", "varchar(255)", false, false, false),
                        col("first_name", "varchar(100)", true, false, false),
                        col("last_name", "varchar(100)", true, false, false),
                        col("created_at", "timestamp", true, false, false),
                    ],
                    relationships: vec![rel(
                        "customers",
                        "id",
                        "orders",
                        "customer_id",
                        "one-to-many",
                    )],
                },
                SchemaTable {
                    name: "products".to_string(),
                    columns: vec![
                        col("id", "uuid", false, true, false),
                        col("name", "varchar(255)", false, false, false),
                        col("description", "text", true, false, false),
                        col("price", "decimal(10,2)", false, false, false),
                        col("category", "varchar(100)", true, false, false),
                    ],
                    relationships: vec![rel(
                        "products",
                        "id",
                        "order_lines",
                        "product_id",
                        "one-to-many",
                    )],
                },
                SchemaTable {
                    name: "orders".to_string(),
                    columns: vec![
                        col("id", "uuid", false, true, false),
                        col("customer_id", "uuid", true, false, true),
                        col("total_amount", "decimal(10,2)", false, false, false),
                        col("status", "varchar(50)", true, false, false),
                        col("created_at", "timestamp", true, false, false),
                    ],
                    relationships: vec![
                        rel("orders", "customer_id", "customers", "id", "many-to-one"),
                        rel("orders", "id", "order_lines", "order_id", "one-to-many"),
                    ],
                },
                SchemaTable {
                    name: "order_lines".to_string(),
                    columns: vec![
                        col("id", "uuid", false, true, false),
                        col("order_id", "uuid", true, false, true),
                        col("product_id", "uuid", true, false, true),
                        col("quantity", "integer", false, false, false),
                        col("unit_price", "decimal(10,2)", false, false, false),
                    ],
                    relationships: vec![
                        rel("order_lines", "order_id", "orders", "id", "many-to-one"),
                        rel("order_lines", "product_id", "products", "id", "many-to-one"),
                    ],
                },
            ],
        }
    }
}
