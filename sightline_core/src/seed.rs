//! Sample e-commerce data bootstrap.
//!
//! Runs once at startup, after migration: when the customer table is empty
//! the loader writes a fixed set of customers and products plus randomized
//! orders spread over the last 90 days, so the dashboard has something to
//! aggregate before any real dataset is wired up. The system never deletes
//! these rows.

use crate::models::{CustomerRecord, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord};
use crate::store::traits::CatalogStore;
use crate::Result;
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("john.doe@example.com", "John", "Doe"),
    ("jane.smith@example.com", "Jane", "Smith"),
    ("bob.johnson@example.com", "Bob", "Johnson"),
    ("alice.brown@example.com", "Alice", "Brown"),
    ("charlie.wilson@example.com", "Charlie", "Wilson"),
];

const PRODUCTS: &[(&str, &str, f64, &str)] = &[
    ("Laptop Pro", "High-performance laptop", 1299.99, "Electronics"),
    ("Wireless Headphones", "Noise-cancelling headphones", 199.99, "Electronics"),
    ("Coffee Maker", "Automatic coffee maker", 89.99, "Appliances"),
    ("Running Shoes", "Comfortable running shoes", 129.99, "Sports"),
    ("Backpack", "Durable travel backpack", 79.99, "Travel"),
    ("Smartphone", "Latest smartphone model", 899.99, "Electronics"),
    ("Desk Chair", "Ergonomic office chair", 249.99, "Furniture"),
    ("Water Bottle", "Insulated water bottle", 24.99, "Sports"),
];

const STATUSES: &[OrderStatus] = &[
    OrderStatus::Completed,
    OrderStatus::Pending,
    OrderStatus::Shipped,
    OrderStatus::Cancelled,
];

const ORDER_COUNT: usize = 50;

/// Populate the sample tables when the customer table is empty.
///
/// Returns `true` when seeding ran, `false` when data was already present.
#[tracing::instrument(level = "info", skip(store))]
pub async fn seed_if_empty(store: &dyn CatalogStore) -> Result<bool> {
    if store.customer_count().await? > 0 {
        tracing::debug!("sample data already present, skipping seed");
        return Ok(false);
    }

    let now = Utc::now();
    let mut rng = rand::thread_rng();

    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for (email, first_name, last_name) in CUSTOMERS {
        let record = CustomerRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            created_at: now - Duration::days(rng.gen_range(90..=365)),
            last_login: Some(now - Duration::days(rng.gen_range(0..=14))),
            is_active: true,
        };
        store.insert_customer(&record).await?;
        customers.push(record);
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (name, description, price, category) in PRODUCTS {
        let record = ProductRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price: *price,
            category: category.to_string(),
            stock_quantity: rng.gen_range(10..=100),
            is_active: true,
        };
        store.insert_product(&record).await?;
        products.push(record);
    }

    for _ in 0..ORDER_COUNT {
        let customer = customers.choose(&mut rng).expect("seed customers");
        let status = *STATUSES.choose(&mut rng).expect("seed statuses");
        let placed_at = now - Duration::days(rng.gen_range(1..=90));

        let order_id = Uuid::new_v4();
        let mut lines = Vec::new();
        let mut total_amount = 0.0;
        for _ in 0..rng.gen_range(1..=4) {
            let product = products.choose(&mut rng).expect("seed products");
            let quantity = rng.gen_range(1..=3);
            // Snapshot the current product price onto the line.
            let unit_price = product.price;
            let total_price = unit_price * quantity as f64;
            total_amount += total_price;
            lines.push(OrderLineRecord {
                id: Uuid::new_v4(),
                order_id,
                product_id: product.id,
                quantity,
                unit_price,
                total_price,
            });
        }

        // total_amount is fixed at creation from the lines; it is never
        // recomputed afterwards.
        let order = OrderRecord {
            id: order_id,
            customer_id: customer.id,
            total_amount,
            status,
            created_at: placed_at,
            updated_at: placed_at,
        };
        store.insert_order(&order, &lines).await?;
    }

    tracing::info!(
        customers = customers.len(),
        products = products.len(),
        orders = ORDER_COUNT,
        "seeded sample e-commerce data"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    #[tokio::test]
    async fn seeds_once_and_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("seed.db")).await.unwrap();

        assert!(seed_if_empty(&store).await.unwrap());
        let count = store.customer_count().await.unwrap();
        assert_eq!(count, CUSTOMERS.len() as i64);

        // Second run must be a no-op.
        assert!(!seed_if_empty(&store).await.unwrap());
        assert_eq!(store.customer_count().await.unwrap(), count);
    }

    #[tokio::test]
    async fn seeded_orders_sum_their_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("seed.db")).await.unwrap();
        seed_if_empty(&store).await.unwrap();

        let rows = sqlx::query(
            "SELECT o.id AS id, o.total_amount AS total,
                    (SELECT COALESCE(SUM(total_price), 0) FROM order_lines WHERE order_id = o.id) AS line_total
             FROM orders o",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();

        assert_eq!(rows.len(), ORDER_COUNT);
        for row in rows {
            use sqlx::Row;
            let total: f64 = row.get("total");
            let line_total: f64 = row.get("line_total");
            assert!((total - line_total).abs() < 1e-6);
        }
    }
}
