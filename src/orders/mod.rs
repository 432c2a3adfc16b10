//! Order records and the repository used to resolve them.
//!
//! Orders arrive through the storefront webhook and are stored in SQLite.
//! The notification pipeline only ever reads them back through the
//! [`OrderRepository`] trait, so tests can substitute an in-memory fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;

/// A single purchased line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: i64,
    pub line_total: String,
}

/// An order as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    /// Human-readable order number, distinct from the internal id
    pub number: String,
    pub status: String,
    pub customer_name: String,
    pub customer_email: String,
    pub currency: String,
    pub total: String,
    pub items: String, // JSON serialized line items
    pub created_at: String,
}

impl Order {
    /// Parse the line items column
    pub fn line_items(&self) -> Vec<OrderItem> {
        serde_json::from_str(&self.items).unwrap_or_default()
    }

    /// The order creation timestamp, if it parses
    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Creation date formatted for display ("January 1, 2024"),
    /// falling back to the raw stored value if it does not parse
    pub fn formatted_date(&self) -> String {
        match self.created_date() {
            Some(dt) => dt.format("%B %-d, %Y").to_string(),
            None => self.created_at.clone(),
        }
    }

    /// Order total with a currency symbol where one is known
    pub fn formatted_total(&self) -> String {
        let symbol = match self.currency.as_str() {
            "USD" | "AUD" | "CAD" => "$",
            "EUR" => "\u{20AC}",
            "GBP" => "\u{A3}",
            "JPY" => "\u{A5}",
            _ => return format!("{} {}", self.total, self.currency),
        };
        format!("{}{}", symbol, self.total)
    }
}

/// Lookup of stored orders by id.
///
/// A missing order is a normal outcome, not an error: the storefront can
/// reference orders this service never ingested, or deliver the event before
/// the order row is visible. Implementations log and swallow internal
/// failures.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Resolve an order by its internal id
    async fn resolve(&self, order_id: &str) -> Option<Order>;
}

/// SQLite-backed order repository
pub struct SqliteOrderRepository {
    db: DbPool,
}

impl SqliteOrderRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Insert an order, keeping the existing row on id conflict
    pub async fn insert(&self, order: &Order) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO orders
                (id, number, status, customer_name, customer_email, currency, total, items, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.number)
        .bind(&order.status)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.currency)
        .bind(&order.total)
        .bind(&order.items)
        .bind(&order.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn resolve(&self, order_id: &str) -> Option<Order> {
        let result = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await;

        match result {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Order lookup failed");
                None
            }
        }
    }
}
