use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

use storefront_shared::types::order::{
    CustomerDetails, NewOrder, Order, OrderError, OrderItem, OrderStatus, order_total,
};
use storefront_shared::types::server_stats::CatalogInfo;

use super::StoreError;
use super::utils::{generate_id, get_timestamp, sanitize_optional};

/// Why an order write did not commit
#[derive(Debug, Error)]
pub enum OrderWriteError {
    #[error("{0}")]
    Rejected(OrderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for OrderWriteError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::from(err))
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    customer_name: Option<String>,
    customer_address: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    total: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    order_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price: f64,
    subtotal: f64,
}

#[derive(Debug, FromRow)]
struct StockRow {
    name: String,
    price: f64,
    stock: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(format!("order {}: {}", self.id, e)))?;

        Ok(Order {
            id: self.id,
            customer: CustomerDetails {
                name: self.customer_name,
                address: self.customer_address,
                phone: self.customer_phone,
                email: self.customer_email,
            },
            items,
            total: self.total,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
        }
    }
}

const ORDER_COLUMNS: &str = "id, customer_name, customer_address, customer_phone, customer_email, \
                             total, status, created_at, updated_at";

/// Price, validate and persist an order, decrementing stock for every line.
///
/// Runs in a single transaction: either the order exists and every product's
/// stock went down by the ordered quantity, or nothing changed.
pub async fn place_order(pool: &SqlitePool, new: &NewOrder) -> Result<Order, OrderWriteError> {
    new.validate().map_err(OrderWriteError::Rejected)?;

    let mut tx = pool.begin().await?;

    // Remaining stock per product within this order, so repeated lines for
    // the same product are checked against their combined quantity.
    let mut remaining: HashMap<String, i64> = HashMap::new();
    let mut items = Vec::with_capacity(new.items.len());

    for line in &new.items {
        let row: Option<StockRow> =
            sqlx::query_as("SELECT name, price, stock FROM products WHERE id = ?1")
                .bind(&line.product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(product) = row else {
            return Err(OrderWriteError::Rejected(OrderError::ProductNotFound(
                line.product_id.clone(),
            )));
        };

        let left = remaining
            .entry(line.product_id.clone())
            .or_insert(product.stock);
        if *left < line.quantity {
            return Err(OrderWriteError::Rejected(OrderError::InsufficientStock(
                product.name,
            )));
        }
        *left -= line.quantity;

        items.push(OrderItem::priced(
            &line.product_id,
            &product.name,
            product.price,
            line.quantity,
        ));
    }

    let now = get_timestamp();
    let order = Order {
        id: generate_id(),
        customer: CustomerDetails {
            name: sanitize_optional(new.customer.name.as_deref()),
            address: sanitize_optional(new.customer.address.as_deref()),
            phone: sanitize_optional(new.customer.phone.as_deref()),
            email: sanitize_optional(new.customer.email.as_deref()),
        },
        total: order_total(&items),
        items,
        status: OrderStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO orders (id, customer_name, customer_address, customer_phone, customer_email,
                             total, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&order.id)
    .bind(&order.customer.name)
    .bind(&order.customer.address)
    .bind(&order.customer.phone)
    .bind(&order.customer.email)
    .bind(order.total)
    .bind(order.status.as_str())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (order_id, position, product_id, product_name, quantity,
                                      unit_price, subtotal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&order.id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?1, updated_at = ?2
             WHERE id = ?3 AND stock >= ?1",
        )
        .bind(item.quantity)
        .bind(now)
        .bind(&item.product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderWriteError::Rejected(OrderError::InsufficientStock(
                item.product_name.clone(),
            )));
        }
    }

    tx.commit().await?;
    Ok(order)
}

async fn load_items(
    pool: &SqlitePool,
    order_ids: &[String],
) -> Result<HashMap<String, Vec<OrderItem>>, StoreError> {
    let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(by_order);
    }

    let placeholders = vec!["?"; order_ids.len()].join(", ");
    let sql = format!(
        "SELECT order_id, product_id, product_name, quantity, unit_price, subtotal
         FROM order_items WHERE order_id IN ({}) ORDER BY order_id, position",
        placeholders
    );

    let mut query = sqlx::query_as::<_, OrderItemRow>(&sql);
    for id in order_ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        by_order
            .entry(row.order_id.clone())
            .or_default()
            .push(OrderItem::from(row));
    }
    Ok(by_order)
}

pub async fn get_order(pool: &SqlitePool, id: &str) -> Result<Option<Order>, StoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut items = load_items(pool, &[row.id.clone()]).await?;
    let order_items = items.remove(&row.id).unwrap_or_default();
    row.into_order(order_items).map(Some)
}

/// All orders, newest first.
pub async fn list_orders(pool: &SqlitePool) -> Result<Vec<Order>, StoreError> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM orders ORDER BY created_at DESC, rowid DESC",
        ORDER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut items = load_items(pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let order_items = items.remove(&row.id).unwrap_or_default();
            row.into_order(order_items)
        })
        .collect()
}

/// Change an order's status. `None` when no such order exists.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: OrderStatus,
) -> Result<Option<Order>, StoreError> {
    let result = sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status.as_str())
        .bind(get_timestamp())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_order(pool, id).await
}

/// Product/order counts and revenue for the admin dashboard.
pub async fn catalog_info(pool: &SqlitePool) -> Result<CatalogInfo, StoreError> {
    let total_products = super::products::count_products(pool).await?;

    let (total_orders, pending_orders, total_revenue): (i64, i64, f64) = sqlx::query_as(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(total), 0.0)
         FROM orders",
    )
    .fetch_one(pool)
    .await?;

    Ok(CatalogInfo {
        total_products,
        total_orders,
        pending_orders,
        total_revenue,
    })
}
