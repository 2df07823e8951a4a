use sqlx::SqlitePool;
use tracing::{info, warn};

use storefront_shared::types::order::{NewOrder, Order, OrderError, OrderStatus, StatusUpdate};

use crate::database::OrderWriteError;
use crate::database::orders as db_orders;
use crate::handlers::sse::{ChangeNotifier, ProductsChanged};

/// Place an order. Stock goes down for every ordered product, so a committed
/// order is a catalog change.
pub async fn place_order(
    pool: &SqlitePool,
    notifier: &dyn ChangeNotifier,
    new: &NewOrder,
) -> Result<Order, OrderWriteError> {
    let order = db_orders::place_order(pool, new).await.map_err(|e| {
        warn!("Order rejected: {}", e);
        e
    })?;
    info!(
        "Placed order {} ({} lines, total {:.2})",
        order.id,
        order.items.len(),
        order.total
    );

    let mut product_ids: Vec<String> = order.items.iter().map(|i| i.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();
    notifier.products_changed(ProductsChanged::StockChanged { product_ids });

    Ok(order)
}

/// Move an order to a new status. Products are untouched, nothing is
/// broadcast.
pub async fn update_order_status(
    pool: &SqlitePool,
    id: &str,
    update: &StatusUpdate,
) -> Result<Order, OrderWriteError> {
    let raw = update
        .status
        .as_deref()
        .ok_or(OrderWriteError::Rejected(OrderError::MissingStatus))?;
    let status: OrderStatus = raw.parse().map_err(OrderWriteError::Rejected)?;

    let order = db_orders::update_status(pool, id, status)
        .await?
        .ok_or(OrderWriteError::Rejected(OrderError::OrderNotFound))?;
    info!("Order {} is now {}", order.id, order.status);
    Ok(order)
}
