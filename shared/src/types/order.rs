use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::InvalidStatus(other.to_string())),
        }
    }
}

/// Delivery details captured at checkout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One requested line of `POST /api/orders`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Body of `POST /api/orders`
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub customer: CustomerDetails,
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

/// Body of `PATCH /api/admin/orders/:id/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

/// A priced order line. Price and name are copied from the product at
/// checkout so later catalog edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl OrderItem {
    pub fn priced(product_id: &str, product_name: &str, unit_price: f64, quantity: i64) -> Self {
        Self {
            product_id: product_id.to_string(),
            product_name: product_name.to_string(),
            quantity,
            unit_price,
            subtotal: unit_price * quantity as f64,
        }
    }
}

/// Sum of line subtotals
pub fn order_total(items: &[OrderItem]) -> f64 {
    items.iter().map(|item| item.subtotal).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer: CustomerDetails,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order error codes
#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    EmptyOrder,
    InvalidQuantity(String),
    ProductNotFound(String),
    InsufficientStock(String),
    InvalidStatus(String),
    MissingStatus,
    OrderNotFound,
}

impl OrderError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::MissingStatus => "MISSING_STATUS",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::EmptyOrder => "Order must have items".to_string(),
            Self::InvalidQuantity(id) => format!("Quantity for product {} must be at least 1", id),
            Self::ProductNotFound(id) => format!("Product {} not found", id),
            Self::InsufficientStock(name) => format!("Insufficient stock for {}", name),
            Self::InvalidStatus(s) => format!("Invalid order status: {}", s),
            Self::MissingStatus => "Status is required".to_string(),
            Self::OrderNotFound => "Order not found".to_string(),
        }
    }

    /// True when the error refers to something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProductNotFound(_) | Self::OrderNotFound)
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

impl std::error::Error for OrderError {}

impl NewOrder {
    /// Shape checks that need no database access.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity < 1) {
            return Err(OrderError::InvalidQuantity(line.product_id.clone()));
        }
        Ok(())
    }
}
