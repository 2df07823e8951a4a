use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry as stored and as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Filename, URL or base64 data URI; passed through untouched.
    pub image: Option<String>,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/admin/products`
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Body of `PUT /api/admin/products/:id`.
///
/// Replaces the editable fields; `stock` is left untouched when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Body of `PATCH /api/admin/products/:id/stock`
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub stock: Option<i64>,
}

/// Product validation failures
#[derive(Debug, Clone, PartialEq)]
pub enum ProductError {
    EmptyName,
    EmptyDescription,
    InvalidPrice,
    NegativeStock,
    MissingStock,
}

impl ProductError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::EmptyName => "EMPTY_NAME",
            Self::EmptyDescription => "EMPTY_DESCRIPTION",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::NegativeStock => "NEGATIVE_STOCK",
            Self::MissingStock => "MISSING_STOCK",
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::EmptyName => "Product name is required".to_string(),
            Self::EmptyDescription => "Product description is required".to_string(),
            Self::InvalidPrice => "Price must be a non-negative number".to_string(),
            Self::NegativeStock => "Stock cannot be negative".to_string(),
            Self::MissingStock => "Stock value is required".to_string(),
        }
    }
}

impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_message())
    }
}

impl std::error::Error for ProductError {}

fn validate_fields(
    name: &str,
    description: &str,
    price: f64,
    stock: Option<i64>,
) -> Result<(), ProductError> {
    if name.trim().is_empty() {
        return Err(ProductError::EmptyName);
    }
    if description.trim().is_empty() {
        return Err(ProductError::EmptyDescription);
    }
    if !price.is_finite() || price < 0.0 {
        return Err(ProductError::InvalidPrice);
    }
    if matches!(stock, Some(s) if s < 0) {
        return Err(ProductError::NegativeStock);
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ProductError> {
        validate_fields(&self.name, &self.description, self.price, self.stock)
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), ProductError> {
        validate_fields(&self.name, &self.description, self.price, self.stock)
    }
}

impl StockUpdate {
    /// The requested stock level, if present and non-negative.
    pub fn validated(&self) -> Result<i64, ProductError> {
        match self.stock {
            None => Err(ProductError::MissingStock),
            Some(s) if s < 0 => Err(ProductError::NegativeStock),
            Some(s) => Ok(s),
        }
    }
}
