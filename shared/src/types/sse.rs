// shared/src/types/sse.rs
// Product stream payloads carried in `data:` frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::product::Product;

/// One message on `GET /api/products/stream`.
///
/// `ProductsUpdated` always carries the full catalog as read at broadcast
/// time, never a diff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BroadcastMessage {
    #[serde(rename = "initial")]
    Initial { products: Vec<Product> },

    #[serde(rename = "products-updated")]
    ProductsUpdated {
        products: Vec<Product>,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl BroadcastMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::ProductsUpdated { .. } => "products-updated",
            Self::Error { .. } => "error",
        }
    }

    pub fn products(&self) -> Option<&[Product]> {
        match self {
            Self::Initial { products } | Self::ProductsUpdated { products, .. } => Some(products),
            Self::Error { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseError {
    /// Building or writing the stream response failed
    Response(String),
}

impl std::fmt::Display for SseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseError::Response(msg) => write!(f, "Failed to build stream response: {}", msg),
        }
    }
}

impl std::error::Error for SseError {}

pub type SseResult<T> = Result<T, SseError>;
