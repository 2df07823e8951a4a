pub mod json_error;
pub mod order;
pub mod product;
pub mod server_config;
pub mod server_stats;
pub mod sse;

pub use self::json_error::ErrorResponse;
pub use self::order::{
    CustomerDetails, NewOrder, Order, OrderError, OrderItem, OrderLineRequest, OrderStatus,
    StatusUpdate, order_total,
};
pub use self::product::{NewProduct, Product, ProductError, ProductUpdate, StockUpdate};
pub use self::server_stats::{CatalogInfo, DashboardStats, HttpInfo};
pub use self::sse::{BroadcastMessage, SseError, SseResult};
