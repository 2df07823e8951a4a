pub mod orders;
pub mod products;
pub mod stats;

pub use orders::{handle_list_orders, handle_update_order_status};
pub use products::{
    handle_admin_list_products, handle_create_product, handle_delete_product,
    handle_update_product, handle_update_stock,
};
pub use stats::handle_dashboard_stats;
