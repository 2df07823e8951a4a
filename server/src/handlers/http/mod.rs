pub mod admin;
pub mod health;
pub mod orders;
pub mod products;
pub mod routes;
pub mod server;
pub mod utils;

pub use routes::{Router, build_admin_router, build_storefront_router};
pub use server::serve;
