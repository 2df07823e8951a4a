pub mod create;
pub mod orders;
pub mod products;
pub mod seed;
pub mod utils;

pub use create::{connect, connect_in_memory, create_tables};
pub use orders::OrderWriteError;

use thiserror::Error;

/// Failure talking to the authoritative store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}
