use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::StoreError;

/// Current schema version, stored in `PRAGMA user_version`.
const SCHEMA_VERSION: u32 = 1;

/// Open (creating if needed) the SQLite database behind `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("Connected to database {}", url);
    Ok(pool)
}

/// Single-connection in-memory database. Every pooled connection to
/// `sqlite::memory:` would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    create_tables(&pool).await?;
    Ok(pool)
}

/// Initialize the database schema. Safe to call on every startup.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), StoreError> {
    // Products: `stock` is decremented by order placement.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id          TEXT    PRIMARY KEY,
            name        TEXT    NOT NULL,
            description TEXT    NOT NULL,
            price       REAL    NOT NULL CHECK (price >= 0),
            image       TEXT,
            stock       INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id               TEXT PRIMARY KEY,
            customer_name    TEXT,
            customer_address TEXT,
            customer_phone   TEXT,
            customer_email   TEXT,
            total            REAL NOT NULL CHECK (total >= 0),
            status           TEXT NOT NULL DEFAULT 'pending',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // Line items keep a copy of name and price; product_id is not a foreign
    // key so deleting a product leaves order history intact.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id     TEXT    NOT NULL,
            position     INTEGER NOT NULL,
            product_id   TEXT    NOT NULL,
            product_name TEXT    NOT NULL,
            quantity     INTEGER NOT NULL CHECK (quantity >= 1),
            unit_price   REAL    NOT NULL,
            subtotal     REAL    NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    // --- Indexes ------------------------------------------------------------
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_status     ON orders(status)")
        .execute(pool)
        .await?;

    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(pool)
        .await?;

    Ok(())
}
