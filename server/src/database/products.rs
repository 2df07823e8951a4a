use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use storefront_shared::types::product::{NewProduct, Product, ProductUpdate};

use super::StoreError;
use super::utils::{generate_id, get_timestamp, sanitize_optional, sanitize_string};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image, stock, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: String,
    price: f64,
    image: Option<String>,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Read the full catalog in creation order.
pub async fn list_products(pool: &SqlitePool) -> Result<Vec<Product>, StoreError> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {} FROM products ORDER BY created_at ASC, rowid ASC",
        PRODUCT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Product::from).collect())
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> Result<Option<Product>, StoreError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {} FROM products WHERE id = ?1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Product::from))
}

fn build_product(new: &NewProduct) -> Product {
    let now = get_timestamp();
    Product {
        id: generate_id(),
        name: sanitize_string(&new.name),
        description: sanitize_string(&new.description),
        price: new.price,
        image: sanitize_optional(new.image.as_deref()),
        stock: new.stock.unwrap_or(0),
        created_at: now,
        updated_at: now,
    }
}

async fn insert_row<'e, E>(executor: E, product: &Product) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO products (id, name, description, price, image, stock, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(product.stock)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert a product. Callers validate the payload first.
pub async fn insert_product(pool: &SqlitePool, new: &NewProduct) -> Result<Product, StoreError> {
    let product = build_product(new);
    insert_row(pool, &product).await?;
    Ok(product)
}

/// Replace a product's editable fields. `None` when no such product exists.
///
/// The row comes back from the `UPDATE` itself, so a committed change is
/// always reported even if the product is deleted right after.
pub async fn update_product(
    pool: &SqlitePool,
    id: &str,
    update: &ProductUpdate,
) -> Result<Option<Product>, StoreError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "UPDATE products
         SET name = ?1, description = ?2, price = ?3, image = ?4,
             stock = COALESCE(?5, stock), updated_at = ?6
         WHERE id = ?7
         RETURNING {}",
        PRODUCT_COLUMNS
    ))
    .bind(sanitize_string(&update.name))
    .bind(sanitize_string(&update.description))
    .bind(update.price)
    .bind(sanitize_optional(update.image.as_deref()))
    .bind(update.stock)
    .bind(get_timestamp())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Product::from))
}

/// Set the absolute stock level. `None` when no such product exists.
pub async fn set_stock(
    pool: &SqlitePool,
    id: &str,
    stock: i64,
) -> Result<Option<Product>, StoreError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {}",
        PRODUCT_COLUMNS
    ))
    .bind(stock)
    .bind(get_timestamp())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Product::from))
}

/// Delete a product. Returns whether a row was removed.
pub async fn delete_product(pool: &SqlitePool, id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_products(pool: &SqlitePool) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Clear the catalog and insert `products` in one transaction.
pub async fn replace_catalog(
    pool: &SqlitePool,
    products: &[NewProduct],
) -> Result<Vec<Product>, StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM products").execute(&mut *tx).await?;

    let mut inserted = Vec::with_capacity(products.len());
    for new in products {
        let product = build_product(new);
        insert_row(&mut *tx, &product).await?;
        inserted.push(product);
    }

    tx.commit().await?;
    Ok(inserted)
}
