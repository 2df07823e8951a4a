use sqlx::SqlitePool;
use tracing::info;

use storefront_shared::types::product::{NewProduct, Product};

use super::StoreError;
use super::products::replace_catalog;

/// Stock given to every seeded product
const SEED_STOCK: i64 = 100;

/// The original four cookies
pub fn seed_catalog() -> Vec<NewProduct> {
    [
        (
            "Chocolate Chip Cookies",
            "Classic cookies with rich chocolate chips",
            120.0,
            "/cookie/chocolate chip cookie.jpg",
        ),
        (
            "Matcha Cookies",
            "Premium green tea flavored cookies",
            180.0,
            "/cookie/matcha cookie.jpg",
        ),
        (
            "Double Chocolate Cookies",
            "Extra chocolatey with cocoa and chips",
            250.0,
            "/cookie/double chocolate cookie.jpg",
        ),
        (
            "Oatmeal Raisin Cookies",
            "Healthy and delicious oat cookies",
            90.0,
            "/cookie/oatmeal raisin cookie.jpg",
        ),
    ]
    .into_iter()
    .map(|(name, description, price, image)| NewProduct {
        name: name.to_string(),
        description: description.to_string(),
        price,
        image: Some(image.to_string()),
        stock: Some(SEED_STOCK),
    })
    .collect()
}

/// Replace whatever is in the catalog with the seed products.
pub async fn seed_products(pool: &SqlitePool) -> Result<Vec<Product>, StoreError> {
    let products = replace_catalog(pool, &seed_catalog()).await?;
    info!("Products seeded successfully ({} products)", products.len());
    Ok(products)
}
