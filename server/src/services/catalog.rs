use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use storefront_shared::types::product::{
    NewProduct, Product, ProductError, ProductUpdate, StockUpdate,
};

use crate::database::{StoreError, products};
use crate::handlers::sse::{ChangeNotifier, ProductsChanged};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Invalid(ProductError),

    #[error("product {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn create_product(
    pool: &SqlitePool,
    notifier: &dyn ChangeNotifier,
    new: &NewProduct,
) -> Result<Product, CatalogError> {
    new.validate().map_err(CatalogError::Invalid)?;

    let product = products::insert_product(pool, new).await?;
    info!("Created product {} ({})", product.id, product.name);

    notifier.products_changed(ProductsChanged::Created {
        product_id: product.id.clone(),
    });
    Ok(product)
}

pub async fn update_product(
    pool: &SqlitePool,
    notifier: &dyn ChangeNotifier,
    id: &str,
    update: &ProductUpdate,
) -> Result<Product, CatalogError> {
    update.validate().map_err(CatalogError::Invalid)?;

    let product = products::update_product(pool, id, update)
        .await?
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
    info!("Updated product {}", product.id);

    notifier.products_changed(ProductsChanged::Updated {
        product_id: product.id.clone(),
    });
    Ok(product)
}

pub async fn delete_product(
    pool: &SqlitePool,
    notifier: &dyn ChangeNotifier,
    id: &str,
) -> Result<(), CatalogError> {
    if !products::delete_product(pool, id).await? {
        warn!("Delete requested for unknown product {}", id);
        return Err(CatalogError::NotFound(id.to_string()));
    }
    info!("Deleted product {}", id);

    notifier.products_changed(ProductsChanged::Deleted {
        product_id: id.to_string(),
    });
    Ok(())
}

/// Overwrite a product's stock level.
pub async fn set_stock(
    pool: &SqlitePool,
    notifier: &dyn ChangeNotifier,
    id: &str,
    update: &StockUpdate,
) -> Result<Product, CatalogError> {
    let stock = update.validated().map_err(CatalogError::Invalid)?;

    let product = products::set_stock(pool, id, stock)
        .await?
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
    info!("Stock for {} set to {}", product.id, product.stock);

    notifier.products_changed(ProductsChanged::StockChanged {
        product_ids: vec![product.id.clone()],
    });
    Ok(product)
}
