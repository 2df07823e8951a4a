use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use crate::AppState;
use crate::database::products as db_products;
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, path_segment};

/// `GET /api/products`: the catalog as a plain JSON array, for clients that
/// cannot hold a stream open.
pub async fn handle_list_products(
    _req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let products = db_products::list_products(&state.db)
        .await
        .context("Failed to list products")?;

    info!("Serving {} products", products.len());
    deliver_serialized_json(&products, StatusCode::OK)
}

/// `GET /api/products/:id`
pub async fn handle_get_product(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(id) = path_segment(&req, 2) else {
        return deliver_error_json("PRODUCT_NOT_FOUND", "Product not found", StatusCode::NOT_FOUND);
    };

    match db_products::get_product(&state.db, &id)
        .await
        .context("Failed to load product")?
    {
        Some(product) => deliver_serialized_json(&product, StatusCode::OK),
        None => deliver_error_json("PRODUCT_NOT_FOUND", "Product not found", StatusCode::NOT_FOUND),
    }
}
