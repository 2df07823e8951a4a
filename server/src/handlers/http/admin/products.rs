use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use storefront_shared::types::ErrorResponse;
use storefront_shared::types::product::{NewProduct, ProductUpdate, StockUpdate};

use crate::AppState;
use crate::database::products as db_products;
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, path_segment, read_json_body,
};
use crate::services::CatalogError;
use crate::services::catalog;

// Admin paths: /api/admin/products/:id[/stock]
const ID_SEGMENT: usize = 3;

fn catalog_error_response(err: CatalogError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match err {
        CatalogError::Invalid(e) => {
            deliver_serialized_json(&ErrorResponse::from(&e), StatusCode::BAD_REQUEST)
        }
        CatalogError::NotFound(_) => {
            deliver_error_json("PRODUCT_NOT_FOUND", "Product not found", StatusCode::NOT_FOUND)
        }
        CatalogError::Store(e) => Err(anyhow::Error::new(e).context("Catalog store failure")),
    }
}

/// Read a JSON body or answer 400; used as `let x = body_or_400!(req);`
macro_rules! body_or_400 {
    ($req:expr) => {
        match read_json_body($req).await? {
            Ok(body) => body,
            Err(rejection) => {
                return deliver_error_json(
                    rejection.to_code(),
                    &rejection.to_message(),
                    StatusCode::BAD_REQUEST,
                );
            }
        }
    };
}

/// Pull the product id out of the path or answer 404
macro_rules! id_or_404 {
    ($req:expr) => {
        match path_segment(&$req, ID_SEGMENT) {
            Some(id) => id,
            None => {
                return deliver_error_json(
                    "PRODUCT_NOT_FOUND",
                    "Product not found",
                    StatusCode::NOT_FOUND,
                );
            }
        }
    };
}

/// `GET /api/admin/products`
pub async fn handle_admin_list_products(
    _req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let products = db_products::list_products(&state.db)
        .await
        .context("Failed to list products")?;
    deliver_serialized_json(&products, StatusCode::OK)
}

/// `POST /api/admin/products`
pub async fn handle_create_product(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let new: NewProduct = body_or_400!(req);

    match catalog::create_product(&state.db, state.notifier.as_ref(), &new).await {
        Ok(product) => deliver_serialized_json(
            &json!({ "message": "Product added successfully", "product": product }),
            StatusCode::CREATED,
        ),
        Err(e) => catalog_error_response(e),
    }
}

/// `PUT /api/admin/products/:id`
pub async fn handle_update_product(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let id = id_or_404!(req);
    let update: ProductUpdate = body_or_400!(req);

    match catalog::update_product(&state.db, state.notifier.as_ref(), &id, &update).await {
        Ok(product) => deliver_serialized_json(
            &json!({ "message": "Product updated successfully", "product": product }),
            StatusCode::OK,
        ),
        Err(e) => catalog_error_response(e),
    }
}

/// `DELETE /api/admin/products/:id`
pub async fn handle_delete_product(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let id = id_or_404!(req);

    match catalog::delete_product(&state.db, state.notifier.as_ref(), &id).await {
        Ok(()) => deliver_serialized_json(
            &json!({ "message": "Product deleted successfully" }),
            StatusCode::OK,
        ),
        Err(e) => catalog_error_response(e),
    }
}

/// `PATCH /api/admin/products/:id/stock`
pub async fn handle_update_stock(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let id = id_or_404!(req);
    let update: StockUpdate = body_or_400!(req);

    match catalog::set_stock(&state.db, state.notifier.as_ref(), &id, &update).await {
        Ok(product) => deliver_serialized_json(
            &json!({ "message": "Stock updated successfully", "product": product }),
            StatusCode::OK,
        ),
        Err(e) => catalog_error_response(e),
    }
}
