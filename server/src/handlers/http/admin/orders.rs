use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use storefront_shared::types::order::StatusUpdate;

use crate::AppState;
use crate::database::orders as db_orders;
use crate::handlers::http::orders::order_error_response;
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, path_segment, read_json_body,
};
use crate::services::orders as order_service;

/// `GET /api/admin/orders`, newest first
pub async fn handle_list_orders(
    _req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let orders = db_orders::list_orders(&state.db)
        .await
        .context("Failed to list orders")?;
    deliver_serialized_json(&orders, StatusCode::OK)
}

/// `PATCH /api/admin/orders/:id/status`
pub async fn handle_update_order_status(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(id) = path_segment(&req, 3) else {
        return deliver_error_json("ORDER_NOT_FOUND", "Order not found", StatusCode::NOT_FOUND);
    };

    let update: StatusUpdate = match read_json_body(req).await? {
        Ok(update) => update,
        Err(rejection) => {
            return deliver_error_json(
                rejection.to_code(),
                &rejection.to_message(),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    match order_service::update_order_status(&state.db, &id, &update).await {
        Ok(order) => deliver_serialized_json(
            &json!({ "message": "Order status updated", "order": order }),
            StatusCode::OK,
        ),
        Err(e) => order_error_response(e),
    }
}
