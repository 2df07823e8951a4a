use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};

use storefront_shared::types::order::NewOrder;

use crate::AppState;
use crate::database::OrderWriteError;
use crate::database::orders as db_orders;
use crate::handlers::http::utils::{
    deliver_error_json, deliver_serialized_json, path_segment, read_json_body,
};
use crate::services::orders as order_service;

/// Map an order write failure to a response. Store failures stay errors and
/// end up as a 500.
pub fn order_error_response(err: OrderWriteError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match err {
        OrderWriteError::Rejected(rejection) => {
            let status = if rejection.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            deliver_error_json(rejection.to_code(), &rejection.to_message(), status)
        }
        OrderWriteError::Store(e) => Err(anyhow::Error::new(e).context("Order store failure")),
    }
}

/// `POST /api/orders`
pub async fn handle_place_order(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let new_order: NewOrder = match read_json_body(req).await? {
        Ok(order) => order,
        Err(rejection) => {
            return deliver_error_json(
                rejection.to_code(),
                &rejection.to_message(),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    match order_service::place_order(&state.db, state.notifier.as_ref(), &new_order).await {
        Ok(order) => deliver_serialized_json(&order, StatusCode::CREATED),
        Err(e) => order_error_response(e),
    }
}

/// `GET /api/orders/:id`
pub async fn handle_get_order(
    req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(id) = path_segment(&req, 2) else {
        return deliver_error_json("ORDER_NOT_FOUND", "Order not found", StatusCode::NOT_FOUND);
    };

    match db_orders::get_order(&state.db, &id)
        .await
        .context("Failed to load order")?
    {
        Some(order) => deliver_serialized_json(&order, StatusCode::OK),
        None => deliver_error_json("ORDER_NOT_FOUND", "Order not found", StatusCode::NOT_FOUND),
    }
}
