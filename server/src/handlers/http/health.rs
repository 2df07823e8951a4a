use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use crate::AppState;
use crate::handlers::http::utils::deliver_serialized_json;

pub async fn handle_health(
    _req: Request<IncomingBody>,
    _state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_serialized_json(
        &json!({ "status": "OK", "service": "Cookies by TinTin API" }),
        StatusCode::OK,
    )
}
