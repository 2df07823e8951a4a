use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use storefront_shared::types::server_stats::DashboardStats;

use crate::AppState;
use crate::database::orders as db_orders;
use crate::handlers::http::utils::deliver_serialized_json;

/// `GET /api/admin/dashboard/stats`
pub async fn handle_dashboard_stats(
    _req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Serving dashboard stats");

    let catalog = db_orders::catalog_info(&state.db)
        .await
        .context("Failed to compute catalog stats")?;

    let stats = {
        let config = state.config.read().await;
        DashboardStats::build(
            &config,
            catalog,
            state.broadcaster.subscriber_count(),
            state.metrics.snapshot(),
            state.started_at,
        )
    };

    deliver_serialized_json(&stats, StatusCode::OK)
}
