use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::handlers::http::routes::Router;
use crate::handlers::http::utils::internal_error;
use crate::tower_middle::MetricsLayer;

/// Accept connections on `listener` forever, serving each over HTTP/1.1
/// through the metrics layer and `router`.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    state: AppState,
    label: &'static str,
) -> Result<()> {
    let local = listener
        .local_addr()
        .context("Listener has no local address")?;
    info!("{} listening on http://{}", label, local);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("{} accept failed: {}", label, e);
                continue;
            }
        };
        let io = TokioIo::new(stream);

        let router = Arc::clone(&router);
        let handler_state = state.clone();
        let service = ServiceBuilder::new()
            .layer(MetricsLayer::new(state.metrics.clone()))
            .service(tower::service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                let state = handler_state.clone();
                async move {
                    match router.route(req, state).await {
                        Ok(response) => Ok::<_, Infallible>(response),
                        Err(e) => {
                            error!("Request failed: {:#}", e);
                            Ok(internal_error())
                        }
                    }
                }
            }));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, TowerToHyperService::new(service))
                .await
            {
                debug!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}
