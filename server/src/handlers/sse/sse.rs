use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use http::HeaderValue;
use http_body_util::{BodyExt, StreamBody, combinators::BoxBody};
use hyper::body::Frame;
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error, info, warn};

use storefront_shared::types::sse::{BroadcastMessage, SseError, SseResult};

use super::broadcaster::{ChannelSink, ClientSink, Subscription};
use crate::AppState;

const HEARTBEAT_FRAME: &[u8] = b": heartbeat\n\n";

// ---------------------------------------------------------------------------
// SseStreamBuilder
// ---------------------------------------------------------------------------

/// Helpers for formatting SSE wire frames
pub struct SseStreamBuilder;

impl SseStreamBuilder {
    /// Standard SSE response headers
    pub fn response_headers() -> [(&'static str, HeaderValue); 4] {
        [
            ("content-type", HeaderValue::from_static("text/event-stream")),
            ("cache-control", HeaderValue::from_static("no-cache")),
            ("connection", HeaderValue::from_static("keep-alive")),
            ("x-accel-buffering", HeaderValue::from_static("no")),
        ]
    }

    /// Serialise a [`BroadcastMessage`] into one `data:` frame
    pub fn format_message(message: &BroadcastMessage) -> Bytes {
        let data = serde_json::to_string(message).unwrap_or_else(|e| {
            error!("Failed to serialize {} message: {}", message.kind(), e);
            r#"{"type":"error","message":"failed to serialize message"}"#.to_string()
        });
        debug!("SSE {} frame, {} bytes", message.kind(), data.len());
        Bytes::from(format!("data: {}\n\n", data))
    }

    /// Comment frame; clients ignore it, proxies see traffic
    pub fn heartbeat() -> Bytes {
        Bytes::from_static(HEARTBEAT_FRAME)
    }

    /// Decode a single `data:` frame. Comment frames yield `None`.
    pub fn parse_frame(frame: &[u8]) -> Option<BroadcastMessage> {
        let text = std::str::from_utf8(frame).ok()?;
        let payload = text.strip_prefix("data: ")?.trim_end_matches('\n');
        serde_json::from_str(payload).ok()
    }
}

// ---------------------------------------------------------------------------
// Stream handler
// ---------------------------------------------------------------------------

/// `GET /api/products/stream`
///
/// ### Frames emitted
/// ```text
/// data: {"type":"initial",...}           on connect, full catalog
/// data: {"type":"products-updated",...}  after every committed mutation
/// : heartbeat                            every stream.heartbeat_secs
/// data: {"type":"error",...}             initial read failed; stream ends
/// ```
pub async fn handle_product_stream(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> SseResult<Response<BoxBody<Bytes, Infallible>>> {
    let (sink, mut rx) = ChannelSink::new(state.stream_buffer);
    let sink: Arc<dyn ClientSink> = Arc::new(sink);

    // On failure the error frame is already queued and the sink closed, so
    // the response still carries it before ending.
    let subscription = match state.broadcaster.subscribe(sink).await {
        Ok(id) => Some(Subscription::new(state.broadcaster.clone(), id)),
        Err(e) => {
            warn!("Product stream subscribe failed: {}", e);
            None
        }
    };

    let stream = async_stream::stream! {
        // Held for as long as hyper holds the body.
        let subscription = subscription;
        while let Some(frame) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(frame);
        }
        if let Some(sub) = &subscription {
            info!("SSE stream for {} ended", sub.id());
        }
    };

    let body = BodyExt::boxed(StreamBody::new(
        stream.map(|result| result.map(Frame::data)),
    ));

    let mut builder = Response::builder().status(StatusCode::OK);
    for (name, value) in SseStreamBuilder::response_headers() {
        builder = builder.header(name, value);
    }

    builder.body(body).map_err(|e| {
        error!("Failed to build SSE response: {}", e);
        SseError::Response(e.to_string())
    })
}
