//! End-to-end tests over real TCP listeners: storefront and admin routers,
//! JSON endpoints and the live product stream.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

use storefront_server::AppState;
use storefront_server::database::{connect_in_memory, seed};
use storefront_server::handlers::http::{build_admin_router, build_storefront_router, serve};
use storefront_server::handlers::sse::{ChangeNotifier, ProductsChanged, SseStreamBuilder};
use storefront_shared::config::parse_config;
use storefront_shared::types::sse::BroadcastMessage;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    storefront: SocketAddr,
    admin: SocketAddr,
    state: AppState,
}

async fn start() -> TestServer {
    let pool = connect_in_memory().await.unwrap();
    seed::seed_products(&pool).await.unwrap();
    let config = parse_config("[server]\nbind = \"127.0.0.1\"\n").unwrap();
    start_with(AppState::new(pool, config)).await
}

async fn start_with(state: AppState) -> TestServer {
    let storefront = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = TestServer {
        storefront: storefront.local_addr().unwrap(),
        admin: admin.local_addr().unwrap(),
        state: state.clone(),
    };

    tokio::spawn(serve(
        storefront,
        Arc::new(build_storefront_router()),
        state.clone(),
        "Storefront",
    ));
    tokio::spawn(serve(admin, Arc::new(build_admin_router()), state, "Admin"));
    server
}

async fn send(
    addr: SocketAddr,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Response<Incoming> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let payload = body.map(|v| v.to_string()).unwrap_or_default();
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("host", addr.to_string())
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(payload)))
        .unwrap();

    sender.send_request(req).await.unwrap()
}

/// Open the product stream on its own connection. Aborting the returned
/// task closes the socket.
async fn open_stream(addr: SocketAddr) -> (Response<Incoming>, JoinHandle<()>) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let conn = tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = Request::builder()
        .uri("/api/products/stream")
        .header("host", addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();
    (sender.send_request(req).await.unwrap(), conn)
}

async fn send_json(
    addr: SocketAddr,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = send(addr, method, path, body).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Read stream frames until one full `data:` message arrives; heartbeat
/// comments are skipped.
async fn next_message(body: &mut Incoming, pending: &mut Vec<u8>) -> BroadcastMessage {
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(end) = pending.windows(2).position(|w| w == b"\n\n") {
                let frame: Vec<u8> = pending.drain(..end + 2).collect();
                if let Some(message) = SseStreamBuilder::parse_frame(&frame) {
                    return message;
                }
                continue;
            }
            let frame = body.frame().await.unwrap().unwrap();
            if let Ok(data) = frame.into_data() {
                pending.extend_from_slice(&data);
            }
        }
    })
    .await
    .expect("no stream message within timeout")
}

fn names(message: &BroadcastMessage) -> Vec<String> {
    message
        .products()
        .unwrap_or_default()
        .iter()
        .map(|p| p.name.clone())
        .collect()
}

async fn wait_for_subscribers(state: &AppState, count: usize) {
    tokio::time::timeout(WAIT, async {
        while state.broadcaster.subscriber_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber count never reached");
}

// ── Plain JSON endpoints ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_service_name() {
    let server = start().await;
    let (status, body) = send_json(server.storefront, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK", "service": "Cookies by TinTin API"}));
}

#[tokio::test]
async fn product_list_returns_seeded_catalog() {
    let server = start().await;
    let (status, body) = send_json(server.storefront, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 4);
    assert_eq!(products[0]["name"], "Chocolate Chip Cookies");
    assert_eq!(products[0]["stock"], 100);
}

#[tokio::test]
async fn unknown_routes_use_error_envelope() {
    let server = start().await;
    let (status, body) = send_json(server.storefront, Method::GET, "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) =
        send_json(server.storefront, Method::GET, "/api/products/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
}

#[tokio::test]
async fn admin_routes_only_on_admin_listener() {
    let server = start().await;
    let new = json!({"name": "Ube", "description": "Purple yam", "price": 150});

    let (status, _) =
        send_json(server.storefront, Method::POST, "/api/admin/products", Some(new.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        send_json(server.admin, Method::POST, "/api/admin/products", Some(new)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["name"], "Ube");
    assert_eq!(body["product"]["stock"], 0);

    // admin listener also serves the storefront routes
    let (status, body) = send_json(server.admin, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn invalid_payloads_are_rejected_with_400() {
    let server = start().await;

    let response = send(server.admin, Method::POST, "/api/admin/products", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        server.admin,
        Method::POST,
        "/api/admin/products",
        Some(json!({"name": "", "description": "x", "price": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_NAME");

    let (_, list) = send_json(server.storefront, Method::GET, "/api/products", None).await;
    let id = list[0]["id"].as_str().unwrap().to_string();
    let (status, body) = send_json(
        server.admin,
        Method::PATCH,
        &format!("/api/admin/products/{}/stock", id),
        Some(json!({"stock": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NEGATIVE_STOCK");
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_lifecycle_updates_stock_and_status() {
    let server = start().await;
    let (_, list) = send_json(server.storefront, Method::GET, "/api/products", None).await;
    let chip = list[0]["id"].as_str().unwrap().to_string();
    let matcha = list[1]["id"].as_str().unwrap().to_string();

    let (status, order) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({
            "customer": {"name": "Tin", "address": "Manila", "phone": "0917"},
            "items": [
                {"product_id": chip, "quantity": 2},
                {"product_id": matcha, "quantity": 1}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total"], 420.0);
    assert_eq!(order["status"], "pending");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, product) =
        send_json(server.storefront, Method::GET, &format!("/api/products/{}", chip), None).await;
    assert_eq!(product["stock"], 98);

    let (status, fetched) =
        send_json(server.storefront, Method::GET, &format!("/api/orders/{}", order_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["items"].as_array().unwrap().len(), 2);

    let (status, updated) = send_json(
        server.admin,
        Method::PATCH,
        &format!("/api/admin/orders/{}/status", order_id),
        Some(json!({"status": "shipped"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["order"]["status"], "shipped");

    let (status, body) = send_json(
        server.admin,
        Method::PATCH,
        &format!("/api/admin/orders/{}/status", order_id),
        Some(json!({"status": "teleported"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS");

    let (status, orders) = send_json(server.admin, Method::GET, "/api/admin/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_orders_leave_stock_alone() {
    let server = start().await;
    let (_, list) = send_json(server.storefront, Method::GET, "/api/products", None).await;
    let oat = list[3]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": oat, "quantity": 101}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": "ghost", "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");

    let (status, body) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_ORDER");

    let (_, product) =
        send_json(server.storefront, Method::GET, &format!("/api/products/{}", oat), None).await;
    assert_eq!(product["stock"], 100);
}

// ── Product stream ───────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_sends_initial_then_full_snapshots() {
    let server = start().await;

    let response = send(server.storefront, Method::GET, "/api/products/stream", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut body = response.into_body();
    let mut pending = Vec::new();

    let initial = next_message(&mut body, &mut pending).await;
    assert_eq!(initial.kind(), "initial");
    let p0 = names(&initial);
    assert_eq!(p0.len(), 4);
    wait_for_subscribers(&server.state, 1).await;

    // create X
    let (status, created) = send_json(
        server.admin,
        Method::POST,
        "/api/admin/products",
        Some(json!({"name": "Pistachio", "description": "Nutty", "price": 200, "stock": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let x = created["product"]["id"].as_str().unwrap().to_string();

    let updated = next_message(&mut body, &mut pending).await;
    assert_eq!(updated.kind(), "products-updated");
    let mut expected = p0.clone();
    expected.push("Pistachio".to_string());
    assert_eq!(names(&updated), expected);

    // delete X
    let (status, _) = send_json(
        server.admin,
        Method::DELETE,
        &format!("/api/admin/products/{}", x),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = next_message(&mut body, &mut pending).await;
    assert_eq!(names(&updated), p0);
}

#[tokio::test]
async fn orders_and_stock_changes_reach_the_stream() {
    let server = start().await;
    let response = send(server.storefront, Method::GET, "/api/products/stream", None).await;
    let mut body = response.into_body();
    let mut pending = Vec::new();
    let initial = next_message(&mut body, &mut pending).await;
    let chip = initial.products().unwrap()[0].id.clone();

    let (status, _) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": chip, "quantity": 3}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let after_order = next_message(&mut body, &mut pending).await;
    assert_eq!(after_order.products().unwrap()[0].stock, 97);

    let (status, _) = send_json(
        server.admin,
        Method::PATCH,
        &format!("/api/admin/products/{}/stock", chip),
        Some(json!({"stock": 12})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let after_stock = next_message(&mut body, &mut pending).await;
    assert_eq!(after_stock.products().unwrap()[0].stock, 12);
}

#[tokio::test]
async fn dashboard_stats_reflect_orders_and_subscribers() {
    let server = start().await;
    let response = send(server.storefront, Method::GET, "/api/products/stream", None).await;
    let mut body = response.into_body();
    let mut pending = Vec::new();
    let initial = next_message(&mut body, &mut pending).await;
    let oat = initial.products().unwrap()[3].id.clone();
    wait_for_subscribers(&server.state, 1).await;

    let (status, _) = send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": oat, "quantity": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) =
        send_json(server.admin, Method::GET, "/api/admin/dashboard/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["catalog"]["total_products"], 4);
    assert_eq!(stats["catalog"]["total_orders"], 1);
    assert_eq!(stats["catalog"]["pending_orders"], 1);
    assert_eq!(stats["catalog"]["total_revenue"], 180.0);
    assert_eq!(stats["stream"]["subscribers"], 1);
    assert!(stats["http"]["total_requests"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn stream_read_failure_is_reported_in_band() {
    let server = start().await;
    server.state.db.close().await;

    let response = send(server.storefront, Method::GET, "/api/products/stream", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let mut pending = Vec::new();
    let message = next_message(&mut body, &mut pending).await;
    assert_eq!(message.kind(), "error");

    // the stream ends after the error frame
    let rest = tokio::time::timeout(WAIT, body.collect()).await.unwrap();
    assert_ok!(rest);
    assert_eq!(server.state.broadcaster.subscriber_count(), 0);
}

#[tokio::test]
async fn closed_pool_fails_json_reads_with_500() {
    let server = start().await;
    server.state.db.close().await;

    let (status, body) = send_json(server.storefront, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_err!(server.state.broadcaster.notify_changed().await);
}

// ── Change notifications ─────────────────────────────────────────────────────

#[derive(Default)]
struct CountingNotifier {
    events: Mutex<Vec<ProductsChanged>>,
}

impl ChangeNotifier for CountingNotifier {
    fn products_changed(&self, event: ProductsChanged) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn only_committed_mutations_notify() {
    let pool = connect_in_memory().await.unwrap();
    seed::seed_products(&pool).await.unwrap();
    let config = parse_config("[server]\nbind = \"127.0.0.1\"\n").unwrap();
    let notifier = Arc::new(CountingNotifier::default());
    let server = start_with(AppState::new(pool, config).with_notifier(notifier.clone())).await;

    // rejected writes
    send_json(
        server.admin,
        Method::POST,
        "/api/admin/products",
        Some(json!({"name": "", "description": "x", "price": 1})),
    )
    .await;
    send_json(server.admin, Method::DELETE, "/api/admin/products/ghost", None).await;
    send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": "ghost", "quantity": 1}]})),
    )
    .await;
    assert!(notifier.events.lock().unwrap().is_empty());

    // committed writes
    let (_, created) = send_json(
        server.admin,
        Method::POST,
        "/api/admin/products",
        Some(json!({"name": "Ube", "description": "Purple yam", "price": 150, "stock": 4})),
    )
    .await;
    let id = created["product"]["id"].as_str().unwrap().to_string();
    send_json(
        server.storefront,
        Method::POST,
        "/api/orders",
        Some(json!({"items": [{"product_id": id, "quantity": 1}]})),
    )
    .await;
    send_json(
        server.admin,
        Method::DELETE,
        &format!("/api/admin/products/{}", id),
        None,
    )
    .await;

    let events = notifier.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ProductsChanged::Created { product_id: id.clone() },
            ProductsChanged::StockChanged { product_ids: vec![id.clone()] },
            ProductsChanged::Deleted { product_id: id },
        ]
    );
    // the real broadcaster was bypassed
    assert_eq!(server.state.broadcaster.subscriber_count(), 0);
}

#[tokio::test]
async fn disconnected_stream_is_unregistered_and_mutations_still_succeed() {
    let server = start().await;
    let (response, conn) = open_stream(server.storefront).await;
    let mut body = response.into_body();
    let mut pending = Vec::new();
    assert_eq!(next_message(&mut body, &mut pending).await.kind(), "initial");
    wait_for_subscribers(&server.state, 1).await;

    drop(body);
    conn.abort();

    // The server notices the closed socket on its next write.
    tokio::time::timeout(WAIT, async {
        while server.state.broadcaster.subscriber_count() != 0 {
            server.state.broadcaster.heartbeat();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("closed stream was never unregistered");

    let (status, created) = send_json(
        server.admin,
        Method::POST,
        "/api/admin/products",
        Some(json!({"name": "Lemon", "description": "Zesty", "price": 110})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["product"]["name"], "Lemon");

    let report = assert_ok!(server.state.broadcaster.notify_changed().await);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.pruned, 0);
    assert_eq!(server.state.broadcaster.subscriber_count(), 0);
}
