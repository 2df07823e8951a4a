use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode};
use tracing::debug;

use crate::AppState;
use crate::handlers::http::{admin, health, orders, products, utils::json_response};
use crate::handlers::sse;

// ---------------------------------------------------------------------------
// Handler type
// ---------------------------------------------------------------------------

type RouteHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

struct Route {
    method: Method,
    path: String,
    handler: RouteHandler,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Method + path table. The first registered match wins, so literal paths
/// must be added before `:param` paths that would also match them.
pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    fn add<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Box::new(move |req, state| Box::pin(handler(req, state))),
        });
        self
    }

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.add(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.add(Method::POST, path, handler)
    }

    pub fn put<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.add(Method::PUT, path, handler)
    }

    pub fn patch<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.add(Method::PATCH, path, handler)
    }

    pub fn delete<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.add(Method::DELETE, path, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == *method && Self::path_matches(&route.path, path))
    }

    /// The registered pattern that would serve `method path`, if any
    pub fn matched_route(&self, method: &Method, path: &str) -> Option<&str> {
        self.find(method, path).map(|route| route.path.as_str())
    }

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        if let Some(route) = self.find(req.method(), req.uri().path()) {
            debug!("{} {} -> {}", req.method(), req.uri().path(), route.path);
            return (route.handler)(req, state).await;
        }

        json_response::deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/products/:id"  matches  "/api/products/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

// ---------------------------------------------------------------------------
// Storefront router (port_storefront)
// ---------------------------------------------------------------------------

pub fn build_storefront_router() -> Router {
    Router::new()
        .get("/health", |req, state| async move {
            health::handle_health(req, state).await
        })
        // `/stream` must precede `/:id`
        .get("/api/products/stream", |req, state| async move {
            sse::handle_product_stream(req, state)
                .await
                .context("Product stream failed")
        })
        .get("/api/products", |req, state| async move {
            products::handle_list_products(req, state)
                .await
                .context("List products failed")
        })
        .get("/api/products/:id", |req, state| async move {
            products::handle_get_product(req, state)
                .await
                .context("Get product failed")
        })
        .post("/api/orders", |req, state| async move {
            orders::handle_place_order(req, state)
                .await
                .context("Place order failed")
        })
        .get("/api/orders/:id", |req, state| async move {
            orders::handle_get_order(req, state)
                .await
                .context("Get order failed")
        })
}

// ---------------------------------------------------------------------------
// Admin router (port_admin): storefront routes plus catalog management
// ---------------------------------------------------------------------------

pub fn build_admin_router() -> Router {
    build_admin_routes(build_storefront_router())
}

pub fn build_admin_routes(router: Router) -> Router {
    router
        .get("/api/admin/products", |req, state| async move {
            admin::handle_admin_list_products(req, state)
                .await
                .context("Admin list products failed")
        })
        .post("/api/admin/products", |req, state| async move {
            admin::handle_create_product(req, state)
                .await
                .context("Create product failed")
        })
        .put("/api/admin/products/:id", |req, state| async move {
            admin::handle_update_product(req, state)
                .await
                .context("Update product failed")
        })
        .delete("/api/admin/products/:id", |req, state| async move {
            admin::handle_delete_product(req, state)
                .await
                .context("Delete product failed")
        })
        .patch("/api/admin/products/:id/stock", |req, state| async move {
            admin::handle_update_stock(req, state)
                .await
                .context("Update stock failed")
        })
        .get("/api/admin/orders", |req, state| async move {
            admin::handle_list_orders(req, state)
                .await
                .context("List orders failed")
        })
        .patch("/api/admin/orders/:id/status", |req, state| async move {
            admin::handle_update_order_status(req, state)
                .await
                .context("Update order status failed")
        })
        .get("/api/admin/dashboard/stats", |req, state| async move {
            admin::handle_dashboard_stats(req, state)
                .await
                .context("Dashboard stats failed")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_path_matches() {
        assert!(Router::path_matches("/api/products", "/api/products"));
    }

    #[test]
    fn different_paths_do_not_match() {
        assert!(!Router::path_matches("/api/products", "/api/orders"));
    }

    #[test]
    fn trailing_slash_does_not_match_without_slash() {
        assert!(!Router::path_matches("/api/products", "/api/products/"));
    }

    #[test]
    fn wildcard_segment_matches_uuid() {
        assert!(Router::path_matches(
            "/api/products/:id",
            "/api/products/5f0c8a9e-1b2c-4d3e-8f90-123456789abc"
        ));
    }

    #[test]
    fn wildcard_does_not_match_empty_segment() {
        assert!(!Router::path_matches("/api/orders/:id", "/api/orders/"));
    }

    #[test]
    fn wildcard_does_not_match_extra_segments() {
        assert!(!Router::path_matches(
            "/api/admin/products/:id",
            "/api/admin/products/42/stock"
        ));
        assert!(Router::path_matches(
            "/api/admin/products/:id/stock",
            "/api/admin/products/42/stock"
        ));
    }

    #[test]
    fn query_string_stripped_before_match() {
        assert!(Router::path_matches("/api/products", "/api/products?fresh=1"));
    }

    #[test]
    fn stream_route_wins_over_product_id() {
        let router = build_storefront_router();
        assert_eq!(
            router.matched_route(&Method::GET, "/api/products/stream"),
            Some("/api/products/stream")
        );
        assert_eq!(
            router.matched_route(&Method::GET, "/api/products/abc"),
            Some("/api/products/:id")
        );
    }

    #[test]
    fn storefront_has_no_admin_routes() {
        let router = build_storefront_router();
        assert_eq!(router.matched_route(&Method::GET, "/api/admin/products"), None);
        assert_eq!(router.matched_route(&Method::POST, "/api/admin/products"), None);
        assert_eq!(router.matched_route(&Method::GET, "/api/admin/dashboard/stats"), None);
    }

    #[test]
    fn admin_router_serves_storefront_and_admin_routes() {
        let router = build_admin_router();
        assert_eq!(router.matched_route(&Method::GET, "/health"), Some("/health"));
        assert_eq!(
            router.matched_route(&Method::GET, "/api/products/stream"),
            Some("/api/products/stream")
        );
        assert_eq!(
            router.matched_route(&Method::PATCH, "/api/admin/products/1/stock"),
            Some("/api/admin/products/:id/stock")
        );
        assert_eq!(
            router.matched_route(&Method::PATCH, "/api/admin/orders/1/status"),
            Some("/api/admin/orders/:id/status")
        );
        assert_eq!(
            router.matched_route(&Method::DELETE, "/api/admin/products/1"),
            Some("/api/admin/products/:id")
        );
    }

    #[test]
    fn method_mismatch_does_not_match() {
        let router = build_admin_router();
        assert_eq!(router.matched_route(&Method::DELETE, "/api/products/1"), None);
        assert_eq!(router.matched_route(&Method::PUT, "/api/orders"), None);
    }

    #[test]
    fn router_new_has_no_routes() {
        assert!(Router::new().routes.is_empty());
    }
}
