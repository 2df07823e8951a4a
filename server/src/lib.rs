//! Cookies by TinTin storefront server.
//!
//! Product catalog and order REST endpoints, plus a server-sent events
//! stream that pushes the full catalog to every open client after each
//! committed product or stock change.

pub mod database;
pub mod handlers;
pub mod services;
pub mod tower_middle;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use storefront_shared::config::LiveConfig;
use storefront_shared::types::server_config::AppConfig;

use handlers::sse::{ChangeNotifier, ProductBroadcaster};
use tower_middle::Metrics;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: LiveConfig,
    pub broadcaster: ProductBroadcaster<SqlitePool>,
    /// What mutation handlers report committed changes to.
    pub notifier: Arc<dyn ChangeNotifier>,
    pub metrics: Metrics,
    /// Per-subscriber frame buffer, fixed at startup.
    pub stream_buffer: usize,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State whose notifier is the product broadcaster itself.
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let broadcaster = ProductBroadcaster::new(db.clone());
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(broadcaster.clone());
        Self {
            db,
            stream_buffer: config.stream.client_buffer,
            config: LiveConfig::new(config),
            broadcaster,
            notifier,
            metrics: Metrics::new(),
            started_at: Utc::now(),
        }
    }

    /// Replace the change notifier, keeping everything else.
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
