use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::server_config::AppConfig;

/// Point-in-time snapshot served by `GET /api/admin/dashboard/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub server: ServerInfo,
    pub catalog: CatalogInfo,
    pub stream: StreamInfo,
    pub http: HttpInfo,
    pub runtime: RuntimeInfo,
}

/// Static server configuration values shown in the stats response
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub bind: String,
    pub port_storefront: u16,
    pub port_admin: u16,
}

/// Live database counts (populated at query time)
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogInfo {
    pub total_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub subscribers: usize,
    pub heartbeat_secs: u64,
}

/// Request counters from the HTTP metrics layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpInfo {
    pub total_requests: u64,
    pub active_requests: usize,
    pub error_count: u64,
    pub latency_avg_ms: f64,
    pub latency_p95_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeInfo {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

impl DashboardStats {
    /// Build a stats snapshot from config plus the live counters.
    ///
    /// `config` is typically a short-lived read guard from `LiveConfig`.
    pub fn build(
        config: &AppConfig,
        catalog: CatalogInfo,
        subscribers: usize,
        http: HttpInfo,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            server: ServerInfo {
                bind: config.server.bind.clone(),
                port_storefront: config.server.port_storefront,
                port_admin: config.server.port_admin,
            },
            catalog,
            stream: StreamInfo {
                subscribers,
                heartbeat_secs: config.stream.heartbeat_secs,
            },
            http,
            runtime: RuntimeInfo {
                started_at,
                uptime_secs: (Utc::now() - started_at).num_seconds(),
            },
        }
    }
}
