use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_storefront_port")]
    pub port_storefront: u16,
    #[serde(default = "default_admin_port")]
    pub port_admin: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite://cookies.db`.
    ///
    /// The `DATABASE_URL` environment variable takes priority, see
    /// [`DatabaseConfig::resolved_url`].
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

/// Live product stream tuning.
///
/// **Hot-reload safe:** NO. The heartbeat task and the per-client buffer size
/// are fixed when the server starts.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Frames a single subscriber may have queued before it is treated as
    /// unresponsive and dropped from the registry.
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address for the storefront server, e.g. `"0.0.0.0:5000"`
    pub fn storefront_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port_storefront)
    }

    /// Full bind address for the admin server, e.g. `"0.0.0.0:5001"`
    pub fn admin_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port_admin)
    }
}

impl DatabaseConfig {
    /// Resolve the database URL with `DATABASE_URL` env-var taking priority
    /// over the config file field.
    pub fn resolved_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.url.clone())
    }
}

impl StreamConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_pool_size(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            client_buffer: default_client_buffer(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_storefront_port() -> u16 {
    5000
}

pub fn default_admin_port() -> u16 {
    5001
}

pub fn default_database_url() -> String {
    "sqlite://cookies.db".to_string()
}

pub fn default_pool_size() -> u32 {
    5
}

pub fn default_heartbeat_secs() -> u64 {
    30
}

pub fn default_client_buffer() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: AppConfig = toml::from_str("[server]\nbind = \"127.0.0.1\"\n").unwrap();
        assert_eq!(cfg.server.port_storefront, 5000);
        assert_eq!(cfg.server.port_admin, 5001);
        assert_eq!(cfg.database.url, "sqlite://cookies.db");
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.stream.heartbeat_secs, 30);
        assert_eq!(cfg.stream.client_buffer, 32);
    }

    #[test]
    fn addresses_join_bind_and_port() {
        let cfg: AppConfig = toml::from_str(
            "[server]\nbind = \"0.0.0.0\"\nport_storefront = 8080\nport_admin = 8081\n",
        )
        .unwrap();
        assert_eq!(cfg.server.storefront_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.server.admin_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn heartbeat_interval_is_in_seconds() {
        let stream = StreamConfig {
            heartbeat_secs: 15,
            client_buffer: 4,
        };
        assert_eq!(stream.heartbeat_interval(), Duration::from_secs(15));
    }
}
