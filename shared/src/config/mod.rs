pub mod config;

pub use self::config::{load_config, parse_config};

use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::server_config::{AppConfig, ConfigError};

/// Shared handle to the running configuration.
///
/// Clones point at one `RwLock<AppConfig>`. Ports and `[stream]` are consumed
/// at startup, so a reload only affects values read per request (the
/// dashboard's server section, for one).
#[derive(Clone, Debug)]
pub struct LiveConfig(Arc<RwLock<AppConfig>>);

impl LiveConfig {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Short-lived read guard; copy values out before awaiting.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.0.read().await
    }

    pub async fn reload(&self, new: AppConfig) {
        *self.0.write().await = new;
    }

    /// Load and validate `path`, then swap it in. A file that fails to load
    /// leaves the current config in place.
    pub async fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let fresh = load_config(path)?;
        self.reload(fresh).await;
        Ok(())
    }
}
