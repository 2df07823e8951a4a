use std::fs;
use std::path::Path;

use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError};

/// Read, parse and validate the TOML file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(contents)?;
    debug!("Parsed config: {:?}", config);

    validate_config(&config)?;
    info!(
        "Config validated: storefront {}, admin {}",
        config.server.storefront_addr(),
        config.server.admin_addr()
    );

    Ok(config)
}

fn invalid(reason: &str) -> Result<(), ConfigError> {
    Err(ConfigError::InvalidConfig(reason.to_string()))
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.bind.trim().is_empty() {
        return invalid("server.bind cannot be empty");
    }
    if server.port_storefront == server.port_admin {
        return invalid("server.port_storefront and server.port_admin must differ");
    }

    let database = &config.database;
    if database.resolved_url().trim().is_empty() {
        return invalid("database url must be set via the DATABASE_URL env var or database.url");
    }
    if database.max_connections == 0 {
        return invalid("database.max_connections must be greater than 0");
    }

    let stream = &config.stream;
    if stream.heartbeat_secs == 0 {
        return invalid("stream.heartbeat_secs must be greater than 0");
    }
    if stream.client_buffer == 0 {
        return invalid("stream.client_buffer must be greater than 0");
    }

    Ok(())
}
