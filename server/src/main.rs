use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use storefront_server::AppState;
use storefront_server::database::{self, seed};
use storefront_server::handlers::http::{build_admin_router, build_storefront_router, serve};
use storefront_shared::config::load_config;

/// Cookies by TinTin storefront server
#[derive(Parser, Debug)]
#[clap(name = "storefront")]
#[clap(about = "Product catalog, orders and live product stream", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[clap(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Replace the catalog with the seed cookies before serving
    #[clap(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let db_url = config.database.resolved_url();
    let pool = database::connect(&db_url, config.database.max_connections)
        .await
        .context("Failed to open database")?;
    database::create_tables(&pool)
        .await
        .context("Failed to create tables")?;

    if args.seed {
        let seeded = seed::seed_products(&pool)
            .await
            .context("Failed to seed catalog")?;
        info!("Seeded {} products", seeded.len());
    }

    let storefront_addr = config.server.storefront_addr();
    let admin_addr = config.server.admin_addr();
    let heartbeat = config.stream.heartbeat_interval();

    let state = AppState::new(pool, config);
    let _heartbeat = state.broadcaster.spawn_heartbeat(heartbeat);

    #[cfg(unix)]
    spawn_reload_on_sighup(state.config.clone(), args.config.clone());

    let storefront_listener = TcpListener::bind(&storefront_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", storefront_addr))?;
    let admin_listener = TcpListener::bind(&admin_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", admin_addr))?;

    let storefront = serve(
        storefront_listener,
        Arc::new(build_storefront_router()),
        state.clone(),
        "Storefront",
    );
    let admin = serve(
        admin_listener,
        Arc::new(build_admin_router()),
        state.clone(),
        "Admin",
    );

    tokio::select! {
        result = storefront => result.context("Storefront server stopped")?,
        result = admin => result.context("Admin server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    state.db.close().await;
    info!("Both servers closed!");
    Ok(())
}

/// Re-read the config file on every SIGHUP. Ports and stream settings keep
/// their startup values.
#[cfg(unix)]
fn spawn_reload_on_sighup(live: storefront_shared::config::LiveConfig, path: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("SIGHUP reload unavailable: {}", e);
                return;
            }
        };

        while hangups.recv().await.is_some() {
            match live.reload_from(&path).await {
                Ok(()) => info!("Reloaded config from {}", path.display()),
                Err(e) => error!("Config reload failed, keeping previous config: {}", e),
            }
        }
    });
}
