//! # byhub-server
//!
//! Catalog portal for Android app packages.
//!
//! This binary provides:
//! - **Public catalog** listing and package download
//! - **Admin API** for uploading, editing and removing catalog entries,
//!   guarded by signed session tokens
//! - **Advisory analysis** of package metadata through an optional external
//!   service

mod analyzer;
mod api;
mod asset_store;
mod auth;
mod catalog;
mod config;
mod error;

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use byhub_shared::constants::APP_NAME;
use byhub_shared::SessionIssuer;
use byhub_store::Database;

use crate::analyzer::{DisabledAnalyzer, HttpAnalyzer, SafetyAnalyzer};
use crate::api::AppState;
use crate::asset_store::AssetStore;
use crate::catalog::CatalogService;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,byhub_server=debug")),
        )
        .init();

    info!("Starting {} catalog server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    if config.uses_dev_secret() {
        warn!("SESSION_SECRET is not set; session tokens are signed with the development secret");
    }

    // -----------------------------------------------------------------------
    // 3. Open stores
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;
    let seeded = db.ensure_bootstrap_admin(&config.bootstrap_username, &config.bootstrap_password)?;
    if seeded && config.uses_default_password() {
        warn!(
            username = %config.bootstrap_username,
            "Bootstrap admin uses the default password; set BOOTSTRAP_ADMIN_PASSWORD"
        );
    }

    let assets = AssetStore::new(config.asset_storage_path.clone(), config.max_upload_size).await?;

    let analyzer: Arc<dyn SafetyAnalyzer> = match &config.analyzer_url {
        Some(url) => {
            info!(endpoint = %url, "Advisory analysis enabled");
            Arc::new(HttpAnalyzer::new(
                url.clone(),
                config.analyzer_api_key.clone(),
                config.analyzer_timeout,
            )?)
        }
        None => {
            info!("ANALYZER_URL not set; advisory analysis disabled");
            Arc::new(DisabledAnalyzer)
        }
    };

    let catalog = CatalogService::new(
        Arc::new(Mutex::new(db)),
        Arc::new(assets),
        SessionIssuer::new(config.session_secret.as_bytes()),
        analyzer,
    );

    let http_addr = config.http_addr;
    let app_state = AppState {
        catalog,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
