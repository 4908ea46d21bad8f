//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development. The defaults for the session secret
//! and the bootstrap password are public; `main` warns when they are in use.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use byhub_shared::constants::{
    BOOTSTRAP_ADMIN_PASSWORD, BOOTSTRAP_ADMIN_USERNAME, DEFAULT_HTTP_PORT, MAX_UPLOAD_SIZE,
};

/// Development-only signing secret.
pub const DEV_SESSION_SECRET: &str = "byhub-dev-session-secret";

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3001`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./byhub.db`
    pub database_path: PathBuf,

    /// Directory where uploaded package binaries are stored.
    /// Env: `ASSET_STORAGE_PATH`
    /// Default: `./uploads`
    pub asset_storage_path: PathBuf,

    /// Secret used to sign session tokens.
    /// Env: `SESSION_SECRET`
    /// Default: [`DEV_SESSION_SECRET`] (development only).
    pub session_secret: String,

    /// Maximum package size in bytes, also the request body limit.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 200 MiB
    pub max_upload_size: usize,

    /// Identity seeded into an empty user table.
    /// Env: `BOOTSTRAP_ADMIN_USERNAME`, `BOOTSTRAP_ADMIN_PASSWORD`
    /// Default: `admin` / `admin123`
    pub bootstrap_username: String,
    pub bootstrap_password: String,

    /// Endpoint of the advisory analysis service. Analysis is unavailable
    /// when unset.
    /// Env: `ANALYZER_URL`
    pub analyzer_url: Option<String>,

    /// Bearer key sent to the analysis service.
    /// Env: `ANALYZER_API_KEY`
    pub analyzer_api_key: Option<String>,

    /// Env: `ANALYZER_TIMEOUT_SECS`
    /// Default: `20`
    pub analyzer_timeout: Duration,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("asset_storage_path", &self.asset_storage_path)
            .field("max_upload_size", &self.max_upload_size)
            .field("bootstrap_username", &self.bootstrap_username)
            .field("analyzer_url", &self.analyzer_url)
            .field("analyzer_timeout", &self.analyzer_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./byhub.db"),
            asset_storage_path: PathBuf::from("./uploads"),
            session_secret: DEV_SESSION_SECRET.to_string(),
            max_upload_size: MAX_UPLOAD_SIZE,
            bootstrap_username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
            bootstrap_password: BOOTSTRAP_ADMIN_PASSWORD.to_string(),
            analyzer_url: None,
            analyzer_api_key: None,
            analyzer_timeout: Duration::from_secs(20),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("ASSET_STORAGE_PATH") {
            config.asset_storage_path = PathBuf::from(path);
        }

        if let Some(secret) = lookup("SESSION_SECRET").filter(|s| !s.is_empty()) {
            config.session_secret = secret;
        }

        if let Some(val) = lookup("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(name) = lookup("BOOTSTRAP_ADMIN_USERNAME").filter(|s| !s.is_empty()) {
            config.bootstrap_username = name;
        }

        if let Some(password) = lookup("BOOTSTRAP_ADMIN_PASSWORD").filter(|s| !s.is_empty()) {
            config.bootstrap_password = password;
        }

        config.analyzer_url = lookup("ANALYZER_URL").filter(|s| !s.is_empty());
        config.analyzer_api_key = lookup("ANALYZER_API_KEY").filter(|s| !s.is_empty());

        if let Some(val) = lookup("ANALYZER_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.analyzer_timeout = Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid ANALYZER_TIMEOUT_SECS, using default")
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }

    pub fn uses_default_password(&self) -> bool {
        self.bootstrap_password == BOOTSTRAP_ADMIN_PASSWORD
    }
}
