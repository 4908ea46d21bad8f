/// Application name
pub const APP_NAME: &str = "ByHub";

/// Session tokens expire this many seconds after issuance (1 hour)
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// BLAKE3 key derivation context for session token MACs
pub const KDF_CONTEXT_SESSION_KEY: &str = "byhub-session-token-v1";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Maximum package upload size in bytes (200 MiB)
pub const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// Multipart field carrying the package binary
pub const UPLOAD_FILE_FIELD: &str = "apk";

/// Identity seeded on first run when the user table is empty
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";
