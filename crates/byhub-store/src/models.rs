//! Row models that carry more than the API-facing types in `byhub-shared`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use byhub_shared::PackageRecord;

/// A package record together with its internal asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredApp {
    pub record: PackageRecord,
    /// Name of the binary in the asset store. Never exposed to clients.
    pub asset_ref: String,
}

/// An administrator account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// argon2id PHC string (algorithm, parameters, salt and hash).
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
