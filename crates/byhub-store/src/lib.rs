//! # byhub-store
//!
//! Persistent storage for the ByHub catalog, backed by a single SQLite file.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides the catalog operations (package
//! records) and the credential operations (admin users with argon2id
//! password hashes).

pub mod apps;
pub mod credentials;
pub mod database;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use credentials::{check_credentials, hash_password, verify_password};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
