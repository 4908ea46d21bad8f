//! Credential verification and bootstrap seeding.
//!
//! Passwords are hashed with argon2id at fixed parameters and stored as PHC
//! strings, which embed the per-user salt.

use std::sync::OnceLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use byhub_shared::UserIdentity;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

/// argon2id work factor: 19 MiB memory, 2 passes, 1 lane.
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, None)
        .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Ok(hasher()?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hash verified against when the username does not exist, so an unknown
/// user costs the same as a wrong password.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("byhub-dummy-password").ok())
        .as_deref()
}

/// Verify `password` for a user fetched with [`Database::find_user`].
///
/// Returns `Ok(None)` for both an unknown user and a wrong password. This
/// does the argon2 work and touches no database state, so callers sharing a
/// connection should run it after releasing their lock.
pub fn check_credentials(user: Option<User>, password: &str) -> Result<Option<UserIdentity>> {
    let Some(user) = user else {
        if let Some(dummy) = dummy_hash() {
            let _ = verify_password(password, dummy);
        }
        return Ok(None);
    };

    if !verify_password(password, &user.password_hash)? {
        return Ok(None);
    }

    Ok(Some(UserIdentity {
        id: user.id,
        username: user.username,
    }))
}

impl Database {
    /// Seed the bootstrap admin if the user table is empty.
    ///
    /// Returns `true` when a user was created.
    pub fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<bool> {
        if self.count_users()? > 0 {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        self.insert_user(username, &hash)?;

        tracing::warn!(username, "created bootstrap admin account");
        Ok(true)
    }
}
