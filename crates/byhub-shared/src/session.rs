//! Signed, time-limited session tokens.
//!
//! A token is `base64url(claims_json) "." base64url(mac)`, where the MAC is a
//! keyed BLAKE3 hash of the encoded claims. The key is derived from the
//! process-wide session secret, so the issuer holds no other state and there
//! is no revocation: a token stays valid until its `exp`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{KDF_CONTEXT_SESSION_KEY, SESSION_TTL_SECS};
use crate::error::SessionError;
use crate::types::UserIdentity;

/// Claims carried by a session token. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.sub,
            username: self.username.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    key: [u8; 32],
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer").finish_non_exhaustive()
    }
}

impl SessionIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(KDF_CONTEXT_SESSION_KEY, secret),
        }
    }

    pub fn issue(&self, identity: &UserIdentity) -> String {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &UserIdentity, now: DateTime<Utc>) -> String {
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: identity.id,
            username: identity.username.clone(),
            iat,
            exp: iat + SESSION_TTL_SECS,
        };

        // Serializing a struct of plain fields cannot fail.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = blake3::keyed_hash(&self.key, payload.as_bytes());

        format!("{payload}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes()))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature first, then expiry. A token is accepted up to and
    /// including its `exp` second and rejected strictly after.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        let (payload, mac_b64) = token.split_once('.').ok_or(SessionError::Malformed)?;

        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| SessionError::Malformed)?;
        let mac: [u8; 32] = mac_bytes
            .try_into()
            .map_err(|_| SessionError::Malformed)?;

        // blake3::Hash equality is constant-time.
        let expected = blake3::keyed_hash(&self.key, payload.as_bytes());
        if expected != blake3::Hash::from(mac) {
            return Err(SessionError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;

        if now.timestamp() > claims.exp {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }
}
