use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status. `message` is the
    /// server's `{"error": ...}` text when present.
    #[error("Server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// Whether the failure means the session must be re-established.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::NotLoggedIn | ClientError::Http { status: 401 | 403, .. }
        )
    }
}
