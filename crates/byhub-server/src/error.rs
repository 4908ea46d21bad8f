use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use byhub_shared::ValidationError;
use byhub_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("App not found")]
    AppNotFound,

    #[error("App binary is no longer available")]
    AssetMissing,

    #[error("Package too large (max {max} bytes)")]
    PayloadTooLarge { max: usize },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Analysis unavailable")]
    AnalysisUnavailable,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Asset storage error: {0}")]
    AssetStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::AppNotFound,
            other => ServerError::Store(other.to_string()),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidCredentials | ServerError::MissingToken => StatusCode::UNAUTHORIZED,
            ServerError::InvalidToken => StatusCode::FORBIDDEN,
            ServerError::AppNotFound => StatusCode::NOT_FOUND,
            ServerError::AssetMissing => StatusCode::GONE,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::BadRequest(_) | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::AnalysisUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Store(_) | ServerError::AssetStorage(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Store(detail) => {
                tracing::error!(error = %detail, "store failure");
                "Internal server error".to_string()
            }
            ServerError::AssetStorage(detail) => {
                tracing::error!(error = %detail, "asset storage failure");
                "Asset storage error".to_string()
            }
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "internal failure");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
