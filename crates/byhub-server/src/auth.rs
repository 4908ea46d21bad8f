//! Bearer-token authentication for mutating endpoints.
//!
//! Handlers that take an [`AdminSession`] argument only run for requests
//! carrying a valid `Authorization: Bearer <token>` header. A missing header
//! is rejected with 401, anything else that fails verification with 403.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;

use byhub_shared::SessionClaims;

use crate::api::AppState;
use crate::error::ServerError;

/// Proof that the request was made by an authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let claims = state.catalog.sessions().verify(token).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            ServerError::InvalidToken
        })?;

        Ok(AdminSession(claims))
    }
}

/// Extract the token from the `Authorization` header.
///
/// An absent header is [`ServerError::MissingToken`]; a header that is not a
/// bearer credential is treated like a bad token.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ServerError> {
    let value = headers.get(AUTHORIZATION).ok_or(ServerError::MissingToken)?;
    let value = value.to_str().map_err(|_| ServerError::InvalidToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(ServerError::InvalidToken)?;

    if token.is_empty() {
        return Err(ServerError::InvalidToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(v) = value {
            map.insert(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers(Some("bearer abc"))).unwrap(), "abc");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            bearer_token(&headers(None)),
            Err(ServerError::MissingToken)
        ));
    }

    #[test]
    fn test_wrong_scheme() {
        for v in ["Basic YWRtaW46YWRtaW4xMjM=", "Bearer ", "abc.def"] {
            assert!(matches!(
                bearer_token(&headers(Some(v))),
                Err(ServerError::InvalidToken)
            ));
        }
    }
}
