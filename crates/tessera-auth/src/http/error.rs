//! OAuth error responses.
//!
//! `AuthError` renders as the RFC 6749 Section 5.2 body
//! `{"error": ..., "error_description": ...}` with `Cache-Control: no-store`.
//! Verification failures add `WWW-Authenticate: Bearer error="invalid_token"`
//! (RFC 6750 Section 3).

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::token::TokenErrorBody;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        if self.is_server_error() {
            tracing::error!(error = %self, "Request failed with server error");
        } else if self.is_security_event() {
            tracing::warn!(error = %self, "Security event");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut headers = no_store_headers();
        if matches!(self, AuthError::VerificationError { .. }) {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Bearer error="invalid_token""#),
            );
        }

        (status, headers, Json(TokenErrorBody::from(&self))).into_response()
    }
}

/// `Cache-Control: no-store` and `Pragma: no-cache`, required on token
/// responses by RFC 6749 Section 5.1.
pub(crate) fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Status for an error returned by the token endpoint.
///
/// `invalid_client` is 401 only when the client authenticated with an
/// `Authorization` header (RFC 6749 Section 5.2); body credentials get 400.
pub(crate) fn token_error_status(error: &AuthError, used_basic: bool) -> StatusCode {
    match error {
        AuthError::InvalidClient { .. } if !used_basic => StatusCode::BAD_REQUEST,
        _ => error.http_status(),
    }
}

/// Returns `true` for statuses where a Basic challenge should be sent.
pub(crate) fn wants_basic_challenge(status: StatusCode, used_basic: bool) -> bool {
    used_basic && status == StatusCode::UNAUTHORIZED
}
