//! JWKS endpoint HTTP handler.
//!
//! Provides the `/.well-known/jwks.json` endpoint for JWT verification.
//!
//! # References
//!
//! - [RFC 7517 - JSON Web Key](https://tools.ietf.org/html/rfc7517)

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::OAuthState;

/// Handler for `GET /.well-known/jwks.json`.
///
/// Returns the public signing key. Clients may cache it for an hour.
///
/// # Example Response
///
/// ```json
/// {
///   "keys": [
///     {
///       "kty": "RSA",
///       "kid": "Yt3nWq2v4h0x9lQ1sJ8dEw",
///       "use": "sig",
///       "alg": "RS256",
///       "n": "base64url-encoded-modulus",
///       "e": "AQAB"
///     }
///   ]
/// }
/// ```
pub async fn jwks_handler(State(state): State<OAuthState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(state.service.keys().public_key_set()),
    )
}
