//! OpenID Connect UserInfo endpoint.
//!
//! Returns the claims the access token's scopes allow:
//!
//! - `profile`: `name`, `picture`
//! - `email`: `email`, `email_verified` (looked up fresh)
//! - `organization`: `entity_id`, `entity_name`, `entity_slug`, `role`
//!
//! # References
//!
//! - [OpenID Connect UserInfo](https://openid.net/specs/openid-connect-core-1_0.html#UserInfo)

use axum::{Json, extract::State, response::IntoResponse};

use super::OAuthState;
use super::extract::BearerToken;
use crate::error::AuthError;

/// Handler for `GET|POST /oauth/userinfo`.
///
/// # Errors
///
/// Returns `VerificationError` (401 with
/// `WWW-Authenticate: Bearer error="invalid_token"`) if the token is
/// missing, invalid or expired.
pub async fn userinfo_handler(
    State(state): State<OAuthState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(state.service.userinfo(&token).await?))
}
