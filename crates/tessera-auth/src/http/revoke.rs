//! Token revocation endpoint handler (RFC 7009).
//!
//! ```text
//! POST /oauth/revoke
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <client_credentials>
//!
//! token=<token_to_revoke>&token_type_hint=refresh_token
//! ```
//!
//! The endpoint always answers 200 with an empty body. A request whose
//! client fails authentication revokes nothing.

use axum::{extract::State, http::StatusCode};

use super::OAuthState;
use super::extract::{BasicCredentials, FormOrJson};
use crate::error::AuthError;
use crate::token::revocation::RevocationRequest;

/// Handler for `POST /oauth/revoke`.
pub async fn revoke_handler(
    State(state): State<OAuthState>,
    basic: Result<BasicCredentials, AuthError>,
    body: Result<FormOrJson<RevocationRequest>, AuthError>,
) -> StatusCode {
    let (Ok(BasicCredentials(basic)), Ok(FormOrJson(request))) = (basic, body) else {
        tracing::debug!("Ignoring malformed revocation request");
        return StatusCode::OK;
    };

    if request.token.is_empty() {
        return StatusCode::OK;
    }

    let client = match state
        .service
        .authenticate(
            basic,
            request.client_id.as_deref(),
            request.client_secret.as_deref(),
        )
        .await
    {
        Ok(authenticated) => authenticated.client,
        Err(e) => {
            tracing::debug!(error = %e, "Revocation without valid client authentication ignored");
            return StatusCode::OK;
        }
    };

    if let Err(e) = state
        .service
        .revoke(&request.token, request.hint(), &client)
        .await
    {
        tracing::error!(client_id = %client.client_id, error = %e, "Token revocation failed");
    }

    StatusCode::OK
}
