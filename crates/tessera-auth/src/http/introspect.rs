//! Token introspection endpoint handler (RFC 7662).
//!
//! Client authentication is required. An authenticated caller always gets
//! a 200 with `{"active": ...}`; a failed authentication gets a 401.

use axum::{Json, extract::State, response::IntoResponse};

use super::OAuthState;
use super::extract::{BasicCredentials, FormOrJson};
use crate::error::AuthError;
use crate::token::introspection::{IntrospectionRequest, IntrospectionResponse};

/// Handler for `POST /oauth/introspect`.
///
/// # Errors
///
/// Returns `invalid_client` (401) if client authentication fails, or
/// `invalid_request` if the body cannot be parsed.
pub async fn introspect_handler(
    State(state): State<OAuthState>,
    BasicCredentials(basic): BasicCredentials,
    FormOrJson(request): FormOrJson<IntrospectionRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let authenticated = state
        .service
        .authenticate(
            basic,
            request.client_id.as_deref(),
            request.client_secret.as_deref(),
        )
        .await?;

    if request.token.is_empty() {
        return Ok(Json(IntrospectionResponse::inactive()));
    }

    let response = state.service.introspect(&request.token).await?;
    tracing::debug!(
        client_id = %authenticated.client.client_id,
        hint = ?request.hint(),
        active = response.active,
        "Token introspected"
    );

    Ok(Json(response))
}
