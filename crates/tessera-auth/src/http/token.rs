//! OAuth 2.0 Token endpoint handler.
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=my-app
//! ```
//!
//! JSON bodies are accepted as well. Every response, success or error,
//! carries `Cache-Control: no-store` and `Pragma: no-cache`.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use super::OAuthState;
use super::error::{no_store_headers, token_error_status, wants_basic_challenge};
use super::extract::{BasicCredentials, FormOrJson};
use crate::error::AuthError;
use crate::oauth::token::TokenRequest;

/// Handler for `POST /oauth/token`.
///
/// Clients authenticate with an `Authorization: Basic` header, with
/// `client_id` and `client_secret` in the body, or (public clients) with
/// `client_id` alone.
pub async fn token_handler(
    State(state): State<OAuthState>,
    basic: Result<BasicCredentials, AuthError>,
    body: Result<FormOrJson<TokenRequest>, AuthError>,
) -> Response {
    let used_basic = !matches!(basic, Ok(BasicCredentials(None)));

    let result = match (basic, body) {
        (Ok(BasicCredentials(basic)), Ok(FormOrJson(request))) => {
            state.service.handle(request, basic).await
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match result {
        Ok(response) => (StatusCode::OK, no_store_headers(), Json(response)).into_response(),
        Err(error) => {
            let status = token_error_status(&error, used_basic);
            let mut response = error.into_response();
            *response.status_mut() = status;
            if wants_basic_challenge(status, used_basic) {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="tessera""#),
                );
            }
            response
        }
    }
}
