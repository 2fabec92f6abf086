//! OpenID Connect discovery document.
//!
//! Endpoint URLs are built from the configured issuer, never from the bind
//! address or request host.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

use super::OAuthState;
use crate::oauth::client_auth::TokenEndpointAuthMethod;
use crate::oauth::pkce::PkceChallengeMethod;
use crate::oauth::scope::SUPPORTED_SCOPES;
use crate::token::keys::SIGNING_ALGORITHM;
use crate::types::GrantType;

/// Claim names that may appear in issued tokens or userinfo.
pub const CLAIMS_SUPPORTED: [&str; 23] = [
    "iss",
    "sub",
    "aud",
    "exp",
    "iat",
    "jti",
    "azp",
    "nonce",
    "scope",
    "name",
    "picture",
    "email",
    "email_verified",
    "entity_id",
    "entity_name",
    "entity_slug",
    "role",
    "permissions",
    "app_scopes",
    "licensed_apps",
    "impersonator",
    "client_id",
    "token_type",
];

/// OpenID Provider Metadata.
#[derive(Debug, Clone, Serialize)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    pub revocation_endpoint: String,
    pub introspection_endpoint: String,
    pub scopes_supported: Vec<&'static str>,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub subject_types_supported: Vec<&'static str>,
    pub id_token_signing_alg_values_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub claims_supported: Vec<&'static str>,
}

impl OpenIdConfiguration {
    /// Builds the document for `issuer`.
    #[must_use]
    pub fn build(issuer: &str) -> Self {
        let base = issuer.trim_end_matches('/');

        Self {
            issuer: base.to_string(),
            authorization_endpoint: format!("{base}/oauth/authorize"),
            token_endpoint: format!("{base}/oauth/token"),
            userinfo_endpoint: format!("{base}/oauth/userinfo"),
            jwks_uri: format!("{base}/.well-known/jwks.json"),
            revocation_endpoint: format!("{base}/oauth/revoke"),
            introspection_endpoint: format!("{base}/oauth/introspect"),
            scopes_supported: SUPPORTED_SCOPES.to_vec(),
            response_types_supported: vec!["code"],
            grant_types_supported: vec![
                GrantType::AuthorizationCode.as_str(),
                GrantType::RefreshToken.as_str(),
            ],
            subject_types_supported: vec!["public"],
            id_token_signing_alg_values_supported: vec![SIGNING_ALGORITHM],
            code_challenge_methods_supported: vec![
                PkceChallengeMethod::S256.as_str(),
                PkceChallengeMethod::Plain.as_str(),
            ],
            token_endpoint_auth_methods_supported: TokenEndpointAuthMethod::ALL
                .iter()
                .map(TokenEndpointAuthMethod::as_str)
                .collect(),
            claims_supported: CLAIMS_SUPPORTED.to_vec(),
        }
    }
}

/// Handler for `GET /.well-known/openid-configuration`.
pub async fn openid_configuration_handler(State(state): State<OAuthState>) -> impl IntoResponse {
    Json(OpenIdConfiguration::build(state.service.keys().issuer()))
}
