//! Token introspection (RFC 7662)
//!
//! Resource servers post a token and learn whether it is active, along
//! with the claims it carries.
//!
//! # Security Considerations
//!
//! - Introspection requires client authentication
//! - An inactive response never says why (expired, revoked or unknown)
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use serde::{Deserialize, Serialize};

use super::claims::AccessClaims;
use super::keys::VerifiedToken;
use super::revocation::TokenTypeHint;
use crate::types::RefreshToken;

/// Token introspection request per RFC 7662.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    #[serde(default)]
    pub token: String,

    /// Optional hint about the token type. Unknown values are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

impl IntrospectionRequest {
    /// Parses the hint, dropping values this server does not know.
    #[must_use]
    pub fn hint(&self) -> Option<TokenTypeHint> {
        self.token_type_hint.as_deref().and_then(TokenTypeHint::parse)
    }
}

/// Token introspection response per RFC 7662.
///
/// If the token is invalid, expired, revoked, or unknown, the response
/// contains only `active: false`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct IntrospectionResponse {
    /// The only required field.
    pub active: bool,

    /// `access_token` or `refresh_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Scope of a refresh token. Access tokens carry theirs in `claims`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Claims echoed from an active access token.
    #[serde(flatten)]
    pub claims: Option<AccessClaims>,
}

impl IntrospectionResponse {
    /// Creates an inactive response.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Describes a verified access token.
    #[must_use]
    pub fn for_access_token(token: VerifiedToken<AccessClaims>) -> Self {
        Self {
            active: true,
            token_type: Some(TokenTypeHint::AccessToken.as_str().to_string()),
            client_id: Some(token.claims.azp.clone()),
            sub: Some(token.sub),
            aud: Some(token.aud),
            iss: Some(token.iss),
            exp: Some(token.exp),
            iat: Some(token.iat),
            jti: Some(token.jti),
            scope: None,
            claims: Some(token.claims),
        }
    }

    /// Describes a live refresh token record.
    #[must_use]
    pub fn for_refresh_token(record: &RefreshToken) -> Self {
        Self {
            active: true,
            token_type: Some(TokenTypeHint::RefreshToken.as_str().to_string()),
            client_id: Some(record.client_id.clone()),
            sub: Some(record.user_id.clone()),
            exp: Some(record.expires_at.unix_timestamp()),
            iat: Some(record.created_at.unix_timestamp()),
            scope: Some(record.scope.clone()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_response_has_only_active() {
        let json = serde_json::to_string(&IntrospectionResponse::inactive()).unwrap();
        assert_eq!(json, r#"{"active":false}"#);
    }

    #[test]
    fn test_access_token_response_flattens_claims() {
        let token = VerifiedToken {
            iss: "https://auth.example.com".to_string(),
            sub: "user-1".to_string(),
            aud: "app-1".to_string(),
            exp: 1_700_003_600,
            iat: 1_700_000_000,
            jti: "j-1".to_string(),
            claims: AccessClaims {
                azp: "crm-web".to_string(),
                scope: "openid organization".to_string(),
                role: Some("admin".to_string()),
                ..AccessClaims::default()
            },
        };

        let json = serde_json::to_value(IntrospectionResponse::for_access_token(token)).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["client_id"], "crm-web");
        assert_eq!(json["scope"], "openid organization");
        assert_eq!(json["role"], "admin");
        assert_eq!(json["token_type"], "access_token");
    }

    #[test]
    fn test_introspection_request_hint() {
        let request: IntrospectionRequest =
            serde_json::from_str(r#"{"token": "x", "token_type_hint": "refresh_token"}"#).unwrap();
        assert_eq!(request.hint(), Some(TokenTypeHint::RefreshToken));
    }
}
