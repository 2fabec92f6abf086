//! Token revocation (RFC 7009)
//!
//! Only refresh tokens are stored server-side, so only refresh tokens can
//! be revoked. Access tokens expire on their own.
//!
//! # Security Considerations
//!
//! - The endpoint answers 200 for unknown, foreign and already revoked
//!   tokens, so callers cannot probe for token existence
//! - A client may only revoke tokens issued to it
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use serde::{Deserialize, Serialize};

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request per RFC 7009.
///
/// Client credentials may travel in the body (`client_secret_post`) or in
/// an `Authorization: Basic` header handled by the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke.
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

impl RevocationRequest {
    /// Parses the hint, dropping values this server does not know.
    #[must_use]
    pub fn hint(&self) -> Option<TokenTypeHint> {
        self.token_type_hint.as_deref().and_then(TokenTypeHint::parse)
    }
}

/// Token type hint for revocation and introspection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a hint value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
