//! OAuth 2.0 client domain types.
//!
//! Clients are owned by an App and provisioned outside the token lifecycle.
//! The secret is only ever held as an Argon2 PHC hash.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types supported by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 client registration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Argon2 PHC hash of the client secret. `None` marks a public client.
    #[serde(default, skip_serializing)]
    pub client_secret_hash: Option<String>,

    /// Identifier of the App that owns this client. Used as the access
    /// token audience.
    pub app_id: String,

    /// Human-readable display name.
    pub name: String,

    /// Allowed redirect URIs, matched exactly.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// Scopes this client may be granted. Empty means all supported scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    /// Whether this client can currently authenticate.
    pub active: bool,
}

impl Client {
    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns the first rule the registration breaks.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.app_id.is_empty() {
            return Err(ClientValidationError::EmptyAppId);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        for lifetime in [self.access_token_lifetime, self.refresh_token_lifetime]
            .into_iter()
            .flatten()
        {
            if lifetime <= 0 {
                return Err(ClientValidationError::InvalidLifetime(lifetime));
            }
        }

        Ok(())
    }

    /// Returns `true` if the client holds a secret.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_secret_hash.is_some()
    }

    /// Checks if the given redirect URI is registered for this client.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns the access token lifetime in seconds, or `default`.
    #[must_use]
    pub fn access_token_lifetime_secs(&self, default: i64) -> i64 {
        self.access_token_lifetime.unwrap_or(default)
    }

    /// Returns the refresh token lifetime in seconds, or `default`.
    #[must_use]
    pub fn refresh_token_lifetime_secs(&self, default: i64) -> i64 {
        self.refresh_token_lifetime.unwrap_or(default)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field(
                "client_secret_hash",
                &self.client_secret_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("app_id", &self.app_id)
            .field("name", &self.name)
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .field("scopes", &self.scopes)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("active", &self.active)
            .finish()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Every client belongs to an App.
    #[error("Client must belong to an app")]
    EmptyAppId,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Token lifetimes must be positive.
    #[error("Token lifetime must be positive, got {0}")]
    InvalidLifetime(i64),
}

// =============================================================================
// Tests
// =============================================================================
