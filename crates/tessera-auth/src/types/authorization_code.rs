//! Authorization code domain types.
//!
//! A code binds one client, one user, the redirect URI used at the
//! authorize step, the granted scope and optional PKCE challenge and nonce.
//! It lives for a fixed window and may be exchanged exactly once.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::directory::Impersonator;

/// Absolute lifetime of an authorization code.
pub const AUTHORIZATION_CODE_TTL: Duration = Duration::minutes(10);

/// Input for recording a new authorization code.
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub nonce: Option<String>,
    pub impersonator: Option<Impersonator>,
}

/// A persisted authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The opaque code value handed to the client.
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<Impersonator>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Set on the first successful consume.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Builds a fresh, unconsumed code expiring after `ttl`.
    #[must_use]
    pub fn new(input: NewAuthorizationCode, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            code: Self::generate_code(),
            client_id: input.client_id,
            user_id: input.user_id,
            redirect_uri: input.redirect_uri,
            scope: input.scope,
            code_challenge: input.code_challenge,
            code_challenge_method: input.code_challenge_method,
            nonce: input.nonce,
            impersonator: input.impersonator,
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    /// Generates 32 random bytes encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` once the code has been exchanged.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// The data handed back to the token service on a successful consume.
    #[must_use]
    pub fn to_grant(&self) -> AuthorizationGrant {
        AuthorizationGrant {
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            code_challenge: self.code_challenge.clone(),
            code_challenge_method: self.code_challenge_method.clone(),
            nonce: self.nonce.clone(),
            impersonator: self.impersonator.clone(),
        }
    }
}

/// Bound data released by a successful consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub nonce: Option<String>,
    pub impersonator: Option<Impersonator>,
}

/// Result of consuming an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// First use of a live code.
    Granted(AuthorizationGrant),
    /// Unknown or expired code. Expired codes are deleted.
    NotFound,
    /// The code was already consumed. Carries the owners so the caller can
    /// revoke their refresh tokens.
    Replayed { client_id: String, user_id: String },
}
