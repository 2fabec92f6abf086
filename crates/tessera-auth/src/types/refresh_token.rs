//! Refresh token domain type.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Every successful refresh revokes the presented token (rotation)
//! - Tokens can be revoked individually or per client and user

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::directory::Impersonator;

/// Prefix identifying refresh token values.
pub const REFRESH_TOKEN_PREFIX: &str = "rt_";

/// Refresh token record.
///
/// The token value itself is never stored. When validating a token:
///
/// 1. Hash the incoming token
/// 2. Look up by hash
/// 3. Check expiry and revocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// SHA-256 hex hash of the token value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// User who authorized the grant.
    pub user_id: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Preserved across rotations so refreshed tokens keep the marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<Impersonator>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is neither expired nor revoked.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Hash a token value using SHA-256.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Generate a token value: `rt_` followed by 32 random bytes as base64url.
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        format!("{REFRESH_TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns `true` if `value` looks like a refresh token.
    #[must_use]
    pub fn has_prefix(value: &str) -> bool {
        value.starts_with(REFRESH_TOKEN_PREFIX)
    }

    /// The grant data released by a successful rotation.
    #[must_use]
    pub fn to_rotated_grant(&self) -> RotatedGrant {
        RotatedGrant {
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
            scope: self.scope.clone(),
            impersonator: self.impersonator.clone(),
        }
    }
}

/// Data carried forward from a rotated refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedGrant {
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub impersonator: Option<Impersonator>,
}
