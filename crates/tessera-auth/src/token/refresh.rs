//! Refresh token issuance and rotation.
//!
//! Callers deal in plaintext token values; only hashes reach storage.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::storage::RefreshTokenStorage;
use crate::types::{Impersonator, RefreshToken, RotatedGrant};

/// Refresh token operations over a storage backend.
#[derive(Clone)]
pub struct RefreshTokens {
    storage: Arc<dyn RefreshTokenStorage>,
}

impl RefreshTokens {
    #[must_use]
    pub fn new(storage: Arc<dyn RefreshTokenStorage>) -> Self {
        Self { storage }
    }

    /// Issues a token for `client_id` and `user_id` and returns its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn issue(
        &self,
        client_id: &str,
        user_id: &str,
        scope: &str,
        impersonator: Option<Impersonator>,
        ttl_seconds: i64,
    ) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let value = RefreshToken::generate_token();

        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&value),
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            scope: scope.to_string(),
            impersonator,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            revoked_at: None,
        };

        self.storage.create(&record).await?;
        Ok(value)
    }

    /// Validates `token` and revokes it in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn validate_and_rotate(&self, token: &str) -> AuthResult<Option<RotatedGrant>> {
        self.storage
            .validate_and_rotate(&RefreshToken::hash_token(token))
            .await
    }

    /// Looks up the record for `token`, regardless of state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn find(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        self.storage
            .find_by_hash(&RefreshToken::hash_token(token))
            .await
    }

    /// Revokes `token`. Returns `true` if this call revoked it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
        self.storage.revoke(&RefreshToken::hash_token(token)).await
    }

    /// Revokes every live token a client holds for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_all_for(&self, client_id: &str, user_id: &str) -> AuthResult<u64> {
        self.storage.revoke_all_for(client_id, user_id).await
    }

    /// Deletes expired tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.storage.cleanup_expired().await
    }
}
