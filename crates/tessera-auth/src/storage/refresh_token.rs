//! Refresh token storage trait.
//!
//! This module defines the storage interface for OAuth 2.0 refresh tokens.
//! Every method takes the SHA-256 hash of the token value, see
//! [`RefreshToken::hash_token`].
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Rotation and revocation must be atomic and immediate
//! - Expired tokens should be cleaned up periodically

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{RefreshToken, RotatedGrant};

/// Storage operations for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Store a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if a token with the same hash exists or the storage
    /// operation fails.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Find a token by its hash, regardless of state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Validate a token and revoke it in the same atomic step.
    ///
    /// Returns `None` for unknown, revoked or expired tokens. Of two
    /// concurrent calls with the same hash at most one returns `Some`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn validate_and_rotate(&self, token_hash: &str) -> AuthResult<Option<RotatedGrant>>;

    /// Revoke a token. Returns `true` if this call revoked it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<bool>;

    /// Revoke every live token issued to a client for a user.
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_all_for(&self, client_id: &str, user_id: &str) -> AuthResult<u64>;

    /// Delete expired tokens, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
