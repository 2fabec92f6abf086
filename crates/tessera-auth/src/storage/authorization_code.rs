//! Authorization code storage trait.
//!
//! # Security Considerations
//!
//! - `consume` must check and mark in one atomic step. Two concurrent
//!   consumers of the same code must never both observe it unconsumed.
//! - A consumed code is kept until it expires so replays can be told apart
//!   from unknown codes.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{AuthorizationCode, ConsumeOutcome};

/// Storage operations for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Persist a freshly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Atomically consume a code.
    ///
    /// - Unknown code: [`ConsumeOutcome::NotFound`]
    /// - Expired code: deleted, then [`ConsumeOutcome::NotFound`]
    /// - Already consumed: [`ConsumeOutcome::Replayed`]
    /// - Otherwise: marked consumed, [`ConsumeOutcome::Granted`]
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<ConsumeOutcome>;

    /// Delete expired codes, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
