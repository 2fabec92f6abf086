//! Clients, authorization codes and refresh tokens.
//!
//! Consume and rotate run under the map's per-key write lock, so two callers
//! racing on the same code or token see exactly one success.

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_auth::AuthResult;
use tessera_auth::storage::{AuthorizationCodeStorage, ClientStorage, RefreshTokenStorage};
use tessera_auth::types::{AuthorizationCode, Client, ConsumeOutcome, RefreshToken, RotatedGrant};
use time::OffsetDateTime;

/// OAuth clients keyed by `client_id`.
#[derive(Debug, Default)]
pub struct MemoryClientStore {
    clients: DashMap<String, Client>,
}

impl MemoryClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStore {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn save(&self, client: &Client) -> AuthResult<()> {
        self.clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        Ok(self.clients.remove(client_id).is_some())
    }
}

/// Authorization codes keyed by code value.
///
/// Consumed codes stay in the map until they expire so a second presentation
/// is reported as a replay rather than as an unknown code.
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    codes: DashMap<String, AuthorizationCode>,
}

impl MemoryCodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes, consumed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryCodeStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<ConsumeOutcome> {
        let now = OffsetDateTime::now_utc();

        let Some(mut entry) = self.codes.get_mut(code) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        // expiry wins over replay
        if entry.is_expired_at(now) {
            drop(entry);
            self.codes.remove_if(code, |_, c| c.is_expired_at(now));
            return Ok(ConsumeOutcome::NotFound);
        }

        if entry.is_consumed() {
            return Ok(ConsumeOutcome::Replayed {
                client_id: entry.client_id.clone(),
                user_id: entry.user_id.clone(),
            });
        }

        entry.consumed_at = Some(now);
        Ok(ConsumeOutcome::Granted(entry.to_grant()))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.codes.len();
        self.codes.retain(|_, c| !c.is_expired_at(now));
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

/// Refresh token records keyed by token hash.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: DashMap<String, RefreshToken>,
}

impl MemoryRefreshTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unrevoked, unexpired) tokens a client holds for a user.
    #[must_use]
    pub fn live_count(&self, client_id: &str, user_id: &str) -> usize {
        self.tokens
            .iter()
            .filter(|t| t.client_id == client_id && t.user_id == user_id && t.is_valid())
            .count()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token_hash).map(|t| t.value().clone()))
    }

    async fn validate_and_rotate(&self, token_hash: &str) -> AuthResult<Option<RotatedGrant>> {
        let Some(mut token) = self.tokens.get_mut(token_hash) else {
            return Ok(None);
        };
        if !token.is_valid() {
            return Ok(None);
        }
        token.revoked_at = Some(OffsetDateTime::now_utc());
        Ok(Some(token.to_rotated_grant()))
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        Ok(match self.tokens.get_mut(token_hash) {
            Some(mut token) if !token.is_revoked() => {
                token.revoked_at = Some(OffsetDateTime::now_utc());
                true
            }
            _ => false,
        })
    }

    async fn revoke_all_for(&self, client_id: &str, user_id: &str) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for mut token in self.tokens.iter_mut() {
            if token.client_id == client_id && token.user_id == user_id && !token.is_revoked() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired());
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}
