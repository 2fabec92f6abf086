//! In-process storage doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::storage::{AuthorizationCodeStorage, ClientStorage, RefreshTokenStorage};
use crate::types::{AuthorizationCode, Client, ConsumeOutcome, RefreshToken, RotatedGrant};

pub(crate) const TEST_KEY: &str = include_str!("../tests/fixtures/signing_key.pem");

#[derive(Default)]
pub(crate) struct MockClientStorage {
    pub clients: Mutex<HashMap<String, Client>>,
}

#[async_trait]
impl ClientStorage for MockClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.lock().unwrap().get(client_id).cloned())
    }

    async fn save(&self, client: &Client) -> AuthResult<()> {
        self.clients
            .lock()
            .unwrap()
            .insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        Ok(self.clients.lock().unwrap().remove(client_id).is_some())
    }
}

#[derive(Default)]
pub(crate) struct MockCodeStorage {
    pub codes: Mutex<HashMap<String, AuthorizationCode>>,
}

#[async_trait]
impl AuthorizationCodeStorage for MockCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes
            .lock()
            .unwrap()
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<ConsumeOutcome> {
        let mut codes = self.codes.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        Ok(match codes.get_mut(code) {
            None => ConsumeOutcome::NotFound,
            Some(entry) if entry.is_expired_at(now) => {
                codes.remove(code);
                ConsumeOutcome::NotFound
            }
            Some(entry) if entry.is_consumed() => ConsumeOutcome::Replayed {
                client_id: entry.client_id.clone(),
                user_id: entry.user_id.clone(),
            },
            Some(entry) => {
                entry.consumed_at = Some(now);
                ConsumeOutcome::Granted(entry.to_grant())
            }
        })
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired_at(now));
        Ok((before - codes.len()) as u64)
    }
}

#[derive(Default)]
pub(crate) struct MockRefreshStorage {
    pub tokens: Mutex<HashMap<String, RefreshToken>>,
}

#[async_trait]
impl RefreshTokenStorage for MockRefreshStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.lock().unwrap().get(token_hash).cloned())
    }

    async fn validate_and_rotate(&self, token_hash: &str) -> AuthResult<Option<RotatedGrant>> {
        let mut tokens = self.tokens.lock().unwrap();
        Ok(match tokens.get_mut(token_hash) {
            Some(token) if token.is_valid() => {
                token.revoked_at = Some(OffsetDateTime::now_utc());
                Some(token.to_rotated_grant())
            }
            _ => None,
        })
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        let mut tokens = self.tokens.lock().unwrap();
        Ok(match tokens.get_mut(token_hash) {
            Some(token) if !token.is_revoked() => {
                token.revoked_at = Some(OffsetDateTime::now_utc());
                true
            }
            _ => false,
        })
    }

    async fn revoke_all_for(&self, client_id: &str, user_id: &str) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut count = 0;
        for token in self.tokens.lock().unwrap().values_mut() {
            if token.client_id == client_id && token.user_id == user_id && !token.is_revoked() {
                token.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired());
        Ok((before - tokens.len()) as u64)
    }
}
