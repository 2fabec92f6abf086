//! Authorization code issuance.
//!
//! The authorize step (login and consent) lives outside this crate. Once it
//! has identified the user it calls [`AuthorizationCodes::issue`] and
//! redirects back to the client with the returned code.

use std::sync::Arc;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::pkce::PkceChallengeMethod;
use crate::oauth::scope;
use crate::storage::AuthorizationCodeStorage;
use crate::types::{AuthorizationCode, Client, ConsumeOutcome, GrantType, NewAuthorizationCode};

/// Issues and consumes authorization codes on top of a storage backend.
#[derive(Clone)]
pub struct AuthorizationCodes {
    storage: Arc<dyn AuthorizationCodeStorage>,
    ttl: time::Duration,
}

impl AuthorizationCodes {
    /// Creates the helper with the configured absolute code lifetime.
    #[must_use]
    pub fn new(storage: Arc<dyn AuthorizationCodeStorage>, ttl: std::time::Duration) -> Self {
        Self {
            storage,
            ttl: time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    /// Records a new code for `client` and returns its value.
    ///
    /// The requested scope is narrowed to the supported scopes the client
    /// may receive. A challenge without a method defaults to `plain`
    /// (RFC 7636 Section 4.3).
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the redirect URI is not registered, the
    /// challenge method is unknown, or a public client sends no challenge.
    /// Returns `unauthorized_client` if the client may not use the
    /// authorization_code grant.
    pub async fn issue(&self, client: &Client, mut input: NewAuthorizationCode) -> AuthResult<String> {
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "Client may not use the authorization_code grant",
            ));
        }

        if !client.is_redirect_uri_allowed(&input.redirect_uri) {
            return Err(AuthError::invalid_request("redirect_uri is not registered"));
        }

        match (&input.code_challenge, &input.code_challenge_method) {
            (Some(_), Some(method)) => {
                PkceChallengeMethod::parse(method)
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;
            }
            (Some(_), None) => {
                input.code_challenge_method = Some(PkceChallengeMethod::Plain.as_str().to_string());
            }
            (None, Some(_)) => {
                return Err(AuthError::invalid_request(
                    "code_challenge_method without code_challenge",
                ));
            }
            (None, None) if !client.is_confidential() => {
                return Err(AuthError::invalid_request(
                    "Public clients must use PKCE",
                ));
            }
            (None, None) => {}
        }

        input.client_id.clone_from(&client.client_id);
        input.scope = scope::normalize(&input.scope, &client.scopes);

        let code = AuthorizationCode::new(input, self.ttl);
        self.storage.create(&code).await?;

        tracing::debug!(
            client_id = %code.client_id,
            user_id = %code.user_id,
            "Issued authorization code"
        );

        Ok(code.code)
    }

    /// Consumes a code. See [`AuthorizationCodeStorage::consume`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn consume(&self, code: &str) -> AuthResult<ConsumeOutcome> {
        self.storage.consume(code).await
    }

    /// Deletes expired codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.storage.cleanup_expired().await
    }
}
