//! Token service: the orchestrator behind the token, revocation,
//! introspection and userinfo endpoints.
//!
//! # Grant Types
//!
//! - `authorization_code`: consume the code, check it against the request,
//!   derive claims and issue a token set
//! - `refresh_token`: rotate the refresh token and issue a fresh token set
//!   from current directory state
//!
//! # Security
//!
//! - Codes are consumed atomically before any other check
//! - Replaying a consumed code revokes every refresh token the client holds
//!   for that user
//! - Refresh tokens are single use
//! - Tokens are never logged

use std::sync::Arc;

use crate::AuthResult;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::oauth::authorization_code::AuthorizationCodes;
use crate::oauth::client_auth::{AuthenticatedClient, ClientCredentials, authenticate_client};
use crate::oauth::pkce;
use crate::oauth::scope;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::{AuthorizationCodeStorage, ClientStorage, RefreshTokenStorage};
use crate::token::claims::{AccessClaims, ClaimsAssembler, DirectoryStores, IdTokenClaims};
use crate::token::introspection::IntrospectionResponse;
use crate::token::keys::KeyManager;
use crate::token::refresh::RefreshTokens;
use crate::token::revocation::TokenTypeHint;
use crate::token::userinfo::UserInfoResponse;
use crate::types::{Client, ConsumeOutcome, GrantType, Impersonator, RefreshToken};

/// Storage handles the token service works against.
#[derive(Clone)]
pub struct TokenStores {
    pub clients: Arc<dyn ClientStorage>,
    pub authorization_codes: Arc<dyn AuthorizationCodeStorage>,
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
    pub directory: DirectoryStores,
}

/// Token service for issuing, rotating and inspecting tokens.
pub struct TokenService {
    keys: Arc<KeyManager>,
    clients: Arc<dyn ClientStorage>,
    codes: AuthorizationCodes,
    refresh_tokens: RefreshTokens,
    claims: ClaimsAssembler,
    access_token_lifetime: i64,
    refresh_token_lifetime: i64,
}

/// What a token set is issued for.
struct IssueContext<'a> {
    client: &'a Client,
    user_id: &'a str,
    scope: &'a str,
    nonce: Option<String>,
    impersonator: Option<Impersonator>,
}

impl TokenService {
    /// Creates a new token service.
    ///
    /// # Arguments
    ///
    /// * `keys` - The process signing key
    /// * `stores` - Client, code, refresh token and directory storage
    /// * `config` - Default lifetimes, overridable per client
    #[must_use]
    pub fn new(keys: Arc<KeyManager>, stores: TokenStores, config: &OAuthConfig) -> Self {
        Self {
            keys,
            codes: AuthorizationCodes::new(
                stores.authorization_codes,
                config.authorization_code_lifetime,
            ),
            refresh_tokens: RefreshTokens::new(stores.refresh_tokens),
            claims: ClaimsAssembler::new(stores.directory),
            clients: stores.clients,
            access_token_lifetime: seconds(config.access_token_lifetime),
            refresh_token_lifetime: seconds(config.refresh_token_lifetime),
        }
    }

    /// Returns the signing key handle.
    #[must_use]
    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Returns the authorization code helper used by the authorize step.
    #[must_use]
    pub fn authorization_codes(&self) -> &AuthorizationCodes {
        &self.codes
    }

    /// Returns the refresh token helper.
    #[must_use]
    pub fn refresh_tokens(&self) -> &RefreshTokens {
        &self.refresh_tokens
    }

    /// Authenticates a client from a Basic header and/or body fields.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` on any authentication failure.
    pub async fn authenticate(
        &self,
        basic: Option<(String, String)>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> AuthResult<AuthenticatedClient> {
        let credentials = ClientCredentials::resolve(basic, body_client_id, body_client_secret)?;
        authenticate_client(&credentials, self.clients.as_ref()).await
    }

    // =========================================================================
    // Token endpoint
    // =========================================================================

    /// Handles a token endpoint request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `invalid_request` if `grant_type` or a grant parameter is missing
    /// - `unsupported_grant_type` for any grant other than
    ///   `authorization_code` and `refresh_token`
    /// - `invalid_client` if client authentication fails
    /// - `unauthorized_client` if the client may not use the grant
    /// - `invalid_grant` if the code or refresh token is rejected
    /// - `ReplayDetected` if a consumed code is presented again
    pub async fn handle(
        &self,
        request: TokenRequest,
        basic: Option<(String, String)>,
    ) -> AuthResult<TokenResponse> {
        let grant_type = match request.grant_type.as_deref() {
            None | Some("") => {
                return Err(AuthError::invalid_request("Missing grant_type parameter"));
            }
            Some(value) => GrantType::parse(value)
                .ok_or_else(|| AuthError::unsupported_grant_type(value))?,
        };

        let authenticated = self
            .authenticate(
                basic,
                request.client_id.as_deref(),
                request.client_secret.as_deref(),
            )
            .await?;
        let client = authenticated.client;

        if !client.is_grant_type_allowed(grant_type) {
            return Err(AuthError::unauthorized_client(format!(
                "Client may not use the {grant_type} grant"
            )));
        }

        tracing::debug!(
            client_id = %client.client_id,
            grant_type = %grant_type,
            auth_method = %authenticated.auth_method,
            "Processing token request"
        );

        match grant_type {
            GrantType::AuthorizationCode => self.exchange_code(&request, &client).await,
            GrantType::RefreshToken => self.refresh(&request, &client).await,
        }
    }

    /// Exchanges an authorization code for a token set.
    async fn exchange_code(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        // 1. Extract required fields
        let code = request
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing code parameter"))?;

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing redirect_uri parameter"))?;

        // 2. Consume (atomic one-time use)
        let grant = match self.codes.consume(code).await? {
            ConsumeOutcome::Granted(grant) => grant,
            ConsumeOutcome::NotFound => {
                return Err(AuthError::invalid_grant(
                    "Authorization code is invalid or expired",
                ));
            }
            ConsumeOutcome::Replayed { client_id, user_id } => {
                let revoked = self
                    .refresh_tokens
                    .revoke_all_for(&client_id, &user_id)
                    .await?;
                tracing::warn!(
                    client_id = %client_id,
                    user_id = %user_id,
                    revoked,
                    "Authorization code replay detected, revoked refresh tokens"
                );
                return Err(AuthError::replay_detected(client_id));
            }
        };

        // 3. Validate client ID matches
        if grant.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to a different client",
            ));
        }

        // 4. Validate redirect URI matches exactly
        if grant.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant(
                "Redirect URI does not match authorization request",
            ));
        }

        // 5. Verify PKCE
        match (&grant.code_challenge, &request.code_verifier) {
            (Some(challenge), Some(verifier)) => {
                let method = grant
                    .code_challenge_method
                    .as_deref()
                    .unwrap_or(pkce::PkceChallengeMethod::Plain.as_str());
                if !pkce::verify(verifier, challenge, method) {
                    return Err(AuthError::invalid_grant("PKCE verification failed"));
                }
            }
            (Some(_), None) => {
                return Err(AuthError::invalid_grant("Missing code_verifier"));
            }
            (None, Some(_)) => {
                return Err(AuthError::invalid_grant(
                    "code_verifier sent but no code_challenge was recorded",
                ));
            }
            (None, None) if !client.is_confidential() => {
                return Err(AuthError::invalid_grant("Public clients must use PKCE"));
            }
            (None, None) => {}
        }

        // 6. Issue tokens
        self.issue_tokens(IssueContext {
            client,
            user_id: &grant.user_id,
            scope: &grant.scope,
            nonce: grant.nonce,
            impersonator: grant.impersonator,
        })
        .await
    }

    /// Rotates a refresh token into a new token set.
    ///
    /// Claims are derived again from current directory state. The ID token
    /// carries no nonce.
    async fn refresh(&self, request: &TokenRequest, client: &Client) -> AuthResult<TokenResponse> {
        // 1. Get refresh token from request
        let token = request
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing refresh_token parameter"))?;

        // 2. A foreign client must not burn the owner's token
        let owned = self
            .refresh_tokens
            .find(token)
            .await?
            .is_some_and(|record| record.client_id == client.client_id);
        if !owned {
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }

        // 3. Validate and rotate (atomic)
        let grant = self
            .refresh_tokens
            .validate_and_rotate(token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if grant.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to a different client",
            ));
        }

        // 4. Issue tokens
        self.issue_tokens(IssueContext {
            client,
            user_id: &grant.user_id,
            scope: &grant.scope,
            nonce: None,
            impersonator: grant.impersonator,
        })
        .await
    }

    /// Signs the access and ID tokens and persists a new refresh token.
    async fn issue_tokens(&self, ctx: IssueContext<'_>) -> AuthResult<TokenResponse> {
        let client = ctx.client;
        let access_ttl = client.access_token_lifetime_secs(self.access_token_lifetime);
        let refresh_ttl = client.refresh_token_lifetime_secs(self.refresh_token_lifetime);

        let assembled = self
            .claims
            .assemble(ctx.user_id, client, ctx.scope, ctx.impersonator.clone())
            .await?;

        let access_token =
            self.keys
                .sign(ctx.user_id, &client.app_id, &assembled.claims, access_ttl)?;

        let id_token = if scope::contains(ctx.scope, scope::OPENID) {
            let id_claims =
                IdTokenClaims::for_user(&assembled.user, &client.client_id, ctx.scope, ctx.nonce);
            Some(
                self.keys
                    .sign(ctx.user_id, &client.client_id, &id_claims, access_ttl)?,
            )
        } else {
            None
        };

        let refresh_token = self
            .refresh_tokens
            .issue(
                &client.client_id,
                ctx.user_id,
                ctx.scope,
                ctx.impersonator,
                refresh_ttl,
            )
            .await?;

        tracing::info!(
            client_id = %client.client_id,
            user_id = %ctx.user_id,
            scope = %ctx.scope,
            id_token = id_token.is_some(),
            "Issued token set"
        );

        let response = TokenResponse::new(
            access_token,
            u64::try_from(access_ttl).unwrap_or_default(),
            refresh_token,
            ctx.scope.to_string(),
        );

        Ok(match id_token {
            Some(token) => response.with_id_token(token),
            None => response,
        })
    }

    // =========================================================================
    // Revocation, introspection, userinfo
    // =========================================================================

    /// Revokes a refresh token owned by `client`.
    ///
    /// Unknown, foreign, already revoked and access tokens are ignored. The
    /// hint is advisory: a value with the refresh token prefix is always
    /// looked up.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn revoke(
        &self,
        token: &str,
        hint: Option<TokenTypeHint>,
        client: &Client,
    ) -> AuthResult<()> {
        if !RefreshToken::has_prefix(token) {
            tracing::debug!(
                client_id = %client.client_id,
                hint = ?hint,
                "Revocation of non-refresh token ignored"
            );
            return Ok(());
        }

        let Some(record) = self.refresh_tokens.find(token).await? else {
            return Ok(());
        };

        if record.client_id != client.client_id {
            tracing::debug!(
                client_id = %client.client_id,
                "Revocation of another client's token ignored"
            );
            return Ok(());
        }

        if self.refresh_tokens.revoke(token).await? {
            tracing::info!(client_id = %client.client_id, "Refresh token revoked");
        }

        Ok(())
    }

    /// Reports whether `token` is active.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        if RefreshToken::has_prefix(token) {
            return Ok(match self.refresh_tokens.find(token).await? {
                Some(record) if record.is_valid() => {
                    IntrospectionResponse::for_refresh_token(&record)
                }
                _ => IntrospectionResponse::inactive(),
            });
        }

        Ok(match self.keys.verify::<AccessClaims>(token) {
            Ok(verified) => IntrospectionResponse::for_access_token(verified),
            Err(_) => IntrospectionResponse::inactive(),
        })
    }

    /// Returns the scoped profile for the bearer of `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError` if the token is invalid or expired, or
    /// its subject no longer exists or is inactive.
    pub async fn userinfo(&self, access_token: &str) -> AuthResult<UserInfoResponse> {
        let verified = self.keys.verify::<AccessClaims>(access_token)?;

        let user = self
            .claims
            .users()
            .find_by_id(&verified.sub)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AuthError::verification("Token subject is unknown or inactive"))?;

        Ok(UserInfoResponse::build(&user, &verified.claims))
    }
}

fn seconds(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

// =============================================================================
// Tests
// =============================================================================
