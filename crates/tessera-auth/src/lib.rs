//! # tessera-auth
//!
//! OAuth 2.0 / OpenID Connect token lifecycle for Tessera.
//!
//! This crate provides:
//! - Authorization code exchange with PKCE and single-use codes
//! - Rotating refresh tokens with replay detection
//! - RS256 signing key management and a published key set
//! - Claims derived from membership, permission and license records
//! - Token revocation, introspection and userinfo
//! - The secret vault used for client secrets and webhook signing
//!
//! ## Modules
//!
//! - [`config`] - Issuer, lifetimes, signing key and vault settings
//! - [`oauth`] - PKCE, scopes, client authentication, authorization codes
//! - [`token`] - Key manager, claims, token service
//! - [`vault`] - AES-GCM secret encryption, argon2 hashing, HMAC signatures
//! - [`storage`] - Storage traits for auth-related data
//! - [`types`] - Domain records
//! - [`http`] - Axum HTTP handlers for OAuth endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use http::{OAuthState, oauth_router};
pub use storage::{
    AppStorage, AuthorizationCodeStorage, ClientStorage, EntityStorage, LicenseStorage,
    MembershipStorage, RefreshTokenStorage, UserStorage,
};
pub use token::{KeyManager, TokenService, TokenStores};
pub use types::{Client, ClientValidationError, GrantType, RefreshToken};
pub use vault::{SecretVault, VaultError};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tessera_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, OAuthConfig, SigningConfig, VaultConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OAuthState, oauth_router};
    pub use crate::storage::{
        AppStorage, AuthorizationCodeStorage, ClientStorage, EntityStorage, LicenseStorage,
        MembershipStorage, RefreshTokenStorage, UserStorage,
    };
    pub use crate::token::{
        AccessClaims, ClaimsAssembler, DirectoryStores, IdTokenClaims, KeyManager, TokenService,
        TokenStores,
    };
    pub use crate::types::{
        App, AuthorizationCode, Client, ConsumeOutcome, Entity, GrantType, License,
        LicenseStatus, Membership, RefreshToken, User,
    };
    pub use crate::vault::SecretVault;
}
