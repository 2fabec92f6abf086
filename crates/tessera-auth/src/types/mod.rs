//! Domain types shared by the token lifecycle and its storage backends.
//!
//! ## Domain Types
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`AuthorizationCode`] - single-use authorization code
//! - [`RefreshToken`] - rotating refresh token record
//! - [`directory`] - users, entities, memberships, apps and licenses

pub mod authorization_code;
pub mod client;
pub mod directory;
pub mod refresh_token;

pub use authorization_code::{
    AUTHORIZATION_CODE_TTL, AuthorizationCode, AuthorizationGrant, ConsumeOutcome,
    NewAuthorizationCode,
};
pub use client::{Client, ClientValidationError, GrantType};
pub use directory::{
    App, DataScope, DataScopeType, Entity, Impersonator, License, LicenseStatus, Membership, User,
};
pub use refresh_token::{REFRESH_TOKEN_PREFIX, RefreshToken, RotatedGrant};
