//! Storage traits for token lifecycle data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - Refresh tokens
//! - Directory records (users, entities, memberships, apps, licenses)
//!
//! # Implementations
//!
//! - `tessera-store-memory` - in-process backend built on `dashmap`

pub mod authorization_code;
pub mod client;
pub mod directory;
pub mod refresh_token;

pub use authorization_code::AuthorizationCodeStorage;
pub use client::ClientStorage;
pub use directory::{AppStorage, EntityStorage, LicenseStorage, MembershipStorage, UserStorage};
pub use refresh_token::RefreshTokenStorage;
