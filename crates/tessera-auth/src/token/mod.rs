//! Token generation, validation, and management.
//!
//! This module provides:
//!
//! - [`keys`] - RSA signing key, JWT signing and verification, JWKS
//! - [`claims`] - Access and ID token claims, derived from directory state
//! - [`refresh`] - Rotating refresh tokens
//! - [`service`] - The grant orchestrator
//! - Token introspection (RFC 7662) and revocation (RFC 7009)
//! - OpenID Connect userinfo

pub mod claims;
pub mod introspection;
pub mod keys;
pub mod refresh;
pub mod revocation;
pub mod service;
pub mod userinfo;

pub use claims::{AccessClaims, AssembledClaims, ClaimsAssembler, DirectoryStores, IdTokenClaims};
pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use keys::{Jwk, Jwks, JwtError, KeyManager, MIN_RSA_BITS, SIGNING_ALGORITHM, VerifiedToken};
pub use refresh::RefreshTokens;
pub use revocation::{RevocationRequest, TokenTypeHint};
pub use service::{TokenService, TokenStores};
pub use userinfo::UserInfoResponse;
