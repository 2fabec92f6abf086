//! OAuth 2.0 building blocks shared by the token service and handlers.
//!
//! - [`authorization_code`] - Issuing and consuming single-use codes
//! - [`client_auth`] - Client authentication at the token endpoint
//! - [`pkce`] - PKCE challenge/verifier implementation (RFC 7636)
//! - [`scope`] - Supported scopes and scope normalization
//! - [`token`] - Token endpoint request/response types
//!
//! # Example
//!
//! ```ignore
//! use tessera_auth::oauth::pkce;
//!
//! // Client generates PKCE verifier and challenge
//! let verifier = pkce::generate_verifier();
//! let challenge = pkce::challenge_from_verifier(&verifier);
//!
//! // The authorize step records the challenge with the code
//! let code = service.authorization_codes().issue(&client, new_code).await?;
//! ```

pub mod authorization_code;
pub mod client_auth;
pub mod pkce;
pub mod scope;
pub mod token;

pub use authorization_code::AuthorizationCodes;
pub use client_auth::{
    AuthenticatedClient, ClientCredentials, TokenEndpointAuthMethod, authenticate_client,
    parse_basic_auth,
};
pub use pkce::{PkceChallengeMethod, PkceError};
pub use token::{TokenErrorBody, TokenRequest, TokenResponse};
