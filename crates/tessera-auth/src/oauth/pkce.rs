//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! Both `S256` and `plain` challenge methods are accepted. Comparisons run in
//! constant time and a verifier that breaks the RFC 7636 format never
//! verifies.
//!
//! # Example
//!
//! ```
//! use tessera_auth::oauth::pkce;
//!
//! let verifier = pkce::generate_verifier();
//! let challenge = pkce::challenge_from_verifier(&verifier);
//!
//! assert!(pkce::verify(&verifier, &challenge, "S256"));
//! assert!(!pkce::verify(&verifier, &challenge, "plain"));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Minimum verifier length (RFC 7636 Section 4.1).
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum verifier length (RFC 7636 Section 4.1).
pub const MAX_VERIFIER_LENGTH: usize = 128;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while parsing PKCE parameters.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside 43..=128.
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains characters outside `[A-Za-z0-9-._~]`.
    #[error("Invalid verifier characters: must be unreserved URI characters ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge method other than `S256` or `plain`.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),
}

impl PkceError {
    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        "invalid_request"
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PkceChallengeMethod {
    /// `BASE64URL(SHA256(verifier))`.
    #[default]
    S256,
    /// Challenge equals the verifier.
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from its wire name.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `S256` or `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Get the method as its wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Generates a verifier from 32 random bytes (43 base64url characters).
#[must_use]
pub fn generate_verifier() -> String {
    // `gen` is a reserved keyword in Rust 2024
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Computes the S256 challenge, `BASE64URL(SHA256(ASCII(verifier)))`.
#[must_use]
pub fn challenge_from_verifier(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Checks a verifier against RFC 7636 length and alphabet rules.
///
/// # Errors
///
/// Returns the specific format violation.
pub fn validate_verifier(verifier: &str) -> Result<(), PkceError> {
    let len = verifier.len();
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&len) {
        return Err(PkceError::InvalidVerifierLength(len));
    }

    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
    {
        return Err(PkceError::InvalidVerifierCharacters);
    }

    Ok(())
}

/// Verifies `verifier` against a stored challenge.
///
/// Returns `false` for an unknown method, a malformed verifier, or a
/// mismatch.
#[must_use]
pub fn verify(verifier: &str, stored_challenge: &str, method: &str) -> bool {
    let Ok(method) = PkceChallengeMethod::parse(method) else {
        return false;
    };

    if validate_verifier(verifier).is_err() {
        return false;
    }

    let computed = match method {
        PkceChallengeMethod::S256 => challenge_from_verifier(verifier),
        PkceChallengeMethod::Plain => verifier.to_string(),
    };

    computed
        .as_bytes()
        .ct_eq(stored_challenge.as_bytes())
        .into()
}

// =============================================================================
// Tests
// =============================================================================
