//! Signing key management and JWT encoding.
//!
//! A [`KeyManager`] is built once at startup from [`SigningConfig`] and then
//! shared behind an `Arc`. It owns a single RS256 key and signs every token
//! the server issues.
//!
//! ## Key sources
//!
//! 1. `signing.private_key_pem`: inline PKCS#8 or PKCS#1 PEM
//! 2. `signing.private_key_path`: the same, read from disk
//! 3. Neither: an ephemeral 2048-bit key is generated. Tokens do not survive
//!    a restart.
//!
//! ## Example
//!
//! ```ignore
//! use tessera_auth::config::SigningConfig;
//! use tessera_auth::token::keys::KeyManager;
//!
//! let keys = KeyManager::from_config(&SigningConfig::default(), "https://id.example.com")?;
//! let token = keys.sign("user-1", "app-1", &serde_json::json!({"scope": "openid"}), 3600)?;
//! let verified = keys.verify::<serde_json::Value>(&token)?;
//! assert_eq!(verified.sub, "user-1");
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::config::SigningConfig;
use crate::error::AuthError;

/// The only algorithm tokens are signed with.
pub const SIGNING_ALGORITHM: &str = "RS256";

/// Smallest accepted RSA modulus.
pub const MIN_RSA_BITS: usize = 2048;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during key loading, signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid (wrong issuer, missing claim).
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// The RSA key is smaller than [`MIN_RSA_BITS`].
    #[error("RSA key too small: {bits} bits, at least 2048 required")]
    KeyTooSmall {
        /// Modulus size of the rejected key.
        bits: usize,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if a presented token was rejected.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::InvalidSignature
                | Self::InvalidClaims { .. }
                | Self::DecodingError { .. }
        )
    }

    /// Returns `true` if this is a key-related error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationError { .. } | Self::InvalidKey { .. } | Self::KeyTooSmall { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        if err.is_validation_error() {
            AuthError::verification(err.to_string())
        } else if err.is_key_error() {
            AuthError::configuration(err.to_string())
        } else {
            AuthError::internal(err.to_string())
        }
    }
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// RSA JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

// ============================================================================
// Token envelope
// ============================================================================

/// Registered claims wrapped around caller-supplied claims when signing.
#[derive(Serialize)]
struct Envelope<'a, C> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
    jti: String,
    #[serde(flatten)]
    claims: &'a C,
}

/// A token whose signature, issuer and expiry have been checked.
///
/// The audience is returned as-is for the caller to check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedToken<C> {
    /// Issuer.
    pub iss: String,
    /// Subject (user id).
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Unique token id.
    pub jti: String,
    /// Caller-defined claims.
    #[serde(flatten)]
    pub claims: C,
}

// ============================================================================
// Key Manager
// ============================================================================

/// Process-wide signing key.
///
/// This type is thread-safe (`Send + Sync`) and immutable once built.
pub struct KeyManager {
    kid: String,
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    n: Vec<u8>,
    e: Vec<u8>,
    ephemeral: bool,
}

impl KeyManager {
    /// Builds the key manager from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured key cannot be read or parsed, is
    /// smaller than 2048 bits, or key generation fails.
    pub fn from_config(config: &SigningConfig, issuer: impl Into<String>) -> Result<Self, JwtError> {
        let issuer = issuer.into();

        let pem = match (&config.private_key_pem, &config.private_key_path) {
            (Some(pem), _) => Some(pem.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path).map_err(|e| {
                JwtError::invalid_key(format!(
                    "failed to read signing key from {}: {e}",
                    path.display()
                ))
            })?),
            (None, None) => None,
        };

        match pem {
            Some(pem) => {
                let keys = Self::from_pem(&pem, config.key_id.clone(), issuer)?;
                tracing::info!(kid = %keys.kid, "Loaded signing key");
                Ok(keys)
            }
            None => {
                tracing::warn!(
                    "No signing key configured; generated an ephemeral RSA key. \
                     Issued tokens will not survive a restart. Set auth.signing.private_key_path in production."
                );
                let mut keys = Self::generate(issuer)?;
                if let Some(kid) = &config.key_id {
                    keys.kid = kid.clone();
                }
                Ok(keys)
            }
        }
    }

    /// Loads a PKCS#8 or PKCS#1 PEM private key.
    ///
    /// Without an explicit `kid`, one is derived from the SHA-256 of the
    /// public modulus so it stays stable across restarts.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM cannot be parsed or the key is smaller
    /// than 2048 bits.
    pub fn from_pem(
        pem: &str,
        kid: Option<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| JwtError::invalid_key(format!("expected PKCS#8 or PKCS#1 RSA PEM: {e}")))?;

        let bits = private_key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(JwtError::KeyTooSmall { bits });
        }

        let kid = kid.unwrap_or_else(|| derive_kid(&private_key.n().to_bytes_be()));
        Self::from_private_key(private_key, kid, issuer.into(), false)
    }

    /// Generates an ephemeral 2048-bit key with a random `kid`.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate(issuer: impl Into<String>) -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, MIN_RSA_BITS)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_private_key(
            private_key,
            uuid::Uuid::new_v4().to_string(),
            issuer.into(),
            true,
        )
    }

    fn from_private_key(
        private_key: RsaPrivateKey,
        kid: String,
        issuer: String,
        ephemeral: bool,
    ) -> Result<Self, JwtError> {
        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            kid,
            issuer,
            encoding_key,
            decoding_key,
            n,
            e,
            ephemeral,
        })
    }

    /// Key id placed in token headers and the JWKS.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Issuer placed in and required of every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns `true` if the key was generated at startup.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Signs `claims` wrapped in `iss`, `sub`, `aud`, `exp`, `iat` and `jti`.
    ///
    /// # Errors
    ///
    /// Returns an error if `claims` does not serialize to a JSON object or
    /// signing fails.
    pub fn sign<C: Serialize>(
        &self,
        subject: &str,
        audience: &str,
        claims: &C,
        ttl_seconds: i64,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let envelope = Envelope {
            iss: &self.issuer,
            sub: subject,
            aud: audience,
            exp: now + ttl_seconds,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            claims,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        encode(&header, &envelope, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies signature, issuer and expiry, then decodes the claims.
    ///
    /// # Errors
    ///
    /// Returns an error if any check fails or the claims do not match `C`.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<VerifiedToken<C>, JwtError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false; // Audience validated by the caller
        validation.leeway = 0;

        decode::<VerifiedToken<C>>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Returns the public key set with the single signing key.
    #[must_use]
    pub fn public_key_set(&self) -> Jwks {
        Jwks {
            keys: vec![Jwk {
                kty: "RSA".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: SIGNING_ALGORITHM.to_string(),
                n: URL_SAFE_NO_PAD.encode(&self.n),
                e: URL_SAFE_NO_PAD.encode(&self.e),
            }],
        }
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("kid", &self.kid)
            .field("issuer", &self.issuer)
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

/// First 16 bytes of SHA-256(modulus), base64url.
fn derive_kid(modulus: &[u8]) -> String {
    let digest = Sha256::digest(modulus);
    URL_SAFE_NO_PAD.encode(&digest[..16])
}
