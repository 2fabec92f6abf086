//! Secret vault: encryption at rest, client secret hashing and payload signing.
//!
//! - Stored secrets (webhook signing secrets) are sealed with AES-256-GCM and
//!   serialized as `iv:authTag:ciphertext`, each segment standard base64.
//! - Client secrets are hashed with Argon2id and verified with a
//!   constant-time comparison of the derived output.
//! - Webhook payloads are signed with HMAC-SHA256 as `sha256=<hex>`.
//!
//! # Example
//!
//! ```
//! use tessera_auth::vault::{SecretVault, sign_payload, verify_signature};
//!
//! let vault = SecretVault::new(Some("a long configured secret"));
//! let sealed = vault.encrypt("whsec_abc").unwrap();
//! assert_eq!(vault.decrypt(&sealed).unwrap(), "whsec_abc");
//!
//! let signature = sign_payload(br#"{"id":"1"}"#, "whsec_abc");
//! assert!(verify_signature(br#"{"id":"1"}"#, &signature, "whsec_abc"));
//! ```

use aes_gcm::{
    Aes256Gcm, Key, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Nonce size for AES-256-GCM (96 bits)
const IV_SIZE: usize = 12;

/// GCM authentication tag size (128 bits)
const TAG_SIZE: usize = 16;

/// Prefix carried by every payload signature.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Passphrase used when no encryption key is configured.
const DEVELOPMENT_PASSPHRASE: &str = "tessera-development-vault-key-do-not-use-in-production";

// =============================================================================
// Errors
// =============================================================================

/// Errors produced by the vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Sealing a value failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// A sealed value is malformed or its authentication tag did not verify.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Hashing a secret failed.
    #[error("Secret hashing failed: {0}")]
    Hash(String),
}

impl From<VaultError> for AuthError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Decryption(message) => AuthError::decryption(message),
            other => AuthError::internal(other.to_string()),
        }
    }
}

// =============================================================================
// Symmetric encryption
// =============================================================================

/// Process-wide symmetric cipher for secrets at rest.
///
/// Built once at startup and shared behind an `Arc`.
pub struct SecretVault {
    cipher: Aes256Gcm,
    development_key: bool,
}

impl SecretVault {
    /// Creates a vault whose key is the SHA-256 digest of `secret`.
    ///
    /// When no secret is configured the key is derived from a fixed
    /// passphrase. Values sealed this way are readable by anyone with the
    /// source, so a warning is emitted.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let (material, development_key) = match secret.map(str::trim) {
            Some(s) if !s.is_empty() => (s, false),
            _ => {
                tracing::warn!(
                    "No vault encryption key configured; using the built-in development key. \
                     Secrets encrypted with it are NOT protected. Set auth.vault.encryption_key in production."
                );
                (DEVELOPMENT_PASSPHRASE, true)
            }
        };

        let digest = Sha256::digest(material.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());

        Self {
            cipher: Aes256Gcm::new(key),
            development_key,
        }
    }

    /// Returns `true` if the vault runs on the built-in fallback key.
    #[must_use]
    pub fn is_development_key(&self) -> bool {
        self.development_key
    }

    /// Encrypts `plaintext` into `iv:authTag:ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Encryption` if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        Ok(format!(
            "{}:{}:{}",
            BASE64.encode(iv),
            BASE64.encode(tag.as_slice()),
            BASE64.encode(&buffer)
        ))
    }

    /// Decrypts a value produced by [`SecretVault::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Decryption` if a segment is missing or not
    /// base64, the IV or tag has the wrong size, the tag does not verify,
    /// or the plaintext is not UTF-8.
    pub fn decrypt(&self, sealed: &str) -> Result<String, VaultError> {
        let mut segments = sealed.split(':');
        let (Some(iv), Some(tag), Some(ciphertext), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VaultError::Decryption(
                "expected iv:authTag:ciphertext".to_string(),
            ));
        };

        if iv.is_empty() || tag.is_empty() {
            return Err(VaultError::Decryption("empty segment".to_string()));
        }

        let iv = decode_segment(iv, "iv")?;
        let tag = decode_segment(tag, "authTag")?;
        let mut buffer = decode_segment(ciphertext, "ciphertext")?;

        if iv.len() != IV_SIZE {
            return Err(VaultError::Decryption("invalid iv size".to_string()));
        }
        if tag.len() != TAG_SIZE {
            return Err(VaultError::Decryption("invalid authTag size".to_string()));
        }

        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| VaultError::Decryption("authentication tag mismatch".to_string()))?;

        String::from_utf8(buffer)
            .map_err(|e| VaultError::Decryption(format!("invalid UTF-8 in plaintext: {e}")))
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("key", &"<redacted>")
            .field("development_key", &self.development_key)
            .finish()
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, VaultError> {
    BASE64
        .decode(segment)
        .map_err(|e| VaultError::Decryption(format!("invalid {name} base64: {e}")))
}

// =============================================================================
// Client secrets
// =============================================================================

/// Generates a new client secret: `cs_` followed by 64 hex characters.
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("cs_{}", hex::encode(bytes))
}

/// Generates a new webhook signing secret: `whsec_` followed by 64 hex characters.
#[must_use]
pub fn generate_webhook_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("whsec_{}", hex::encode(bytes))
}

/// Hashes a secret with Argon2id into a PHC string.
///
/// # Errors
///
/// Returns `VaultError::Hash` if hashing fails.
pub fn hash_secret(raw: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VaultError::Hash(e.to_string()))
}

/// Verifies `raw` against a hash produced by [`hash_secret`].
///
/// The derived output is compared in constant time, and the work done does
/// not depend on the length or content of `raw`. A malformed hash verifies
/// as `false`.
#[must_use]
pub fn verify_secret(raw: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Payload signatures
// =============================================================================

/// Signs `body` with HMAC-SHA256, returning `sha256=<hex>`.
#[must_use]
pub fn sign_payload(body: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC can take key of any size"),
    };
    mac.update(body);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verifies a `sha256=<hex>` signature over `body`.
///
/// Both signatures are reduced to fixed-size digests before the
/// constant-time comparison, so a length mismatch costs the same as a
/// content mismatch.
#[must_use]
pub fn verify_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign_payload(body, secret);
    let expected_digest = Sha256::digest(expected.as_bytes());
    let provided_digest = Sha256::digest(signature.as_bytes());
    expected_digest.ct_eq(&provided_digest).into()
}
