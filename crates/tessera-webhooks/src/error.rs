use tessera_auth::{AuthError, VaultError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// The endpoint could not be reached or did not answer with 2xx.
    #[error("Delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Webhook secret could not be decrypted: {0}")]
    Decryption(String),

    #[error("Webhook not found: {0}")]
    NotFound(String),

    #[error("Invalid webhook configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Secret vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AuthError> for WebhookError {
    fn from(err: AuthError) -> Self {
        Self::Storage(err.to_string())
    }
}
