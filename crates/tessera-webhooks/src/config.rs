//! Delivery settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WebhookError;

/// Outbound delivery configuration.
///
/// ```toml
/// [webhooks]
/// timeout = "30s"
/// header_prefix = "Tessera"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Upper bound on a single delivery, connect through response.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Vendor segment of the delivery headers (`X-<prefix>-Event`, ...).
    pub header_prefix: String,

    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            header_prefix: "Tessera".to_string(),
            user_agent: concat!("Tessera-Webhooks/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl WebhookConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero timeout or a header prefix that is
    /// empty or not made of ASCII letters, digits and dashes.
    pub fn validate(&self) -> Result<(), WebhookError> {
        if self.timeout.is_zero() {
            return Err(WebhookError::InvalidConfig(
                "webhooks.timeout must be greater than zero".into(),
            ));
        }
        if self.header_prefix.is_empty()
            || !self
                .header_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(WebhookError::InvalidConfig(format!(
                "webhooks.header_prefix '{}' is not a valid header segment",
                self.header_prefix
            )));
        }
        Ok(())
    }
}
