use async_trait::async_trait;

use crate::error::WebhookError;
use crate::types::{DeliveryOutcome, Webhook};

/// Storage for registered webhooks and their delivery health.
#[async_trait]
pub trait WebhookStorage: Send + Sync {
    /// Inserts or replaces a webhook.
    async fn save(&self, webhook: &Webhook) -> Result<(), WebhookError>;

    /// Get a webhook by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Webhook>, WebhookError>;

    /// All webhooks registered by an app, active or not.
    async fn list_by_app(&self, app_id: &str) -> Result<Vec<Webhook>, WebhookError>;

    /// Applies a delivery outcome to the webhook's health fields.
    ///
    /// A success resets the consecutive failure counter, a failure
    /// increments it. Unknown ids are ignored.
    async fn record_delivery(
        &self,
        id: &str,
        outcome: DeliveryOutcome,
    ) -> Result<(), WebhookError>;

    /// Returns `true` if a webhook was removed.
    async fn delete(&self, id: &str) -> Result<bool, WebhookError>;
}
