use async_trait::async_trait;
use dashmap::DashMap;
use tessera_webhooks::{DeliveryOutcome, Webhook, WebhookError, WebhookStorage};

/// Webhooks keyed by id.
#[derive(Debug, Default)]
pub struct MemoryWebhookStore {
    webhooks: DashMap<String, Webhook>,
}

#[async_trait]
impl WebhookStorage for MemoryWebhookStore {
    async fn save(&self, webhook: &Webhook) -> Result<(), WebhookError> {
        self.webhooks.insert(webhook.id.clone(), webhook.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Webhook>, WebhookError> {
        Ok(self.webhooks.get(id).map(|w| w.value().clone()))
    }

    async fn list_by_app(&self, app_id: &str) -> Result<Vec<Webhook>, WebhookError> {
        Ok(self
            .webhooks
            .iter()
            .filter(|w| w.app_id == app_id)
            .map(|w| w.value().clone())
            .collect())
    }

    async fn record_delivery(&self, id: &str, outcome: DeliveryOutcome) -> Result<(), WebhookError> {
        if let Some(mut webhook) = self.webhooks.get_mut(id) {
            webhook.record(&outcome);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, WebhookError> {
        Ok(self.webhooks.remove(id).is_some())
    }
}
