//! Signed webhook delivery.
//!
//! Each delivery is a single POST of the serialized [`EventEnvelope`]. The
//! signature covers exactly the bytes sent. Failures are reported in the
//! returned [`DeliveryResult`] and counted on the webhook record; nothing is
//! retried.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use tessera_auth::storage::LicenseStorage;
use tessera_auth::vault::{self, SecretVault};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WebhookConfig;
use crate::error::WebhookError;
use crate::storage::WebhookStorage;
use crate::types::{
    DeliveryOutcome, DeliveryResult, DispatchReport, EventEnvelope, Webhook, WebhookEvent,
};

/// Outcome of an entity fan-out for one licensed app.
#[derive(Debug)]
pub struct AppDispatch {
    pub app_id: String,
    pub outcome: Result<DispatchReport, WebhookError>,
}

/// Header names derived from the configured vendor prefix.
#[derive(Debug, Clone)]
struct DeliveryHeaders {
    event: String,
    delivery: String,
    signature: String,
    timestamp: String,
}

impl DeliveryHeaders {
    fn new(prefix: &str) -> Self {
        Self {
            event: format!("X-{prefix}-Event"),
            delivery: format!("X-{prefix}-Delivery"),
            signature: format!("X-{prefix}-Signature"),
            timestamp: format!("X-{prefix}-Timestamp"),
        }
    }
}

/// Fans tenant lifecycle events out to app webhooks.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    webhooks: Arc<dyn WebhookStorage>,
    licenses: Arc<dyn LicenseStorage>,
    vault: Arc<SecretVault>,
    headers: DeliveryHeaders,
}

impl WebhookDispatcher {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate or the
    /// HTTP client cannot be built.
    pub fn new(
        config: &WebhookConfig,
        webhooks: Arc<dyn WebhookStorage>,
        licenses: Arc<dyn LicenseStorage>,
        vault: Arc<SecretVault>,
    ) -> Result<Self, WebhookError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| WebhookError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            webhooks,
            licenses,
            vault,
            headers: DeliveryHeaders::new(&config.header_prefix),
        })
    }

    /// Registers a webhook for `app_id` and returns it with its plaintext
    /// signing secret. The secret is only stored sealed, so this is the one
    /// chance to hand it to the app.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a non-HTTP(S) URL or an empty event set.
    pub async fn register(
        &self,
        app_id: &str,
        url: &str,
        events: BTreeSet<WebhookEvent>,
    ) -> Result<(Webhook, String), WebhookError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| WebhookError::InvalidConfig(format!("Invalid webhook URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WebhookError::InvalidConfig(
                "Webhook URL must use http or https".into(),
            ));
        }
        if events.is_empty() {
            return Err(WebhookError::InvalidConfig(
                "Webhook must subscribe to at least one event".into(),
            ));
        }

        let secret = vault::generate_webhook_secret();
        let webhook = Webhook {
            id: Uuid::new_v4().to_string(),
            app_id: app_id.to_string(),
            url: url.to_string(),
            encrypted_secret: self.vault.encrypt(&secret)?,
            events,
            active: true,
            consecutive_failures: 0,
            last_status: None,
            last_delivery_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.webhooks.save(&webhook).await?;

        info!(webhook_id = %webhook.id, app_id, "Registered webhook");
        Ok((webhook, secret))
    }

    /// Delivers `event` to every active webhook of `app_id` subscribed to it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the webhooks cannot be loaded. Delivery
    /// failures are reported per webhook in the result.
    pub async fn dispatch(
        &self,
        app_id: &str,
        event: WebhookEvent,
        data: Value,
    ) -> Result<DispatchReport, WebhookError> {
        let targets: Vec<Webhook> = self
            .webhooks
            .list_by_app(app_id)
            .await?
            .into_iter()
            .filter(|webhook| webhook.accepts(event))
            .collect();

        let envelope = EventEnvelope::new(app_id, event, data);
        let mut report = DispatchReport {
            app_id: app_id.to_string(),
            event,
            event_id: envelope.id,
            results: Vec::new(),
        };

        if targets.is_empty() {
            debug!(app_id, event = %event, "No webhooks subscribed");
            return Ok(report);
        }

        let body = serde_json::to_vec(&envelope)?;
        report.results = join_all(
            targets
                .iter()
                .map(|webhook| self.deliver_body(webhook, &envelope, &body)),
        )
        .await;

        info!(
            app_id,
            event = %event,
            delivered = report.delivered(),
            failed = report.failed(),
            "Dispatched webhook event"
        );
        Ok(report)
    }

    /// Delivers `event` to every app the entity holds a usable license for.
    ///
    /// Object payloads gain an `entityId` field; anything else is wrapped as
    /// `{"entityId": ..., "value": ...}`.
    ///
    /// Each app is reported separately, so one app whose webhooks cannot be
    /// loaded does not hide the deliveries made to the others.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity's licenses cannot be loaded.
    pub async fn dispatch_to_entity_apps(
        &self,
        entity_id: &str,
        event: WebhookEvent,
        data: Value,
    ) -> Result<Vec<AppDispatch>, WebhookError> {
        let now = OffsetDateTime::now_utc();
        let app_ids: BTreeSet<String> = self
            .licenses
            .list_by_entity(entity_id)
            .await?
            .into_iter()
            .filter(|license| license.is_usable_at(now))
            .map(|license| license.app_id)
            .collect();

        debug!(entity_id, event = %event, apps = app_ids.len(), "Fanning out to licensed apps");

        let data = with_entity_id(entity_id, data);
        let outcomes = join_all(
            app_ids
                .iter()
                .map(|app_id| self.dispatch(app_id, event, data.clone())),
        )
        .await;

        Ok(app_ids
            .into_iter()
            .zip(outcomes)
            .map(|(app_id, outcome)| {
                if let Err(e) = &outcome {
                    warn!(
                        entity_id,
                        app_id = %app_id,
                        event = %event,
                        error = %e,
                        "Entity fan-out to app failed"
                    );
                }
                AppDispatch { app_id, outcome }
            })
            .collect())
    }

    /// Delivers `envelope` to a single webhook without checking its
    /// subscriptions.
    pub async fn deliver_one(&self, webhook: &Webhook, envelope: &EventEnvelope) -> DeliveryResult {
        match serde_json::to_vec(envelope) {
            Ok(body) => self.deliver_body(webhook, envelope, &body).await,
            Err(e) => {
                error!(webhook_id = %webhook.id, error = %e, "Failed to serialize webhook envelope");
                DeliveryResult {
                    webhook_id: webhook.id.clone(),
                    delivery_id: Uuid::new_v4(),
                    success: false,
                    status: None,
                    latency_ms: 0,
                    error: Some(WebhookError::from(e).to_string()),
                }
            }
        }
    }

    /// Sends a `test.ping` to one webhook, whether or not it is active or
    /// subscribed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn send_test_ping(&self, webhook_id: &str) -> Result<DeliveryResult, WebhookError> {
        let webhook = self
            .webhooks
            .find_by_id(webhook_id)
            .await?
            .ok_or_else(|| WebhookError::NotFound(webhook_id.to_string()))?;

        let envelope = EventEnvelope::new(
            webhook.app_id.clone(),
            WebhookEvent::TestPing,
            json!({ "webhookId": webhook.id, "message": "Test delivery from Tessera" }),
        );
        Ok(self.deliver_one(&webhook, &envelope).await)
    }

    async fn deliver_body(
        &self,
        webhook: &Webhook,
        envelope: &EventEnvelope,
        body: &[u8],
    ) -> DeliveryResult {
        let delivery_id = Uuid::new_v4();
        let started = Instant::now();

        let attempt = match self.vault.decrypt(&webhook.encrypted_secret) {
            Ok(secret) => self.post(webhook, envelope, delivery_id, body, &secret).await,
            Err(e) => {
                warn!(
                    webhook_id = %webhook.id,
                    app_id = %webhook.app_id,
                    error = %e,
                    "Webhook secret decryption failed, delivery skipped"
                );
                Err(WebhookError::Decryption(e.to_string()))
            }
        };

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (success, status, error) = match attempt {
            Ok(status) if (200..300).contains(&status) => (true, Some(status), None),
            Ok(status) => (
                false,
                Some(status),
                Some(format!("Endpoint responded with HTTP {status}")),
            ),
            Err(e) => (false, None, Some(e.to_string())),
        };

        if success {
            info!(
                webhook_id = %webhook.id,
                event = %envelope.event,
                status,
                latency_ms,
                "Webhook delivered"
            );
        } else {
            warn!(
                webhook_id = %webhook.id,
                event = %envelope.event,
                status,
                latency_ms,
                error = error.as_deref().unwrap_or_default(),
                "Webhook delivery failed"
            );
        }

        let outcome = DeliveryOutcome {
            success,
            status,
            at: OffsetDateTime::now_utc(),
        };
        if let Err(e) = self.webhooks.record_delivery(&webhook.id, outcome).await {
            error!(webhook_id = %webhook.id, error = %e, "Failed to record webhook delivery");
        }

        DeliveryResult {
            webhook_id: webhook.id.clone(),
            delivery_id,
            success,
            status,
            latency_ms,
            error,
        }
    }

    /// POSTs the signed body and returns the response status.
    async fn post(
        &self,
        webhook: &Webhook,
        envelope: &EventEnvelope,
        delivery_id: Uuid,
        body: &[u8],
        secret: &str,
    ) -> Result<u16, WebhookError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();

        let response = self
            .http
            .post(&webhook.url)
            .header(CONTENT_TYPE, "application/json")
            .header(self.headers.event.as_str(), envelope.event.as_str())
            .header(self.headers.delivery.as_str(), delivery_id.to_string())
            .header(
                self.headers.signature.as_str(),
                vault::sign_payload(body, secret),
            )
            .header(self.headers.timestamp.as_str(), timestamp.to_string())
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::DeliveryFailure("Request timed out".into())
                } else {
                    WebhookError::DeliveryFailure(e.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }
}

fn with_entity_id(entity_id: &str, data: Value) -> Value {
    match data {
        Value::Object(mut fields) => {
            fields.insert("entityId".to_string(), Value::String(entity_id.to_string()));
            Value::Object(fields)
        }
        other => json!({ "entityId": entity_id, "value": other }),
    }
}
