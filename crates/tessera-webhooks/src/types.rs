use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Tenant lifecycle event delivered to app webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.updated")]
    UserUpdated,
    #[serde(rename = "user.deleted")]
    UserDeleted,
    #[serde(rename = "membership.created")]
    MembershipCreated,
    #[serde(rename = "membership.updated")]
    MembershipUpdated,
    #[serde(rename = "membership.deleted")]
    MembershipDeleted,
    #[serde(rename = "license.created")]
    LicenseCreated,
    #[serde(rename = "license.updated")]
    LicenseUpdated,
    #[serde(rename = "license.activated")]
    LicenseActivated,
    #[serde(rename = "license.suspended")]
    LicenseSuspended,
    #[serde(rename = "license.expired")]
    LicenseExpired,
    #[serde(rename = "license.cancelled")]
    LicenseCancelled,
    #[serde(rename = "entity.updated")]
    EntityUpdated,
    #[serde(rename = "entity.settings_updated")]
    EntitySettingsUpdated,
    #[serde(rename = "entity.deleted")]
    EntityDeleted,
    /// Diagnostic event sent on demand to a single webhook.
    #[serde(rename = "test.ping")]
    TestPing,
}

impl WebhookEvent {
    /// Every event an app can subscribe to. `test.ping` is not subscribable.
    pub const SUBSCRIBABLE: [WebhookEvent; 15] = [
        Self::UserCreated,
        Self::UserUpdated,
        Self::UserDeleted,
        Self::MembershipCreated,
        Self::MembershipUpdated,
        Self::MembershipDeleted,
        Self::LicenseCreated,
        Self::LicenseUpdated,
        Self::LicenseActivated,
        Self::LicenseSuspended,
        Self::LicenseExpired,
        Self::LicenseCancelled,
        Self::EntityUpdated,
        Self::EntitySettingsUpdated,
        Self::EntityDeleted,
    ];

    /// Wire name, e.g. `license.activated`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserCreated => "user.created",
            Self::UserUpdated => "user.updated",
            Self::UserDeleted => "user.deleted",
            Self::MembershipCreated => "membership.created",
            Self::MembershipUpdated => "membership.updated",
            Self::MembershipDeleted => "membership.deleted",
            Self::LicenseCreated => "license.created",
            Self::LicenseUpdated => "license.updated",
            Self::LicenseActivated => "license.activated",
            Self::LicenseSuspended => "license.suspended",
            Self::LicenseExpired => "license.expired",
            Self::LicenseCancelled => "license.cancelled",
            Self::EntityUpdated => "entity.updated",
            Self::EntitySettingsUpdated => "entity.settings_updated",
            Self::EntityDeleted => "entity.deleted",
            Self::TestPing => "test.ping",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUBSCRIBABLE
            .into_iter()
            .chain(std::iter::once(Self::TestPing))
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("Unknown webhook event: {s}"))
    }
}

/// JSON body POSTed to a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event: WebhookEvent,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub app_id: String,
    pub data: serde_json::Value,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(app_id: impl Into<String>, event: WebhookEvent, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            timestamp: OffsetDateTime::now_utc(),
            app_id: app_id.into(),
            data,
        }
    }
}

/// An app's registered delivery endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub app_id: String,
    pub url: String,

    /// Signing secret sealed by the secret vault.
    pub encrypted_secret: String,

    pub events: BTreeSet<WebhookEvent>,
    pub active: bool,

    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub last_status: Option<u16>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_delivery_at: Option<OffsetDateTime>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Webhook {
    /// Returns `true` if the webhook is active and subscribed to `event`.
    #[must_use]
    pub fn accepts(&self, event: WebhookEvent) -> bool {
        self.active && self.events.contains(&event)
    }

    /// Applies a delivery outcome to the health fields.
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        self.last_status = outcome.status;
        self.last_delivery_at = Some(outcome.at);
        if outcome.success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
    }
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Webhook")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("url", &self.url)
            .field("encrypted_secret", &"[REDACTED]")
            .field("events", &self.events)
            .field("active", &self.active)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("last_status", &self.last_status)
            .field("last_delivery_at", &self.last_delivery_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// What storage needs to know about a finished delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub at: OffsetDateTime,
}

/// Result of one POST to one webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub webhook_id: String,
    pub delivery_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of one event fanned out to an app's webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub app_id: String,
    pub event: WebhookEvent,
    pub event_id: Uuid,
    pub results: Vec<DeliveryResult>,
}

impl DispatchReport {
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.delivered()
    }
}
