//! # tessera-webhooks
//!
//! Outbound delivery of tenant lifecycle events to app webhooks. Payloads
//! are signed with HMAC-SHA256 using a per-webhook secret that is stored
//! sealed by the auth vault.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod storage;
pub mod types;

pub use config::WebhookConfig;
pub use dispatcher::{AppDispatch, WebhookDispatcher};
pub use error::WebhookError;
pub use storage::WebhookStorage;
pub use types::*;
