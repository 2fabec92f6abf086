//! Tessera authorization server: configuration, bootstrap and HTTP wiring
//! around `tessera-auth`, `tessera-webhooks` and the in-memory store.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{AppState, TesseraServer, build_app, build_state, purge_expired, router};
