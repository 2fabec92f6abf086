use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use tessera_auth::token::KeyManager;
use tessera_auth::{OAuthState, SecretVault, TokenService, oauth_router};
use tessera_store_memory::MemoryStores;
use tessera_webhooks::WebhookDispatcher;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bootstrap;
use crate::config::AppConfig;

/// Services shared by the HTTP layer and embedders.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub vault: Arc<SecretVault>,
    pub stores: MemoryStores,
}

/// Builds every service from configuration and loads bootstrap data.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let vault = Arc::new(SecretVault::new(cfg.auth.vault.encryption_key.as_deref()));

    let keys = KeyManager::from_config(&cfg.auth.signing, cfg.auth.issuer_base())
        .context("failed to load signing key")?;

    let stores = MemoryStores::new();
    let tokens = Arc::new(TokenService::new(
        Arc::new(keys),
        stores.token_stores(),
        &cfg.auth.oauth,
    ));
    let webhooks = Arc::new(
        WebhookDispatcher::new(
            &cfg.webhooks,
            stores.webhooks.clone(),
            stores.licenses.clone(),
            vault.clone(),
        )
        .context("failed to build webhook dispatcher")?,
    );

    bootstrap::seed(&cfg.bootstrap, stores.apps.as_ref(), stores.clients.as_ref())
        .await
        .context("bootstrap failed")?;

    Ok(AppState {
        tokens,
        webhooks,
        vault,
        stores,
    })
}

pub fn router(state: &AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(oauth_router(OAuthState::new(state.tokens.clone())))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(cfg).await?;
    Ok(router(&state))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Deletes expired authorization codes and refresh tokens. Returns how many
/// of each were removed.
pub async fn purge_expired(tokens: &TokenService) -> (u64, u64) {
    let codes = match tokens.authorization_codes().cleanup_expired().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Authorization code cleanup failed");
            0
        }
    };
    let refresh = match tokens.refresh_tokens().cleanup_expired().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Refresh token cleanup failed");
            0
        }
    };
    if codes > 0 || refresh > 0 {
        tracing::info!(codes, refresh_tokens = refresh, "Purged expired grants");
    }
    (codes, refresh)
}

/// Runs [`purge_expired`] every `period` until the task is aborted.
pub fn spawn_cleanup(tokens: Arc<TokenService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            purge_expired(&tokens).await;
        }
    })
}

pub struct TesseraServer {
    addr: String,
    state: AppState,
    cleanup_interval: Duration,
}

impl TesseraServer {
    pub async fn build(cfg: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            addr: cfg.addr(),
            state: build_state(cfg).await?,
            cleanup_interval: cfg.server.cleanup_interval,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);

        let cleanup = spawn_cleanup(self.state.tokens.clone(), self.cleanup_interval);
        let served = axum::serve(listener, router(&self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await;
        cleanup.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
