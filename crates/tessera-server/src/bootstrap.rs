//! Startup seeding of apps and OAuth clients from configuration.

use tessera_auth::AuthResult;
use tessera_auth::error::AuthError;
use tessera_auth::storage::{AppStorage, ClientStorage};
use tessera_auth::types::{App, Client};
use tessera_auth::vault::hash_secret;
use tracing::{debug, info};

use crate::config::BootstrapConfig;

/// Saves every configured app and client. Existing records with the same id
/// are replaced, so restarting with the same configuration is harmless.
///
/// # Errors
///
/// Returns `Configuration` for a client registration that does not validate,
/// or the storage error if a save fails.
pub async fn seed(
    config: &BootstrapConfig,
    apps: &dyn AppStorage,
    clients: &dyn ClientStorage,
) -> AuthResult<()> {
    for app in &config.apps {
        apps.save(&App {
            id: app.id.clone(),
            slug: app.slug.clone(),
            name: app.name.clone(),
            permissions: app.permissions.clone(),
        })
        .await?;
        debug!(app_id = %app.id, slug = %app.slug, "Seeded app");
    }

    for entry in &config.clients {
        let client = Client {
            client_id: entry.client_id.clone(),
            client_secret_hash: entry.secret.as_deref().map(hash_secret).transpose()?,
            app_id: entry.app_id.clone(),
            name: entry.name.clone(),
            redirect_uris: entry.redirect_uris.clone(),
            grant_types: entry.grant_types.clone(),
            scopes: entry.scopes.clone(),
            access_token_lifetime: entry.access_token_lifetime,
            refresh_token_lifetime: entry.refresh_token_lifetime,
            active: true,
        };
        client.validate().map_err(|e| {
            AuthError::configuration(format!("bootstrap client '{}': {e}", client.client_id))
        })?;

        clients.save(&client).await?;
        info!(
            client_id = %client.client_id,
            app_id = %client.app_id,
            confidential = client.is_confidential(),
            "Seeded OAuth client"
        );
    }

    if !config.apps.is_empty() || !config.clients.is_empty() {
        info!(
            apps = config.apps.len(),
            clients = config.clients.len(),
            "Bootstrap data loaded"
        );
    }
    Ok(())
}
