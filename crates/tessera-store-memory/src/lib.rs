//! In-memory storage backend for Tessera.
//!
//! Every storage trait of `tessera-auth` and `tessera-webhooks` is
//! implemented over `dashmap`. Suitable for development, tests and
//! single-node deployments; nothing survives a restart.
//!
//! # Example
//!
//! ```ignore
//! use tessera_store_memory::MemoryStores;
//!
//! let stores = MemoryStores::new();
//! let service = TokenService::new(keys, stores.token_stores(), &config.oauth);
//! ```

pub mod directory;
pub mod oauth;
pub mod webhooks;

use std::sync::Arc;

use tessera_auth::token::DirectoryStores;
use tessera_auth::TokenStores;

pub use directory::{
    MemoryAppStore, MemoryEntityStore, MemoryLicenseStore, MemoryMembershipStore,
    MemoryUserStore,
};
pub use oauth::{MemoryClientStore, MemoryCodeStore, MemoryRefreshTokenStore};
pub use webhooks::MemoryWebhookStore;

/// One shared instance of every in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    pub clients: Arc<MemoryClientStore>,
    pub codes: Arc<MemoryCodeStore>,
    pub refresh_tokens: Arc<MemoryRefreshTokenStore>,
    pub users: Arc<MemoryUserStore>,
    pub entities: Arc<MemoryEntityStore>,
    pub memberships: Arc<MemoryMembershipStore>,
    pub apps: Arc<MemoryAppStore>,
    pub licenses: Arc<MemoryLicenseStore>,
    pub webhooks: Arc<MemoryWebhookStore>,
}

impl MemoryStores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage handles for the token service.
    #[must_use]
    pub fn token_stores(&self) -> TokenStores {
        TokenStores {
            clients: self.clients.clone(),
            authorization_codes: self.codes.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            directory: DirectoryStores {
                users: self.users.clone(),
                entities: self.entities.clone(),
                memberships: self.memberships.clone(),
                apps: self.apps.clone(),
                licenses: self.licenses.clone(),
            },
        }
    }
}
