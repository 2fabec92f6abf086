//! Read access to directory records.
//!
//! These records are owned by the tenant management layer. `save` exists so
//! that layer (and development bootstrap) can push current state in.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{App, Entity, License, Membership, User};

/// Storage operations for users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Create or replace a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, user: &User) -> AuthResult<()>;
}

/// Storage operations for entities.
#[async_trait]
pub trait EntityStorage: Send + Sync {
    /// Find an entity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, entity_id: &str) -> AuthResult<Option<Entity>>;

    /// Create or replace an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, entity: &Entity) -> AuthResult<()>;
}

/// Storage operations for memberships.
#[async_trait]
pub trait MembershipStorage: Send + Sync {
    /// List a user's memberships ordered by `created_at` ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, user_id: &str) -> AuthResult<Vec<Membership>>;

    /// Create or replace a membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, membership: &Membership) -> AuthResult<()>;
}

/// Storage operations for apps.
#[async_trait]
pub trait AppStorage: Send + Sync {
    /// Find an app by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, app_id: &str) -> AuthResult<Option<App>>;

    /// Create or replace an app.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, app: &App) -> AuthResult<()>;
}

/// Storage operations for licenses.
#[async_trait]
pub trait LicenseStorage: Send + Sync {
    /// List every license held by an entity, usable or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_entity(&self, entity_id: &str) -> AuthResult<Vec<License>>;

    /// Create or replace a license.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, license: &License) -> AuthResult<()>;
}
