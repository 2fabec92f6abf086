//! Users, entities, memberships, apps and licenses.

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_auth::AuthResult;
use tessera_auth::storage::{
    AppStorage, EntityStorage, LicenseStorage, MembershipStorage, UserStorage,
};
use tessera_auth::types::{App, Entity, License, Membership, User};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

#[async_trait]
impl UserStorage for MemoryUserStore {
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: DashMap<String, Entity>,
}

#[async_trait]
impl EntityStorage for MemoryEntityStore {
    async fn find_by_id(&self, entity_id: &str) -> AuthResult<Option<Entity>> {
        Ok(self.entities.get(entity_id).map(|e| e.value().clone()))
    }

    async fn save(&self, entity: &Entity) -> AuthResult<()> {
        self.entities.insert(entity.id.clone(), entity.clone());
        Ok(())
    }
}

/// Memberships keyed by membership id.
#[derive(Debug, Default)]
pub struct MemoryMembershipStore {
    memberships: DashMap<String, Membership>,
}

#[async_trait]
impl MembershipStorage for MemoryMembershipStore {
    async fn list_by_user(&self, user_id: &str) -> AuthResult<Vec<Membership>> {
        let mut found: Vec<Membership> = self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.value().clone())
            .collect();
        found.sort_by_key(|m| m.created_at);
        Ok(found)
    }

    async fn save(&self, membership: &Membership) -> AuthResult<()> {
        self.memberships
            .insert(membership.id.clone(), membership.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAppStore {
    apps: DashMap<String, App>,
}

#[async_trait]
impl AppStorage for MemoryAppStore {
    async fn find_by_id(&self, app_id: &str) -> AuthResult<Option<App>> {
        Ok(self.apps.get(app_id).map(|a| a.value().clone()))
    }

    async fn save(&self, app: &App) -> AuthResult<()> {
        self.apps.insert(app.id.clone(), app.clone());
        Ok(())
    }
}

/// Licenses keyed by license id.
#[derive(Debug, Default)]
pub struct MemoryLicenseStore {
    licenses: DashMap<String, License>,
}

#[async_trait]
impl LicenseStorage for MemoryLicenseStore {
    async fn list_by_entity(&self, entity_id: &str) -> AuthResult<Vec<License>> {
        Ok(self
            .licenses
            .iter()
            .filter(|l| l.entity_id == entity_id)
            .map(|l| l.value().clone())
            .collect())
    }

    async fn save(&self, license: &License) -> AuthResult<()> {
        self.licenses.insert(license.id.clone(), license.clone());
        Ok(())
    }
}
