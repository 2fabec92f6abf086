//! Token claims and their assembly from directory state.
//!
//! Claims are derived fresh on every issuance. Nothing here is cached, so a
//! role or license change takes effect on the next refresh.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::scope;
use crate::storage::{AppStorage, EntityStorage, LicenseStorage, MembershipStorage, UserStorage};
use crate::types::{Client, DataScope, Impersonator, User};

/// Claims carried by an access token in addition to the signed envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Authorized party (client id).
    pub azp: String,

    /// Granted scopes, space separated.
    pub scope: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_slug: Option<String>,

    /// Role within the entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Permissions the role holds in the client's app.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Data scope per app slug.
    #[serde(default)]
    pub app_scopes: BTreeMap<String, DataScope>,

    /// Slugs of apps the entity holds a usable license for.
    #[serde(default)]
    pub licensed_apps: Vec<String>,

    /// Present when an operator acts on behalf of the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<Impersonator>,
}

impl AccessClaims {
    /// Returns `true` if `wanted` is among the granted scopes.
    #[must_use]
    pub fn has_scope(&self, wanted: &str) -> bool {
        scope::contains(&self.scope, wanted)
    }
}

/// Claims carried by an ID token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub azp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl IdTokenClaims {
    /// Builds ID token claims, disclosing only what `granted` covers.
    #[must_use]
    pub fn for_user(user: &User, client_id: &str, granted: &str, nonce: Option<String>) -> Self {
        let mut claims = Self {
            azp: client_id.to_string(),
            nonce,
            ..Self::default()
        };

        if scope::contains(granted, scope::PROFILE) {
            claims.name.clone_from(&user.name);
            claims.picture.clone_from(&user.picture);
        }

        if scope::contains(granted, scope::EMAIL) {
            claims.email.clone_from(&user.email);
            claims.email_verified = Some(user.email_verified);
        }

        claims
    }
}

/// Read handles on the directory the claims are derived from.
#[derive(Clone)]
pub struct DirectoryStores {
    pub users: Arc<dyn UserStorage>,
    pub entities: Arc<dyn EntityStorage>,
    pub memberships: Arc<dyn MembershipStorage>,
    pub apps: Arc<dyn AppStorage>,
    pub licenses: Arc<dyn LicenseStorage>,
}

/// Result of [`ClaimsAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct AssembledClaims {
    pub user: User,
    pub claims: AccessClaims,
}

/// Derives [`AccessClaims`] for a user and client.
#[derive(Clone)]
pub struct ClaimsAssembler {
    stores: DirectoryStores,
}

impl ClaimsAssembler {
    #[must_use]
    pub fn new(stores: DirectoryStores) -> Self {
        Self { stores }
    }

    /// Returns the user directory handle.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStorage> {
        &self.stores.users
    }

    /// Loads the user and their organization context.
    ///
    /// The earliest-created membership is used. A user without any
    /// membership gets empty organization claims.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the user does not exist or is inactive,
    /// or a storage error.
    pub async fn assemble(
        &self,
        user_id: &str,
        client: &Client,
        granted_scope: &str,
        impersonator: Option<Impersonator>,
    ) -> AuthResult<AssembledClaims> {
        let user = self
            .stores
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AuthError::invalid_grant("User not found or inactive"))?;

        let mut claims = AccessClaims {
            azp: client.client_id.clone(),
            scope: granted_scope.to_string(),
            impersonator,
            ..AccessClaims::default()
        };

        let memberships = self.stores.memberships.list_by_user(user_id).await?;
        let Some(membership) = memberships.into_iter().min_by_key(|m| m.created_at) else {
            tracing::debug!(user_id, "User has no membership, issuing without organization");
            return Ok(AssembledClaims { user, claims });
        };

        if let Some(entity) = self.stores.entities.find_by_id(&membership.entity_id).await? {
            claims.entity_name = Some(entity.name);
            claims.entity_slug = Some(entity.slug);
        }
        claims.entity_id = Some(membership.entity_id.clone());

        if let Some(app) = self.stores.apps.find_by_id(&client.app_id).await? {
            claims.permissions = app.permissions_for(&membership.role).to_vec();
        }
        claims.role = Some(membership.role);
        claims.app_scopes = membership.data_scopes;

        let now = time::OffsetDateTime::now_utc();
        let licenses = self
            .stores
            .licenses
            .list_by_entity(&membership.entity_id)
            .await?;
        for license in licenses.into_iter().filter(|l| l.is_usable_at(now)) {
            let Some(app) = self.stores.apps.find_by_id(&license.app_id).await? else {
                continue;
            };
            if !claims.licensed_apps.contains(&app.slug) {
                claims.licensed_apps.push(app.slug);
            }
        }

        Ok(AssembledClaims { user, claims })
    }
}
