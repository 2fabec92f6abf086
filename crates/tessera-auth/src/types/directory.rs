//! Directory records supplied by the tenant management layer.
//!
//! Users, entities, memberships, apps and licenses are owned elsewhere.
//! The token lifecycle only reads them to derive claims, and the webhook
//! dispatcher reads licenses to find an entity's apps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// End user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub picture: Option<String>,
    pub active: bool,
}

/// Organization (tenant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// A user's role within an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub entity_id: String,
    pub role: String,
    /// Data scope per app slug.
    #[serde(default)]
    pub data_scopes: BTreeMap<String, DataScope>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Application registered on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub slug: String,
    pub name: String,
    /// Permission list per role name.
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<String>>,
}

impl App {
    /// Returns the permissions granted to `role`, or an empty slice.
    #[must_use]
    pub fn permissions_for(&self, role: &str) -> &[String] {
        self.permissions.get(role).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// Licenses
// =============================================================================

/// License lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Trial,
    Expired,
    Suspended,
    Cancelled,
}

/// An entity's license to use an app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub entity_id: String,
    pub app_id: String,
    pub status: LicenseStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl License {
    /// A license is usable while active or in trial and not past its expiry.
    #[must_use]
    pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
        matches!(self.status, LicenseStatus::Active | LicenseStatus::Trial)
            && self.expires_at.is_none_or(|exp| exp > now)
    }

    /// [`License::is_usable_at`] for the current instant.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(OffsetDateTime::now_utc())
    }
}

// =============================================================================
// Claim fragments
// =============================================================================

/// Kind of data a role may see inside an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataScopeType {
    All,
    Entity,
    Group,
    Own,
    Custom,
}

/// Per-app data scope carried in access tokens as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataScope {
    #[serde(rename = "type")]
    pub scope_type: DataScopeType,
    /// Opaque to the token service.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// The administrator acting on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impersonator {
    /// User id of the administrator.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Duration;

    fn license(status: LicenseStatus, expires_at: Option<OffsetDateTime>) -> License {
        License {
            id: "lic-1".to_string(),
            entity_id: "ent-1".to_string(),
            app_id: "app-1".to_string(),
            status,
            expires_at,
        }
    }

    #[test]
    fn test_license_usability() {
        let now = OffsetDateTime::now_utc();

        assert!(license(LicenseStatus::Active, None).is_usable_at(now));
        assert!(license(LicenseStatus::Trial, Some(now + Duration::days(1))).is_usable_at(now));
        assert!(!license(LicenseStatus::Active, Some(now - Duration::seconds(1))).is_usable_at(now));
        assert!(!license(LicenseStatus::Expired, None).is_usable_at(now));
        assert!(!license(LicenseStatus::Suspended, None).is_usable_at(now));
        assert!(!license(LicenseStatus::Cancelled, None).is_usable_at(now));
    }

    #[test]
    fn test_data_scope_wire_shape() {
        let scope = DataScope {
            scope_type: DataScopeType::Group,
            value: json!(["sales", "support"]),
        };
        assert_eq!(
            serde_json::to_value(&scope).unwrap(),
            json!({"type": "group", "value": ["sales", "support"]})
        );

        let parsed: DataScope = serde_json::from_value(json!({"type": "all"})).unwrap();
        assert_eq!(parsed.scope_type, DataScopeType::All);
        assert!(parsed.value.is_null());
    }

    #[test]
    fn test_app_permissions_for_role() {
        let app = App {
            id: "app-1".to_string(),
            slug: "crm".to_string(),
            name: "CRM".to_string(),
            permissions: BTreeMap::from([(
                "admin".to_string(),
                vec!["contacts:read".to_string(), "contacts:write".to_string()],
            )]),
        };

        assert_eq!(app.permissions_for("admin").len(), 2);
        assert!(app.permissions_for("viewer").is_empty());
    }

    #[test]
    fn test_license_status_serialization() {
        let value = serde_json::to_value(license(LicenseStatus::Trial, None)).unwrap();
        assert_eq!(value["status"], "trial");
        assert_eq!(value["appId"], "app-1");
    }
}
