//! OpenID Connect UserInfo response.

use serde::Serialize;

use super::claims::AccessClaims;
use crate::oauth::scope;
use crate::types::User;

/// Claims returned from the userinfo endpoint, limited by granted scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserInfoResponse {
    pub sub: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserInfoResponse {
    /// Builds the response from a freshly loaded user and the token claims.
    #[must_use]
    pub fn build(user: &User, claims: &AccessClaims) -> Self {
        let mut info = Self {
            sub: user.id.clone(),
            ..Self::default()
        };

        if scope::contains(&claims.scope, scope::PROFILE) {
            info.name.clone_from(&user.name);
            info.picture.clone_from(&user.picture);
        }

        if scope::contains(&claims.scope, scope::EMAIL) {
            info.email.clone_from(&user.email);
            info.email_verified = Some(user.email_verified);
        }

        if scope::contains(&claims.scope, scope::ORGANIZATION) {
            info.entity_id.clone_from(&claims.entity_id);
            info.entity_name.clone_from(&claims.entity_name);
            info.entity_slug.clone_from(&claims.entity_slug);
            info.role.clone_from(&claims.role);
        }

        info
    }
}
