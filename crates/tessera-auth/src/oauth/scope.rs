//! The fixed OpenID Connect scope vocabulary.
//!
//! Only `openid`, `profile`, `email` and `organization` are recognised.
//! Anything else is dropped when a grant is recorded.

/// Scope that turns an OAuth grant into an OpenID Connect one.
pub const OPENID: &str = "openid";
/// Grants `name` and `picture`.
pub const PROFILE: &str = "profile";
/// Grants `email` and `email_verified`.
pub const EMAIL: &str = "email";
/// Grants entity identity and role.
pub const ORGANIZATION: &str = "organization";

/// Every scope the server understands, in discovery order.
pub const SUPPORTED_SCOPES: [&str; 4] = [OPENID, PROFILE, EMAIL, ORGANIZATION];

/// Returns `true` if the space-delimited `scope` contains `wanted`.
#[must_use]
pub fn contains(scope: &str, wanted: &str) -> bool {
    scope.split_whitespace().any(|s| s == wanted)
}

/// Normalizes a requested scope string.
///
/// Keeps supported scopes that `allowed` permits (an empty `allowed` list
/// permits all), removes duplicates and preserves request order.
#[must_use]
pub fn normalize(requested: &str, allowed: &[String]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for s in requested.split_whitespace() {
        let supported = SUPPORTED_SCOPES.contains(&s);
        let permitted = allowed.is_empty() || allowed.iter().any(|a| a == s);
        if supported && permitted && !kept.contains(&s) {
            kept.push(s);
        }
    }
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        assert!(contains("openid profile", "openid"));
        assert!(contains("  profile   openid ", "openid"));
        assert!(!contains("openidx profile", "openid"));
        assert!(!contains("", "openid"));
    }

    #[test]
    fn test_normalize_drops_unknown_and_duplicates() {
        assert_eq!(
            normalize("openid admin email openid", &[]),
            "openid email"
        );
    }

    #[test]
    fn test_normalize_respects_client_allow_list() {
        let allowed = vec!["openid".to_string(), "profile".to_string()];
        assert_eq!(
            normalize("openid profile email organization", &allowed),
            "openid profile"
        );
    }
}
