//! Client authentication for the token, revocation and introspection endpoints.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients (client_id only, PKCE required)
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! When a Basic header is present it wins over body parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ClientStorage;
use crate::types::Client;
use crate::vault;

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Every method, in discovery order.
    pub const ALL: [Self; 3] = [Self::ClientSecretBasic, Self::ClientSecretPost, Self::None];

    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credentials presented by a client, before verification.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub method: TokenEndpointAuthMethod,
}

impl ClientCredentials {
    /// Picks the credentials to verify from a Basic header and body fields.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if no client id is present, or if the body
    /// names a different client than the Basic header.
    pub fn resolve(
        basic: Option<(String, String)>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> AuthResult<Self> {
        if let Some((client_id, client_secret)) = basic {
            if body_client_id.is_some_and(|id| id != client_id) {
                return Err(AuthError::invalid_client(
                    "client_id in body does not match Authorization header",
                ));
            }
            return Ok(Self {
                client_id,
                client_secret: Some(client_secret),
                method: TokenEndpointAuthMethod::ClientSecretBasic,
            });
        }

        let client_id = body_client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::invalid_client("No client credentials provided"))?;

        Ok(match body_client_secret {
            Some(secret) => Self {
                client_id: client_id.to_string(),
                client_secret: Some(secret.to_string()),
                method: TokenEndpointAuthMethod::ClientSecretPost,
            },
            None => Self {
                client_id: client_id.to_string(),
                client_secret: None,
                method: TokenEndpointAuthMethod::None,
            },
        })
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("method", &self.method)
            .finish()
    }
}

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Verifies client credentials against the stored registration.
///
/// # Errors
///
/// Returns `invalid_client` if:
/// - The client is not found or not active
/// - A confidential client sends no secret, or the wrong one
/// - A public client sends a secret
///
/// Storage failures are passed through.
pub async fn authenticate_client(
    credentials: &ClientCredentials,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    let client = client_storage
        .find_by_client_id(&credentials.client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.active {
        return Err(AuthError::invalid_client("Client is inactive"));
    }

    match (&client.client_secret_hash, &credentials.client_secret) {
        (Some(hash), Some(secret)) => {
            let hash = hash.clone();
            let secret = secret.clone();
            // Argon2 is CPU bound
            let valid = tokio::task::spawn_blocking(move || vault::verify_secret(&secret, &hash))
                .await
                .map_err(|e| AuthError::internal(format!("secret verification task failed: {e}")))?;

            if !valid {
                tracing::debug!(client_id = %client.client_id, "Client secret mismatch");
                return Err(AuthError::invalid_client("Invalid client credentials"));
            }
        }
        (Some(_), None) => {
            return Err(AuthError::invalid_client(
                "Confidential clients must provide client credentials",
            ));
        }
        (None, Some(_)) => {
            return Err(AuthError::invalid_client(
                "Public clients cannot authenticate with a secret",
            ));
        }
        (None, None) => {}
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: credentials.method,
    })
}

/// Parses HTTP Basic Auth header value.
///
/// Both halves are form-urlencoded per RFC 6749 Section 2.3.1.
///
/// ```ignore
/// let auth_header = "Basic Y2xpZW50X2lkOmNsaWVudF9zZWNyZXQ=";
/// assert_eq!(
///     parse_basic_auth(auth_header),
///     Some(("client_id".to_string(), "client_secret".to_string()))
/// );
/// ```
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((form_decode(client_id), form_decode(client_secret)))
}

fn form_decode(value: &str) -> String {
    // Raw separators would split the synthetic pair
    let escaped = value.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(format!("v={escaped}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GrantType;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct MockClientStorage {
        clients: RwLock<HashMap<String, Client>>,
    }

    impl MockClientStorage {
        fn new() -> Self {
            let storage = Self {
                clients: RwLock::new(HashMap::new()),
            };

            let mut confidential = make_client("backend");
            confidential.client_secret_hash = Some(vault::hash_secret("s3cret:with:colons").unwrap());
            storage.insert(confidential);

            storage.insert(make_client("spa"));

            let mut inactive = make_client("retired");
            inactive.active = false;
            storage.insert(inactive);

            storage
        }

        fn insert(&self, client: Client) {
            self.clients
                .write()
                .unwrap()
                .insert(client.client_id.clone(), client);
        }
    }

    #[async_trait::async_trait]
    impl ClientStorage for MockClientStorage {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.clients.read().unwrap().get(client_id).cloned())
        }

        async fn save(&self, client: &Client) -> AuthResult<()> {
            self.insert(client.clone());
            Ok(())
        }

        async fn delete(&self, client_id: &str) -> AuthResult<bool> {
            Ok(self.clients.write().unwrap().remove(client_id).is_some())
        }
    }

    fn make_client(client_id: &str) -> Client {
        Client {
            client_id: client_id.to_string(),
            client_secret_hash: None,
            app_id: "app-1".to_string(),
            name: client_id.to_string(),
            redirect_uris: vec!["https://app.example.com/cb".to_string()],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scopes: vec![],
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            active: true,
        }
    }

    fn creds(
        basic: Option<(&str, &str)>,
        id: Option<&str>,
        secret: Option<&str>,
    ) -> AuthResult<ClientCredentials> {
        ClientCredentials::resolve(
            basic.map(|(a, b)| (a.to_string(), b.to_string())),
            id,
            secret,
        )
    }

    #[tokio::test]
    async fn test_basic_auth_success() {
        let storage = MockClientStorage::new();
        let credentials = creds(Some(("backend", "s3cret:with:colons")), None, None).unwrap();

        let result = authenticate_client(&credentials, &storage).await.unwrap();
        assert_eq!(result.client.client_id, "backend");
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::ClientSecretBasic);
    }

    #[tokio::test]
    async fn test_secret_post_success() {
        let storage = MockClientStorage::new();
        let credentials = creds(None, Some("backend"), Some("s3cret:with:colons")).unwrap();

        let result = authenticate_client(&credentials, &storage).await.unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::ClientSecretPost);
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let storage = MockClientStorage::new();
        let credentials = creds(Some(("backend", "nope")), None, None).unwrap();

        let err = authenticate_client(&credentials, &storage).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));
    }

    #[tokio::test]
    async fn test_confidential_without_secret() {
        let storage = MockClientStorage::new();
        let credentials = creds(None, Some("backend"), None).unwrap();

        let err = authenticate_client(&credentials, &storage).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));
    }

    #[tokio::test]
    async fn test_public_client() {
        let storage = MockClientStorage::new();
        let credentials = creds(None, Some("spa"), None).unwrap();

        let result = authenticate_client(&credentials, &storage).await.unwrap();
        assert_eq!(result.auth_method, TokenEndpointAuthMethod::None);

        let with_secret = creds(None, Some("spa"), Some("x")).unwrap();
        assert!(authenticate_client(&with_secret, &storage).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_clients() {
        let storage = MockClientStorage::new();

        let unknown = creds(None, Some("ghost"), None).unwrap();
        assert!(matches!(
            authenticate_client(&unknown, &storage).await,
            Err(AuthError::InvalidClient { .. })
        ));

        let inactive = creds(None, Some("retired"), None).unwrap();
        assert!(matches!(
            authenticate_client(&inactive, &storage).await,
            Err(AuthError::InvalidClient { .. })
        ));
    }

    #[test]
    fn test_resolve_rules() {
        assert!(creds(None, None, None).is_err());
        assert!(creds(None, Some(""), None).is_err());
        assert!(creds(Some(("a", "b")), Some("c"), None).is_err());
        assert!(creds(Some(("a", "b")), Some("a"), None).is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = creds(None, Some("backend"), Some("hunter2")).unwrap();
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[test]
    fn test_parse_basic_auth() {
        // "client_id:client_secret"
        assert_eq!(
            parse_basic_auth("Basic Y2xpZW50X2lkOmNsaWVudF9zZWNyZXQ="),
            Some(("client_id".to_string(), "client_secret".to_string()))
        );
        // "my%3Aapp:p%40ss" decodes both halves
        assert_eq!(
            parse_basic_auth("Basic bXklM0FhcHA6cCU0MHNz"),
            Some(("my:app".to_string(), "p@ss".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer abc"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
        // "nocolon"
        assert_eq!(parse_basic_auth("Basic bm9jb2xvbg=="), None);
    }
}
