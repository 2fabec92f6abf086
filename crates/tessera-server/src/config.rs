use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_auth::config::AuthConfig;
use tessera_auth::types::GrantType;
use tessera_webhooks::{WebhookConfig, WebhookError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Issuer, token lifetimes, signing key and vault
    #[serde(default)]
    pub auth: AuthConfig,
    /// Outbound webhook delivery
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Development seed data
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Auth(#[from] tessera_auth::ConfigError),

    #[error(transparent)]
    Webhooks(#[from] WebhookError),
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        if self.server.cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "server.cleanup_interval must be > 0".into(),
            ));
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        self.auth.validate()?;
        self.webhooks.validate()?;

        for client in &self.bootstrap.clients {
            if !self.bootstrap.apps.iter().any(|app| app.id == client.app_id) {
                return Err(ConfigError::Invalid(format!(
                    "bootstrap client '{}' references unknown app '{}'",
                    client.client_id, client.app_id
                )));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often expired codes and refresh tokens are purged
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Apps and clients created at startup.
///
/// Client secrets may also come from the environment, e.g.
/// `TESSERA__BOOTSTRAP__CLIENTS__0__SECRET`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub apps: Vec<BootstrapApp>,
    pub clients: Vec<BootstrapClient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapApp {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapClient {
    pub client_id: String,
    pub app_id: String,
    pub name: String,
    /// Plain text; hashed before it is stored. Omit for a public client.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<GrantType>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub access_token_lifetime: Option<i64>,
    #[serde(default)]
    pub refresh_token_lifetime: Option<i64>,
}

fn default_grant_types() -> Vec<GrantType> {
    vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
}

impl fmt::Debug for BootstrapClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapClient")
            .field("client_id", &self.client_id)
            .field("app_id", &self.app_id)
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .field("scopes", &self.scopes)
            .finish()
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use ::config::{Config, Environment, File, FileFormat};
    use std::path::Path;

    /// Loads `path` if it exists, then applies `TESSERA__SECTION__KEY`
    /// environment overrides and validates the result.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let path = path.unwrap_or_else(|| Path::new("tessera.toml"));
        if path.exists() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        // e.g. TESSERA__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TESSERA")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.webhooks.header_prefix, "Tessera");
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9191
cleanup_interval = "1m"

[auth]
issuer = "https://id.example.com"

[auth.oauth]
access_token_lifetime = "15m"

[webhooks]
timeout = "5s"

[logging]
level = "debug"

[[bootstrap.apps]]
id = "app-1"
slug = "crm"
name = "CRM"
permissions = {{ admin = ["contacts:read"] }}

[[bootstrap.clients]]
client_id = "crm-web"
app_id = "app-1"
name = "CRM Web"
redirect_uris = ["https://crm.example.com/cb"]
"#
        )
        .unwrap();

        let config = loader::load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.auth.issuer, "https://id.example.com");
        assert_eq!(
            config.auth.oauth.access_token_lifetime,
            Duration::from_secs(900)
        );
        assert_eq!(config.webhooks.timeout, Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.bootstrap.apps[0].permissions["admin"], ["contacts:read"]);
        let client = &config.bootstrap.clients[0];
        assert!(client.secret.is_none());
        assert_eq!(client.grant_types, default_grant_types());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.auth.issuer = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Auth(_))));

        let mut config = AppConfig::default();
        config.webhooks.header_prefix = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Webhooks(_))));

        let mut config = AppConfig::default();
        config.bootstrap.clients.push(BootstrapClient {
            client_id: "orphan".into(),
            app_id: "missing".into(),
            name: "Orphan".into(),
            secret: Some("s3cret".into()),
            redirect_uris: vec![],
            grant_types: default_grant_types(),
            scopes: vec![],
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(!format!("{:?}", config.bootstrap.clients[0]).contains("s3cret"));
    }
}
