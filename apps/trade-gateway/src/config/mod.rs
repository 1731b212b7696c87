//! Gateway settings.
//!
//! Layered configuration: an optional `gateway.toml` next to the binary,
//! overridden by `GATEWAY_`-prefixed environment variables (`__` separates
//! nesting levels, e.g. `GATEWAY_SERVER__PORT=9091`). Account lists are
//! file-only; scalar knobs can come from either source.
//!
//! Validation runs once at startup and is fatal: a gateway with no usable
//! account configuration must not start.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    9091
}

/// Browser login settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Key the session cookie is signed with.
    #[serde(default)]
    pub secret_key: String,
    /// Username to password map; empty disables the login surface.
    #[serde(default)]
    pub users: HashMap<String, String>,
    /// Session cookie lifetime in days.
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            users: HashMap::new(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

const fn default_session_ttl_days() -> i64 {
    180
}

/// Signature-authentication settings for external callers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Tolerance window for the signed timestamp, in seconds.
    #[serde(default = "default_signature_timeout")]
    pub signature_timeout_secs: i64,
    /// Client id to signing secret map.
    #[serde(default)]
    pub clients: HashMap<String, String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            signature_timeout_secs: default_signature_timeout(),
            clients: HashMap::new(),
        }
    }
}

const fn default_signature_timeout() -> i64 {
    300
}

impl ApiSettings {
    /// Whether `client_id` is configured.
    #[must_use]
    pub fn is_valid_client(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Signing secret for `client_id`.
    #[must_use]
    pub fn client_secret(&self, client_id: &str) -> Option<&str> {
        self.clients.get(client_id).map(String::as_str)
    }
}

/// Notification webhook settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySettings {
    /// Webhook endpoint; unset disables notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Webhook signing secret.
    #[serde(default)]
    pub secret: Option<String>,
}

/// One trading account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSettings {
    /// Numeric account id.
    pub account_id: String,
    /// Strategy code; seeds the session token and the order strategy tag.
    #[serde(default = "default_strategy_code")]
    pub strategy_code: i64,
    /// Human-facing account name.
    #[serde(default)]
    pub display_name: String,
    /// Broker terminal data directory; empty means the simulated link.
    #[serde(default)]
    pub data_dir: String,
    /// Disabled accounts are skipped at startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_strategy_code() -> i64 {
    1
}

const fn default_enabled() -> bool {
    true
}

/// All gateway settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    /// HTTP server.
    #[serde(default)]
    pub server: ServerSettings,
    /// Browser login.
    #[serde(default)]
    pub auth: AuthSettings,
    /// Signature authentication.
    #[serde(default)]
    pub api: ApiSettings,
    /// Notification webhook.
    #[serde(default)]
    pub notify: NotifySettings,
    /// Trading accounts.
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

impl GatewaySettings {
    /// Load from `gateway.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("gateway").required(false))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Accounts the gateway should open sessions for.
    pub fn enabled_accounts(&self) -> impl Iterator<Item = &AccountSettings> {
        self.accounts.iter().filter(|a| a.enabled)
    }

    /// Validate the startup-fatal invariants.
    ///
    /// At least one enabled account; numeric account ids (the session token
    /// is derived from them); configured data directories must exist; every
    /// signing client needs a non-empty secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut any_enabled = false;
        for account in self.enabled_accounts() {
            any_enabled = true;
            if account.account_id.parse::<i64>().is_err() {
                return Err(ConfigError::BadAccountId {
                    account_id: account.account_id.clone(),
                });
            }
            if !account.data_dir.is_empty() && !Path::new(&account.data_dir).exists() {
                return Err(ConfigError::MissingDataDir {
                    account_id: account.account_id.clone(),
                    path: account.data_dir.clone(),
                });
            }
        }
        if !any_enabled {
            return Err(ConfigError::NoAccounts);
        }

        for (client_id, secret) in &self.api.clients {
            if secret.is_empty() {
                return Err(ConfigError::EmptyClientSecret {
                    client_id: client_id.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> AccountSettings {
        AccountSettings {
            account_id: id.to_string(),
            strategy_code: 1,
            display_name: String::new(),
            data_dir: String::new(),
            enabled: true,
        }
    }

    #[test]
    fn defaults() {
        let settings = GatewaySettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9091);
        assert_eq!(settings.api.signature_timeout_secs, 300);
        assert_eq!(settings.auth.session_ttl_days, 180);
        assert!(settings.accounts.is_empty());
    }

    #[test]
    fn validate_requires_an_enabled_account() {
        let settings = GatewaySettings::default();
        assert!(matches!(settings.validate(), Err(ConfigError::NoAccounts)));

        let mut settings = GatewaySettings::default();
        let mut disabled = account("99007036");
        disabled.enabled = false;
        settings.accounts.push(disabled);
        assert!(matches!(settings.validate(), Err(ConfigError::NoAccounts)));
    }

    #[test]
    fn validate_rejects_non_numeric_account_id() {
        let mut settings = GatewaySettings::default();
        settings.accounts.push(account("not-a-number"));
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::BadAccountId { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_data_dir() {
        let mut settings = GatewaySettings::default();
        let mut acct = account("99007036");
        acct.data_dir = "/definitely/not/a/real/broker/dir".to_string();
        settings.accounts.push(acct);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingDataDir { .. })
        ));
    }

    #[test]
    fn validate_accepts_existing_data_dir() {
        let mut settings = GatewaySettings::default();
        let mut acct = account("99007036");
        acct.data_dir = ".".to_string();
        settings.accounts.push(acct);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_client_secret() {
        let mut settings = GatewaySettings::default();
        settings.accounts.push(account("99007036"));
        settings
            .api
            .clients
            .insert("outer_client".to_string(), String::new());
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::EmptyClientSecret { .. })
        ));
    }

    #[test]
    fn client_lookup() {
        let mut api = ApiSettings::default();
        api.clients
            .insert("outer_client".to_string(), "s3cret".to_string());
        assert!(api.is_valid_client("outer_client"));
        assert!(!api.is_valid_client("other"));
        assert_eq!(api.client_secret("outer_client"), Some("s3cret"));
    }
}
