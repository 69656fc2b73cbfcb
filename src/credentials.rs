/// Credential resolution for the Jira adapter
///
/// Each field is looked up independently across an ordered list of sources:
/// the OS keychain entries written by the installer first, then the process
/// environment. The first non-empty value wins.
use std::collections::HashMap;
use std::env;
use std::fmt;

use tracing::debug;

use crate::mcp::errors::{MCPError, MCPResult};

/// Command that stores credentials in the keychain
pub const INSTALLER_COMMAND: &str = "npx @akurait/jira-mcp-skill";

/// One of the three values needed to authenticate against Jira
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    Url,
    Email,
    Token,
}

impl CredentialField {
    pub const ALL: [CredentialField; 3] = [Self::Url, Self::Email, Self::Token];

    /// Keychain account name under the service namespace
    pub fn keyring_user(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Email => "email",
            Self::Token => "token",
        }
    }

    /// Environment variable used as fallback
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Url => "JIRA_URL",
            Self::Email => "JIRA_EMAIL",
            Self::Token => "JIRA_API_TOKEN",
        }
    }
}

/// Fully resolved credentials
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// A place credential values can come from
pub trait CredentialSource: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Look up a single field. Absent values are `None`, never an error.
    fn lookup(&self, field: CredentialField) -> Option<String>;
}

/// Credential Manager target name the installer uses on Windows
pub fn windows_target_name(service: &str, user: &str) -> String {
    format!("{}/{}", service, user)
}

/// Secret Service attributes libsecret-based installers tag their items with
pub fn secret_service_attributes<'a>(service: &'a str, user: &'a str) -> HashMap<&'a str, &'a str> {
    HashMap::from([("service", service), ("account", user)])
}

/// OS keychain, keyed by a fixed service name
///
/// Reads the entries the installer writes: generic passwords on macOS,
/// `service/user` targets on Windows and `service`/`account` tagged items
/// in the Secret Service on Linux.
pub struct KeyringSource {
    service: String,
}

impl KeyringSource {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    #[cfg(target_os = "windows")]
    fn entry(&self, user: &str) -> keyring::Result<keyring::Entry> {
        keyring::Entry::new_with_target(&windows_target_name(&self.service, user), &self.service, user)
    }

    #[cfg(not(target_os = "windows"))]
    fn entry(&self, user: &str) -> keyring::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, user)
    }

    #[cfg(target_os = "linux")]
    fn installer_item(&self, user: &str) -> Option<String> {
        use dbus_secret_service::{EncryptionType, SecretService};

        let lookup = || -> Result<Option<String>, dbus_secret_service::Error> {
            let ss = SecretService::connect(EncryptionType::Dh)?;
            let search = ss.search_items(secret_service_attributes(&self.service, user))?;
            if let Some(item) = search.unlocked.first() {
                return Ok(String::from_utf8(item.get_secret()?).ok());
            }
            match search.locked.first() {
                Some(item) => {
                    item.unlock()?;
                    Ok(String::from_utf8(item.get_secret()?).ok())
                }
                None => Ok(None),
            }
        };

        match lookup() {
            Ok(value) => value,
            Err(e) => {
                debug!("Secret Service lookup failed for {}/{}: {}", self.service, user, e);
                None
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn installer_item(&self, _user: &str) -> Option<String> {
        None
    }
}

impl CredentialSource for KeyringSource {
    fn name(&self) -> &str {
        "keyring"
    }

    fn lookup(&self, field: CredentialField) -> Option<String> {
        let user = field.keyring_user();
        if let Some(value) = self.installer_item(user) {
            return Some(value);
        }

        let entry = match self.entry(user) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Keyring unavailable for {}/{}: {}", self.service, user, e);
                return None;
            }
        };

        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!("Keyring lookup failed for {}/{}: {}", self.service, user, e);
                None
            }
        }
    }
}

/// Process environment
pub struct EnvironmentSource;

impl CredentialSource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, field: CredentialField) -> Option<String> {
        env::var(field.env_var()).ok()
    }
}

/// Fixed in-memory values, mostly useful for tests and embedding
#[derive(Default)]
pub struct StaticSource {
    label: String,
    values: HashMap<CredentialField, String>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, field: CredentialField, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }
}

impl CredentialSource for StaticSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookup(&self, field: CredentialField) -> Option<String> {
        self.values.get(&field).cloned()
    }
}

/// Resolves credentials across sources in priority order
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Keychain first, then environment
    pub fn with_defaults(keyring_service: &str) -> Self {
        Self::new(vec![
            Box::new(KeyringSource::new(keyring_service)),
            Box::new(EnvironmentSource),
        ])
    }

    /// Resolve all three fields, failing before any Jira call if one is missing
    pub fn resolve(&self) -> MCPResult<Credentials> {
        let mut missing = Vec::new();
        let mut resolved = HashMap::new();

        for field in CredentialField::ALL {
            match self.lookup_field(field) {
                Some(value) => {
                    resolved.insert(field, value);
                }
                None => missing.push(field.keyring_user()),
            }
        }

        if !missing.is_empty() {
            return Err(MCPError::Configuration(format!(
                "Jira credentials not configured (missing: {}). Run the installer: {}",
                missing.join(", "),
                INSTALLER_COMMAND
            )));
        }

        let mut take = |field: CredentialField| resolved.remove(&field).unwrap_or_default();
        Ok(Credentials {
            base_url: take(CredentialField::Url),
            email: take(CredentialField::Email),
            api_token: take(CredentialField::Token),
        })
    }

    fn lookup_field(&self, field: CredentialField) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let value = source
                .lookup(field)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())?;
            debug!("Resolved {} from {}", field.keyring_user(), source.name());
            Some(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(label: &str) -> StaticSource {
        StaticSource::new(label)
            .with(CredentialField::Url, format!("https://{}.atlassian.net", label))
            .with(CredentialField::Email, format!("{}@example.com", label))
            .with(CredentialField::Token, format!("{}-token", label))
    }

    #[test]
    fn test_first_source_wins() {
        let resolver = CredentialResolver::new(vec![Box::new(full("store")), Box::new(full("env"))]);
        let creds = resolver.resolve().unwrap();
        assert_eq!(creds.base_url, "https://store.atlassian.net");
        assert_eq!(creds.email, "store@example.com");
        assert_eq!(creds.api_token, "store-token");
    }

    #[test]
    fn test_fields_resolve_independently() {
        let store = StaticSource::new("store").with(CredentialField::Token, "secret");
        let env = StaticSource::new("env")
            .with(CredentialField::Url, "https://acme.atlassian.net")
            .with(CredentialField::Email, "dev@acme.io")
            .with(CredentialField::Token, "env-secret");

        let creds = CredentialResolver::new(vec![Box::new(store), Box::new(env)])
            .resolve()
            .unwrap();

        assert_eq!(creds.base_url, "https://acme.atlassian.net");
        assert_eq!(creds.email, "dev@acme.io");
        assert_eq!(creds.api_token, "secret");
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let store = StaticSource::new("store")
            .with(CredentialField::Url, "   ")
            .with(CredentialField::Email, "");
        let creds = CredentialResolver::new(vec![Box::new(store), Box::new(full("env"))])
            .resolve()
            .unwrap();
        assert_eq!(creds.base_url, "https://env.atlassian.net");
        assert_eq!(creds.email, "env@example.com");
    }

    #[test]
    fn test_missing_fields_name_installer() {
        let partial = StaticSource::new("env").with(CredentialField::Url, "https://acme.atlassian.net");
        let err = CredentialResolver::new(vec![Box::new(partial)])
            .resolve()
            .unwrap_err();

        match err {
            MCPError::Configuration(message) => {
                assert!(message.contains("missing: email, token"));
                assert!(message.contains(INSTALLER_COMMAND));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_installer_entry_names() {
        assert_eq!(windows_target_name("jira-mcp-skill", "token"), "jira-mcp-skill/token");

        let attributes = secret_service_attributes("jira-mcp-skill", "url");
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes["service"], "jira-mcp-skill");
        assert_eq!(attributes["account"], "url");
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials {
            base_url: "https://acme.atlassian.net".to_string(),
            email: "dev@acme.io".to_string(),
            api_token: "super-secret".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
