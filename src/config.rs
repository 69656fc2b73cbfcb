use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Keychain service name the installer stores credentials under
pub const DEFAULT_KEYRING_SERVICE: &str = "jira-mcp-skill";

/// Story point custom field of the Jira instance this server was first deployed against.
/// Other instances usually number it differently; override with `JIRA_STORY_POINTS_FIELD`.
pub const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10032";

pub const DEFAULT_PAGE_SIZE: u32 = 50;

pub const KEYRING_SERVICE_VAR: &str = "JIRA_MCP_KEYRING_SERVICE";
pub const STORY_POINTS_FIELD_VAR: &str = "JIRA_STORY_POINTS_FIELD";
pub const PAGE_SIZE_VAR: &str = "JIRA_MCP_PAGE_SIZE";
pub const REQUEST_TIMEOUT_VAR: &str = "JIRA_MCP_REQUEST_TIMEOUT_SECS";
pub const LOG_DIR_VAR: &str = "JIRA_MCP_LOG_DIR";
/// Tracing filter directives; `RUST_LOG` is consulted when unset
pub const LOG_FILTER_VAR: &str = "JIRA_MCP_LOG";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// Deployment settings for the bridge
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub keyring_service: String,
    pub story_points_field: String,
    pub default_page_size: u32,
    /// Per-request deadline for Jira calls. `None` keeps calls unbounded.
    pub request_timeout: Option<Duration>,
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            story_points_field: DEFAULT_STORY_POINTS_FIELD.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Build the config from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(service) = get(KEYRING_SERVICE_VAR) {
            config.keyring_service = service;
        }
        if let Some(field) = get(STORY_POINTS_FIELD_VAR) {
            config.story_points_field = field;
        }
        if let Some(raw) = get(PAGE_SIZE_VAR) {
            config.default_page_size = parse_positive(PAGE_SIZE_VAR, &raw)? as u32;
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_VAR) {
            config.request_timeout = Some(Duration::from_secs(parse_positive(REQUEST_TIMEOUT_VAR, &raw)?));
        }
        config.log_dir = get(LOG_DIR_VAR).map(PathBuf::from);

        Ok(config)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 && value <= u32::MAX as u64 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}
