/// Jira Cloud REST adapter
///
/// Handlers talk to Jira exclusively through the [`JiraApi`] trait. The
/// production implementation is [`client::HttpJiraClient`]; tests substitute a
/// recording mock.
pub mod client;
pub mod document;
#[cfg(test)]
pub mod mock;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::credentials::Credentials;

pub use self::client::{HttpConnector, HttpJiraClient};
pub use self::document::adf_document;

/// Fixed REST prefix appended to the site URL
pub const API_PATH: &str = "/rest/api/3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

/// A single call against the REST API, relative to `{site}/rest/api/3`
#[derive(Debug, Clone, PartialEq)]
pub struct JiraRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl JiraRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Put,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Whether the call changes state on the Jira side
    pub fn is_mutating(&self) -> bool {
        self.method != HttpMethod::Get
    }
}

/// Adapter-level failures. All of these are recoverable at the dispatcher.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JiraApiError {
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid JSON in Jira response: {0}")]
    Decode(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Outbound access to the Jira REST API
#[async_trait]
pub trait JiraApi: Send + Sync {
    /// Site URL without trailing slash, used for browse links
    fn site_url(&self) -> &str;

    /// Perform one request. 2xx bodies are decoded as JSON, empty bodies as `null`.
    async fn send(&self, request: JiraRequest) -> Result<Value, JiraApiError>;
}

/// Builds an adapter from resolved credentials
pub trait JiraConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn JiraApi>, JiraApiError>;
}

/// Site URL as used for browse links and the API base
pub fn normalize_site_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub fn browse_url(site_url: &str, issue_key: &str) -> String {
    format!("{}/browse/{}", site_url, issue_key)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, Value>,
}

/// Human-readable message for a non-2xx response
pub fn remote_error_message(status: u16, body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();

    if !parsed.error_messages.is_empty() {
        return parsed.error_messages.join(", ");
    }

    if !parsed.errors.is_empty() {
        return parsed
            .errors
            .iter()
            .map(|(field, message)| match message.as_str() {
                Some(text) => format!("{}: {}", field, text),
                None => format!("{}: {}", field, message),
            })
            .collect::<Vec<_>>()
            .join(", ");
    }

    format!("Request failed with status code {}", status)
}
