use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::credentials::Credentials;
use crate::jira::{
    normalize_site_url, remote_error_message, HttpMethod, JiraApi, JiraApiError, JiraConnector,
    JiraRequest, API_PATH,
};

/// `Basic` authorization value for an account email and API token
pub fn basic_auth_value(email: &str, api_token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", email, api_token)))
}

/// reqwest-backed Jira client bound to `{site}/rest/api/3`
pub struct HttpJiraClient {
    http: reqwest::Client,
    site_url: String,
    api_base: String,
}

impl HttpJiraClient {
    /// Build the client. No request is made here; bad credentials surface on first use.
    pub fn new(credentials: &Credentials, timeout: Option<Duration>) -> Result<Self, JiraApiError> {
        let site_url = normalize_site_url(&credentials.base_url);

        let mut auth = HeaderValue::from_str(&basic_auth_value(&credentials.email, &credentials.api_token))
            .map_err(|e| JiraApiError::Client(format!("invalid credentials for auth header: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("jira-mcp-bridge/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| JiraApiError::Client(e.to_string()))?;

        Ok(Self {
            api_base: format!("{}{}", site_url, API_PATH),
            site_url,
            http,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl JiraApi for HttpJiraClient {
    fn site_url(&self) -> &str {
        &self.site_url
    }

    async fn send(&self, request: JiraRequest) -> Result<Value, JiraApiError> {
        let url = format!("{}{}", self.api_base, request.path);

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Put => self.http.put(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| JiraApiError::Transport(e.to_string()))?;
        let status = response.status();
        debug!(mutating = request.is_mutating(), "{:?} {} -> {}", request.method, request.path, status);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| JiraApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(JiraApiError::Remote {
                status: status.as_u16(),
                message: remote_error_message(status.as_u16(), &bytes),
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| JiraApiError::Decode(e.to_string()))
    }
}

/// Connector producing [`HttpJiraClient`]s
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    pub timeout: Option<Duration>,
}

impl HttpConnector {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl JiraConnector for HttpConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn JiraApi>, JiraApiError> {
        Ok(Arc::new(HttpJiraClient::new(credentials, self.timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn credentials(url: &str) -> Credentials {
        Credentials {
            base_url: url.to_string(),
            email: "dev@acme.io".to_string(),
            api_token: "token123".to_string(),
        }
    }

    #[test]
    fn test_basic_auth_encoding() {
        // base64("dev@acme.io:token123")
        assert_eq!(
            basic_auth_value("dev@acme.io", "token123"),
            "Basic ZGV2QGFjbWUuaW86dG9rZW4xMjM="
        );
    }

    #[test]
    fn test_client_binds_api_base() {
        let client = HttpJiraClient::new(&credentials("https://acme.atlassian.net/"), None).unwrap();
        assert_eq!(client.site_url(), "https://acme.atlassian.net");
        assert_eq!(client.api_base(), "https://acme.atlassian.net/rest/api/3");
    }

    #[test]
    fn test_connector_does_not_touch_network() {
        let connector = HttpConnector::new(Some(Duration::from_secs(5)));
        let client = connector.connect(&credentials("https://unreachable.invalid")).unwrap();
        assert_eq!(client.site_url(), "https://unreachable.invalid");
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Port 9 on loopback (discard) is not expected to accept connections in test environments
        let client = HttpJiraClient::new(&credentials("http://127.0.0.1:9"), Some(Duration::from_secs(2))).unwrap();
        let err = client.send(JiraRequest::get("/myself")).await.unwrap_err();
        assert!(matches!(err, JiraApiError::Transport(_)));
    }

    /// Answer one request on loopback with a canned response and return the raw request
    async fn canned_jira(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let site = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (site, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let body_len = header(&text[..end], "content-length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + body_len
    }

    fn header(raw: &str, name: &str) -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    #[tokio::test]
    async fn test_request_carries_auth_and_query() {
        let (site, server) = canned_jira("200 OK", r#"{"values":[]}"#).await;
        let client = HttpJiraClient::new(&credentials(&site), None).unwrap();

        let value = client
            .send(JiraRequest::get("/project/search").with_query("maxResults", 50))
            .await
            .unwrap();
        assert_eq!(value, json!({"values": []}));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /rest/api/3/project/search?maxResults=50 HTTP/1.1\r\n"), "{}", raw);
        assert_eq!(
            header(&raw, "authorization").as_deref(),
            Some("Basic ZGV2QGFjbWUuaW86dG9rZW4xMjM=")
        );
        assert_eq!(header(&raw, "accept").as_deref(), Some("application/json"));
        assert_eq!(header(&raw, "content-type").as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_error_status_becomes_remote_error() {
        let body = r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."],"errors":{}}"#;
        let (site, server) = canned_jira("404 Not Found", body).await;
        let client = HttpJiraClient::new(&credentials(&site), None).unwrap();

        let err = client.send(JiraRequest::get("/issue/NOPE-1")).await.unwrap_err();
        assert_eq!(
            err,
            JiraApiError::Remote {
                status: 404,
                message: "Issue does not exist or you do not have permission to see it.".to_string(),
            }
        );
        assert!(server.await.unwrap().starts_with("GET /rest/api/3/issue/NOPE-1 "));
    }

    #[tokio::test]
    async fn test_no_content_is_null() {
        let (site, server) = canned_jira("204 No Content", "").await;
        let client = HttpJiraClient::new(&credentials(&site), None).unwrap();

        let value = client
            .send(JiraRequest::put("/issue/ABC-1", json!({"fields": {"summary": "x"}})))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("PUT /rest/api/3/issue/ABC-1 "));
        assert!(raw.ends_with(r#"{"fields":{"summary":"x"}}"#), "{}", raw);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let (site, _server) = canned_jira("200 OK", "not json").await;
        let client = HttpJiraClient::new(&credentials(&site), None).unwrap();

        let err = client.send(JiraRequest::get("/myself")).await.unwrap_err();
        assert!(matches!(err, JiraApiError::Decode(_)), "{:?}", err);
    }
}
