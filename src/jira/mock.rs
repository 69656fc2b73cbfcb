use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::credentials::Credentials;
use crate::jira::{JiraApi, JiraApiError, JiraConnector, JiraRequest};

/// Recording Jira double that replays scripted responses in order
#[derive(Clone)]
pub struct MockJira {
    site_url: String,
    responses: Arc<Mutex<VecDeque<Result<Value, JiraApiError>>>>,
    requests: Arc<Mutex<Vec<JiraRequest>>>,
}

impl MockJira {
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.to_string(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond(self, response: Result<Value, JiraApiError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn respond_ok(self, body: Value) -> Self {
        self.respond(Ok(body))
    }

    pub fn requests(&self) -> Vec<JiraRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl JiraApi for MockJira {
    fn site_url(&self) -> &str {
        &self.site_url
    }

    async fn send(&self, request: JiraRequest) -> Result<Value, JiraApiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

/// Connector handing out a shared [`MockJira`] and counting connections
pub struct MockConnector {
    pub jira: MockJira,
    pub connections: Arc<Mutex<Vec<Credentials>>>,
}

impl MockConnector {
    pub fn new(jira: MockJira) -> Self {
        Self {
            jira,
            connections: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl JiraConnector for MockConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn JiraApi>, JiraApiError> {
        self.connections.lock().unwrap().push(credentials.clone());
        Ok(Arc::new(self.jira.clone()))
    }
}
