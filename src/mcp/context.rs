/// Dispatch context shared by every request of a server process
///
/// Holds the deployment config, the credential resolver and the connector used
/// to build the Jira adapter. The adapter is created on the first tool call and
/// reused for the lifetime of the process.
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::credentials::CredentialResolver;
use crate::jira::{JiraApi, JiraConnector};
use crate::mcp::errors::{MCPError, MCPResult};
use crate::mcp::tools::{jira, registry, ToolInfo, ToolInvocation, ToolName, ToolResult};

pub struct ServerContext {
    config: ServerConfig,
    resolver: CredentialResolver,
    connector: Box<dyn JiraConnector>,
    client: OnceCell<Arc<dyn JiraApi>>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        resolver: CredentialResolver,
        connector: Box<dyn JiraConnector>,
    ) -> Self {
        Self {
            config,
            resolver,
            connector,
            client: OnceCell::new(),
        }
    }

    /// The tool catalogue. Never touches credentials or the network.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        registry::list_tools()
    }

    /// Resolve credentials and build the adapter on first use.
    /// A failed attempt leaves the cell empty so the next call retries.
    async fn client(&self) -> MCPResult<&Arc<dyn JiraApi>> {
        self.client
            .get_or_try_init(|| async {
                let credentials = self.resolver.resolve()?;
                let client = self.connector.connect(&credentials).map_err(|e| {
                    MCPError::Configuration(format!(
                        "Cannot create Jira client for {}: {}",
                        credentials.base_url, e
                    ))
                })?;
                info!("Jira client ready for {}", client.site_url());
                Ok::<_, MCPError>(client)
            })
            .await
    }

    /// Run one tool call.
    ///
    /// Fatal problems (missing credentials, unknown tool, bad arguments,
    /// malformed Jira payloads) are returned as `Err`. Jira API failures come
    /// back as an `Ok` envelope with `is_error` set.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> MCPResult<ToolResult> {
        let span = info_span!("tool_call", tool = %name, call_id = %Uuid::new_v4());
        self.dispatch(name, arguments).instrument(span).await
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> MCPResult<ToolResult> {
        let client = self.client().await?;

        let tool = ToolName::from_name(name).ok_or_else(|| MCPError::UnknownTool(name.to_string()))?;
        let invocation = ToolInvocation::parse(tool, arguments.unwrap_or(Value::Null))?;
        debug!("Dispatching {:?}", invocation.tool());

        match jira::execute(invocation, client.as_ref(), &self.config).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("{} failed: {}", name, e);
                let outcome = e.into_outcome();
                if let Ok(result) = &outcome {
                    debug!("Returning error result: {}", result.joined_text());
                }
                outcome
            }
        }
    }
}
