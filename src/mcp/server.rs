/// MCP server - reads JSON-RPC requests from a transport and answers them
///
/// Requests are handled one at a time in arrival order. Every request gets
/// exactly one response; notifications and stray responses get none.
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::mcp::{
    context::ServerContext,
    errors::{JsonRpcError, MCPError, MCPResult, ProtocolError, TransportError},
    protocol::{
        negotiate_protocol_version, CallToolParams, InitializeParams, InitializeResult,
        MCPMessage, MCPRequest, ServerCapabilities, ServerInfo, ToolsCapability,
    },
    transport::MCPTransport,
    SERVER_NAME, SERVER_VERSION,
};

const INSTRUCTIONS: &str =
    "Jira tools for creating, searching, updating, commenting on, transitioning and linking issues.";

pub struct MCPServer {
    context: ServerContext,
}

impl MCPServer {
    pub fn new(context: ServerContext) -> Self {
        Self { context }
    }

    /// Serve until the peer closes the input stream
    pub async fn serve<T>(&self, transport: &mut T) -> MCPResult<()>
    where
        T: MCPTransport + ?Sized,
    {
        info!("{} v{} serving", SERVER_NAME, SERVER_VERSION);

        while transport.is_connected() {
            match transport.receive().await {
                Ok(message) => {
                    if let Some(response) = self.handle_message(message).await {
                        transport.send(response).await?;
                    }
                }
                Err(MCPError::Transport(TransportError::Closed)) => {
                    info!("Client closed the connection");
                    break;
                }
                Err(MCPError::Protocol(e)) => {
                    warn!("Rejected message: {}", e);
                    let response = MCPMessage::error_response(e.request_id(), JsonRpcError::from(e));
                    transport.send(response).await?;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    return Err(e);
                }
            }
        }

        transport.close().await
    }

    /// Handle a single inbound message, returning the response to send if any
    pub async fn handle_message(&self, message: MCPMessage) -> Option<MCPMessage> {
        if message.is_request() {
            match message.into_request() {
                Ok(request) => Some(self.handle_request(request).await),
                Err(e) => Some(MCPMessage::error_response(Value::Null, e.into())),
            }
        } else if message.is_notification() {
            if let Ok(notification) = message.into_notification() {
                debug!("Notification: {}", notification.method);
            }
            None
        } else {
            warn!("Ignoring unexpected response message");
            None
        }
    }

    async fn handle_request(&self, request: MCPRequest) -> MCPMessage {
        debug!("Request {}: {}", request.id, request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_tool_call(request.params).await,
            other => Err(MCPError::Protocol(ProtocolError::MethodNotFound(other.to_string()))),
        };

        match response {
            Ok(result) => MCPMessage::response(request.id, result),
            Err(error) => {
                warn!("Request {} ({}) failed: {}", request.id, request.method, error);
                MCPMessage::error_response(request.id, JsonRpcError::from(error))
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> MCPResult<Value> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| MCPError::InvalidParams(e.to_string()))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!("Client connected: {} {}", client.name, client.version);
        }

        let result = InitializeResult {
            protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                .to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> MCPResult<Value> {
        Ok(json!({ "tools": self.context.list_tools() }))
    }

    async fn handle_tool_call(&self, params: Option<Value>) -> MCPResult<Value> {
        let params = params.ok_or_else(|| MCPError::InvalidParams("Missing parameters".to_string()))?;
        let params: CallToolParams =
            serde_json::from_value(params).map_err(|e| MCPError::InvalidParams(e.to_string()))?;

        let result = self.context.call_tool(&params.name, params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::credentials::{CredentialField, CredentialResolver, StaticSource};
    use crate::jira::mock::{MockConnector, MockJira};
    use crate::jira::JiraApiError;
    use crate::mcp::transport::LineTransport;
    use tokio::io::{duplex, AsyncReadExt};

    const SITE: &str = "https://acme.atlassian.net";

    fn server(jira: MockJira, with_credentials: bool) -> MCPServer {
        let mut source = StaticSource::new("keychain");
        if with_credentials {
            source = source
                .with(CredentialField::Url, SITE)
                .with(CredentialField::Email, "dev@acme.io")
                .with(CredentialField::Token, "token123");
        }
        MCPServer::new(ServerContext::new(
            ServerConfig::default(),
            CredentialResolver::new(vec![Box::new(source)]),
            Box::new(MockConnector::new(jira)),
        ))
    }

    /// Feed newline-delimited input through `serve` and collect the responses
    async fn exchange(server: &MCPServer, input: &str) -> Vec<Value> {
        exchange_bytes(server, input.as_bytes()).await
    }

    async fn exchange_bytes(server: &MCPServer, input: &[u8]) -> Vec<Value> {
        let (mut client, output) = duplex(1 << 16);
        {
            let mut transport = LineTransport::new(input, output);
            server.serve(&mut transport).await.unwrap();
        }

        let mut written = String::new();
        client.read_to_string(&mut written).await.unwrap();
        written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn request(id: u64, method: &str, params: Value) -> String {
        format!(
            "{}\n",
            json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
        )
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let server = server(MockJira::new(SITE), false);
        let input = request(1, "initialize", json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "agent", "version": "1.0"}
        })) + &request(2, "initialize", json!({"protocolVersion": "1999-01-01"}));

        let responses = exchange(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(responses[0]["result"]["capabilities"]["tools"].is_object());
        assert_eq!(responses[1]["result"]["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server(MockJira::new(SITE), false);
        let input = "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n".to_string()
            + &request(7, "ping", json!({}));

        let responses = exchange(&server, &input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0], json!({"jsonrpc": "2.0", "id": 7, "result": {}}));
    }

    #[tokio::test]
    async fn test_list_tools_needs_no_credentials() {
        let jira = MockJira::new(SITE);
        let server = server(jira.clone(), false);

        let responses = exchange(&server, &request(1, "tools/list", json!({}))).await;
        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 8);
        assert_eq!(tools[0]["name"], "create_issue");
        assert!(tools[0]["inputSchema"].is_object());
        assert_eq!(jira.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tool_call_success() {
        let jira = MockJira::new(SITE).respond_ok(json!({"key": "ABC-12"}));
        let server = server(jira, true);

        let responses = exchange(
            &server,
            &request(3, "tools/call", json!({
                "name": "create_issue",
                "arguments": {"projectKey": "ABC", "summary": "Test"}
            })),
        )
        .await;

        assert_eq!(responses[0]["id"], 3);
        assert_eq!(responses[0]["result"]["isError"], false);
        assert_eq!(
            responses[0]["result"]["content"][0],
            json!({"type": "text", "text": "✅ Created ABC-12\nURL: https://acme.atlassian.net/browse/ABC-12"})
        );
    }

    #[tokio::test]
    async fn test_remote_failure_is_a_result_not_an_error() {
        let jira = MockJira::new(SITE).respond(Err(JiraApiError::Remote {
            status: 404,
            message: "Issue does not exist or you do not have permission to see it.".to_string(),
        }));
        let server = server(jira, true);

        let responses = exchange(
            &server,
            &request(4, "tools/call", json!({"name": "get_issue", "arguments": {"issueKey": "NOPE-1"}})),
        )
        .await;

        assert!(responses[0].get("error").is_none());
        assert_eq!(responses[0]["result"]["isError"], true);
        assert_eq!(
            responses[0]["result"]["content"][0]["text"],
            "Jira API error: Issue does not exist or you do not have permission to see it."
        );
    }

    #[tokio::test]
    async fn test_fatal_errors_map_to_json_rpc_codes() {
        let server = server(MockJira::new(SITE), true);
        let input = request(1, "tools/call", json!({"name": "delete_issue", "arguments": {}}))
            + &request(2, "tools/call", json!({"name": "get_issue", "arguments": {}}))
            + &request(3, "tools/call", json!({}))
            + &request(4, "resources/list", json!({}));

        let responses = exchange(&server, &input).await;
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["error"]["code"], -32601);
        assert_eq!(responses[0]["error"]["message"], "Unknown tool: delete_issue");
        assert_eq!(responses[1]["error"]["code"], -32602);
        assert_eq!(responses[2]["error"]["code"], -32602);
        assert_eq!(responses[3]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_fatal() {
        let jira = MockJira::new(SITE);
        let server = server(jira.clone(), false);

        let responses = exchange(
            &server,
            &request(9, "tools/call", json!({"name": "get_projects", "arguments": {}})),
        )
        .await;

        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["error"]["code"], -32603);
        let message = responses[0]["error"]["message"].as_str().unwrap();
        assert!(message.contains("npx @akurait/jira-mcp-skill"));
        assert_eq!(jira.call_count(), 0);
    }

    #[tokio::test]
    async fn test_parse_error_does_not_stop_the_loop() {
        let server = server(MockJira::new(SITE), false);
        let input = "{not json\n".to_string() + &request(2, "ping", json!({}));

        let responses = exchange(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_the_loop() {
        let server = server(MockJira::new(SITE), false);
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\xc3\"}\n".to_vec();
        input.extend_from_slice(request(2, "ping", json!({})).as_bytes());

        let responses = exchange_bytes(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1], json!({"jsonrpc": "2.0", "id": 2, "result": {}}));
    }

    #[tokio::test]
    async fn test_invalid_request_is_answered_with_its_id() {
        let server = server(MockJira::new(SITE), false);
        let input = "{\"jsonrpc\":\"1.0\",\"id\":5,\"method\":\"ping\"}\n".to_string()
            + &request(6, "ping", json!({}));

        let responses = exchange(&server, &input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 5);
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[1]["id"], 6);
    }
}
