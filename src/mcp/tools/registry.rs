use jsonschema::JSONSchema;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::mcp::errors::{MCPError, MCPResult};

/// The fixed set of tools, in listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateIssue,
    SearchIssues,
    GetIssue,
    UpdateIssue,
    AddComment,
    TransitionIssue,
    LinkIssues,
    GetProjects,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        Self::CreateIssue,
        Self::SearchIssues,
        Self::GetIssue,
        Self::UpdateIssue,
        Self::AddComment,
        Self::TransitionIssue,
        Self::LinkIssues,
        Self::GetProjects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIssue => "create_issue",
            Self::SearchIssues => "search_issues",
            Self::GetIssue => "get_issue",
            Self::UpdateIssue => "update_issue",
            Self::AddComment => "add_comment",
            Self::TransitionIssue => "transition_issue",
            Self::LinkIssues => "link_issues",
            Self::GetProjects => "get_projects",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateIssue => "Create a new Jira issue. Issue type defaults to Story.",
            Self::SearchIssues => "Search issues using JQL. Returns one page of results.",
            Self::GetIssue => "Get issue details: summary, type, status, priority and link",
            Self::UpdateIssue => "Update an issue. Only the fields you pass are changed.",
            Self::AddComment => "Add a comment to an issue",
            Self::TransitionIssue => {
                "Move an issue through its workflow by transition name (case-insensitive), optionally with a comment"
            }
            Self::LinkIssues => "Link two issues with a link type such as Blocks or Relates",
            Self::GetProjects => "List Jira projects visible to the configured account",
        }
    }

    /// JSON schema for the tool's arguments
    pub fn input_schema(&self) -> Value {
        match self {
            Self::CreateIssue => json!({
                "type": "object",
                "properties": {
                    "projectKey": { "type": "string", "description": "Project key, e.g. ABC" },
                    "summary": { "type": "string", "description": "Issue title" },
                    "description": { "type": "string", "description": "Plain-text description" },
                    "issueType": { "type": "string", "description": "Issue type name (default: Story)" },
                    "priority": { "type": "string", "description": "Priority name, e.g. High" },
                    "labels": { "type": "array", "items": { "type": "string" } },
                    "storyPoints": { "type": "number", "description": "Story point estimate" },
                    "assignee": { "type": "string", "description": "Assignee account id" }
                },
                "required": ["projectKey", "summary"],
                "additionalProperties": false
            }),
            Self::SearchIssues => json!({
                "type": "object",
                "properties": {
                    "jql": { "type": "string", "description": "JQL query" },
                    "maxResults": { "type": "integer", "minimum": 1, "description": "Page size (default: 50)" }
                },
                "required": ["jql"],
                "additionalProperties": false
            }),
            Self::GetIssue => json!({
                "type": "object",
                "properties": {
                    "issueKey": { "type": "string", "description": "Issue key, e.g. ABC-123" }
                },
                "required": ["issueKey"],
                "additionalProperties": false
            }),
            Self::UpdateIssue => json!({
                "type": "object",
                "properties": {
                    "issueKey": { "type": "string", "description": "Issue key, e.g. ABC-123" },
                    "summary": { "type": "string" },
                    "description": { "type": "string", "description": "Plain-text description" },
                    "priority": { "type": "string", "description": "Priority name, e.g. High" },
                    "storyPoints": { "type": "number" },
                    "parent": { "type": "string", "description": "Parent issue key" },
                    "labels": { "type": "array", "items": { "type": "string" }, "description": "Replaces the label set" },
                    "assignee": { "type": "string", "description": "Assignee account id" }
                },
                "required": ["issueKey"],
                "additionalProperties": false
            }),
            Self::AddComment => json!({
                "type": "object",
                "properties": {
                    "issueKey": { "type": "string", "description": "Issue key, e.g. ABC-123" },
                    "comment": { "type": "string", "description": "Plain-text comment body" }
                },
                "required": ["issueKey", "comment"],
                "additionalProperties": false
            }),
            Self::TransitionIssue => json!({
                "type": "object",
                "properties": {
                    "issueKey": { "type": "string", "description": "Issue key, e.g. ABC-123" },
                    "transitionName": { "type": "string", "description": "Transition name, e.g. In Progress" },
                    "comment": { "type": "string", "description": "Comment to add with the transition" }
                },
                "required": ["issueKey", "transitionName"],
                "additionalProperties": false
            }),
            Self::LinkIssues => json!({
                "type": "object",
                "properties": {
                    "inwardIssue": { "type": "string", "description": "Inward issue key" },
                    "outwardIssue": { "type": "string", "description": "Outward issue key" },
                    "linkType": { "type": "string", "description": "Link type name, e.g. Blocks" }
                },
                "required": ["inwardIssue", "outwardIssue", "linkType"],
                "additionalProperties": false
            }),
            Self::GetProjects => json!({
                "type": "object",
                "properties": {
                    "maxResults": { "type": "integer", "minimum": 1, "description": "Page size (default: 50)" }
                },
                "additionalProperties": false
            }),
        }
    }
}

/// Tool information for MCP client discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

struct CatalogueEntry {
    tool: ToolName,
    info: ToolInfo,
    validator: Result<JSONSchema, String>,
}

lazy_static! {
    static ref CATALOGUE: Vec<CatalogueEntry> = ToolName::ALL
        .into_iter()
        .map(|tool| {
            let schema = tool.input_schema();
            let validator = JSONSchema::compile(&schema).map_err(|e| e.to_string());
            if let Err(e) = &validator {
                error!("Schema for {} does not compile: {}", tool.as_str(), e);
            }
            CatalogueEntry {
                tool,
                info: ToolInfo {
                    name: tool.as_str().to_string(),
                    description: tool.description().to_string(),
                    input_schema: schema,
                },
                validator,
            }
        })
        .collect();
}

/// The catalogue in listing order
pub fn list_tools() -> Vec<ToolInfo> {
    CATALOGUE.iter().map(|entry| entry.info.clone()).collect()
}

/// Check arguments against the tool's declared schema
pub fn validate_arguments(tool: ToolName, arguments: &Value) -> MCPResult<()> {
    let entry = CATALOGUE
        .iter()
        .find(|entry| entry.tool == tool)
        .ok_or_else(|| MCPError::UnknownTool(tool.as_str().to_string()))?;

    let validator = entry.validator.as_ref().map_err(|e| {
        MCPError::Internal(format!("schema for {} is invalid: {}", tool.as_str(), e))
    })?;

    if let Err(errors) = validator.validate(arguments) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(MCPError::InvalidParams(format!(
            "{}: {}",
            tool.as_str(),
            messages.join("; ")
        )));
    }

    Ok(())
}
