use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::mcp::errors::{MCPError, MCPResult};
use crate::mcp::tools::registry::{validate_arguments, ToolName};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateIssueArgs {
    pub project_key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
    pub story_points: Option<f64>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchIssuesArgs {
    pub jql: String,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetIssueArgs {
    pub issue_key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateIssueArgs {
    pub issue_key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub story_points: Option<f64>,
    pub parent: Option<String>,
    pub labels: Option<Vec<String>>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddCommentArgs {
    pub issue_key: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionIssueArgs {
    pub issue_key: String,
    pub transition_name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkIssuesArgs {
    pub inward_issue: String,
    pub outward_issue: String,
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetProjectsArgs {
    pub max_results: Option<u32>,
}

/// A validated tool call, one variant per catalogue entry
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    CreateIssue(CreateIssueArgs),
    SearchIssues(SearchIssuesArgs),
    GetIssue(GetIssueArgs),
    UpdateIssue(UpdateIssueArgs),
    AddComment(AddCommentArgs),
    TransitionIssue(TransitionIssueArgs),
    LinkIssues(LinkIssuesArgs),
    GetProjects(GetProjectsArgs),
}

impl ToolInvocation {
    /// Validate raw arguments against the tool's schema and decode them.
    /// Absent arguments are treated as an empty object.
    pub fn parse(tool: ToolName, arguments: Value) -> MCPResult<Self> {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        validate_arguments(tool, &arguments)?;

        Ok(match tool {
            ToolName::CreateIssue => Self::CreateIssue(decode(tool, arguments)?),
            ToolName::SearchIssues => Self::SearchIssues(decode(tool, arguments)?),
            ToolName::GetIssue => Self::GetIssue(decode(tool, arguments)?),
            ToolName::UpdateIssue => Self::UpdateIssue(decode(tool, arguments)?),
            ToolName::AddComment => Self::AddComment(decode(tool, arguments)?),
            ToolName::TransitionIssue => Self::TransitionIssue(decode(tool, arguments)?),
            ToolName::LinkIssues => Self::LinkIssues(decode(tool, arguments)?),
            ToolName::GetProjects => Self::GetProjects(decode(tool, arguments)?),
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::CreateIssue(_) => ToolName::CreateIssue,
            Self::SearchIssues(_) => ToolName::SearchIssues,
            Self::GetIssue(_) => ToolName::GetIssue,
            Self::UpdateIssue(_) => ToolName::UpdateIssue,
            Self::AddComment(_) => ToolName::AddComment,
            Self::TransitionIssue(_) => ToolName::TransitionIssue,
            Self::LinkIssues(_) => ToolName::LinkIssues,
            Self::GetProjects(_) => ToolName::GetProjects,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> MCPResult<T> {
    serde_json::from_value(arguments)
        .map_err(|e| MCPError::InvalidParams(format!("{}: {}", tool.as_str(), e)))
}
