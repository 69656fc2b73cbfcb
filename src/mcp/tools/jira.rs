/// Jira operation handlers
///
/// Each handler turns one validated invocation into a single REST call (plus
/// the transition lookup read for `transition_issue`) and renders the response
/// as text for the agent.
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::jira::{adf_document, browse_url, JiraApi, JiraRequest};
use crate::mcp::tools::invocation::{
    AddCommentArgs, CreateIssueArgs, GetIssueArgs, GetProjectsArgs, LinkIssuesArgs,
    SearchIssuesArgs, TransitionIssueArgs, UpdateIssueArgs,
};
use crate::mcp::tools::{ToolError, ToolInvocation, ToolResult};

pub const DEFAULT_ISSUE_TYPE: &str = "Story";

/// Fields requested from the search endpoint
const SEARCH_FIELDS: [&str; 4] = ["summary", "status", "priority", "assignee"];

/// Route an invocation to its handler
pub async fn execute(
    invocation: ToolInvocation,
    jira: &dyn JiraApi,
    config: &ServerConfig,
) -> Result<ToolResult, ToolError> {
    match invocation {
        ToolInvocation::CreateIssue(args) => create_issue(args, jira, config).await,
        ToolInvocation::SearchIssues(args) => search_issues(args, jira, config).await,
        ToolInvocation::GetIssue(args) => get_issue(args, jira).await,
        ToolInvocation::UpdateIssue(args) => update_issue(args, jira, config).await,
        ToolInvocation::AddComment(args) => add_comment(args, jira).await,
        ToolInvocation::TransitionIssue(args) => transition_issue(args, jira).await,
        ToolInvocation::LinkIssues(args) => link_issues(args, jira).await,
        ToolInvocation::GetProjects(args) => get_projects(args, jira, config).await,
    }
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    issues: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    key: String,
    #[serde(default)]
    fields: Option<SearchHitFields>,
}

#[derive(Debug, Deserialize)]
struct SearchHitFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct IssueDetail {
    key: String,
    fields: IssueDetailFields,
}

#[derive(Debug, Deserialize)]
struct IssueDetailFields {
    summary: String,
    issuetype: Named,
    status: Named,
    #[serde(default)]
    priority: Option<Named>,
}

/// A transition the issue can currently take
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionCandidate {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionCandidate>,
}

#[derive(Debug, Deserialize)]
struct ProjectPage {
    #[serde(default)]
    values: Vec<ProjectSummary>,
}

#[derive(Debug, Deserialize)]
struct ProjectSummary {
    key: String,
    name: String,
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ToolError> {
    serde_json::from_value(value)
        .map_err(|e| ToolError::UnexpectedResponse(format!("{}: {}", what, e)))
}

/// Empty strings count as "not supplied"
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Fields shared by create and update; only supplied values are written
fn apply_common_fields(
    fields: &mut Map<String, Value>,
    description: &Option<String>,
    priority: &Option<String>,
    labels: &Option<Vec<String>>,
    story_points: Option<f64>,
    assignee: &Option<String>,
    config: &ServerConfig,
) {
    if let Some(description) = non_empty(description) {
        fields.insert("description".to_string(), adf_document(description));
    }
    if let Some(priority) = non_empty(priority) {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }
    if let Some(labels) = labels {
        fields.insert("labels".to_string(), json!(labels));
    }
    if let Some(points) = story_points {
        fields.insert(config.story_points_field.clone(), json!(points));
    }
    if let Some(assignee) = non_empty(assignee) {
        fields.insert("assignee".to_string(), json!({ "accountId": assignee }));
    }
}

async fn create_issue(
    args: CreateIssueArgs,
    jira: &dyn JiraApi,
    config: &ServerConfig,
) -> Result<ToolResult, ToolError> {
    let issue_type = non_empty(&args.issue_type).unwrap_or(DEFAULT_ISSUE_TYPE);

    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": args.project_key }));
    fields.insert("summary".to_string(), json!(args.summary));
    fields.insert("issuetype".to_string(), json!({ "name": issue_type }));
    apply_common_fields(
        &mut fields,
        &args.description,
        &args.priority,
        &args.labels,
        args.story_points,
        &args.assignee,
        config,
    );

    let response = jira
        .send(JiraRequest::post("/issue", json!({ "fields": fields })))
        .await?;
    let created: CreatedIssue = decode(response, "create issue response")?;

    info!("Created {} ({}) in {}", created.key, issue_type, args.project_key);
    Ok(ToolResult::text(format!(
        "✅ Created {}\nURL: {}",
        created.key,
        browse_url(jira.site_url(), &created.key)
    )))
}

async fn search_issues(
    args: SearchIssuesArgs,
    jira: &dyn JiraApi,
    config: &ServerConfig,
) -> Result<ToolResult, ToolError> {
    let max_results = args.max_results.unwrap_or(config.default_page_size);
    let body = json!({
        "jql": args.jql,
        "maxResults": max_results,
        "fields": SEARCH_FIELDS,
    });

    let response = jira.send(JiraRequest::post("/search/jql", body)).await?;
    let page: SearchResponse = decode(response, "search response")?;

    // The /search/jql endpoint does not always report a total
    let total = page.total.unwrap_or(page.issues.len() as u64);
    debug!("Search matched {} issues", total);

    let lines: Vec<String> = page
        .issues
        .iter()
        .map(|hit| {
            let summary = hit
                .fields
                .as_ref()
                .and_then(|f| f.summary.as_deref())
                .unwrap_or("");
            let status = hit
                .fields
                .as_ref()
                .and_then(|f| f.status.as_ref())
                .map(|s| s.name.as_str())
                .unwrap_or("Unknown");
            format!("{}: {} ({})", hit.key, summary, status)
        })
        .collect();

    let list = if lines.is_empty() {
        "No issues found".to_string()
    } else {
        lines.join("\n")
    };

    Ok(ToolResult::text(format!("Found {} issues:\n{}", total, list)))
}

async fn get_issue(args: GetIssueArgs, jira: &dyn JiraApi) -> Result<ToolResult, ToolError> {
    let response = jira
        .send(JiraRequest::get(format!("/issue/{}", args.issue_key)))
        .await?;
    let issue: IssueDetail = decode(response, "issue response")?;

    let priority = issue
        .fields
        .priority
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("None");

    Ok(ToolResult::text(format!(
        "📋 {}: {}\nType: {}\nStatus: {}\nPriority: {}\nURL: {}",
        issue.key,
        issue.fields.summary,
        issue.fields.issuetype.name,
        issue.fields.status.name,
        priority,
        browse_url(jira.site_url(), &issue.key)
    )))
}

async fn update_issue(
    args: UpdateIssueArgs,
    jira: &dyn JiraApi,
    config: &ServerConfig,
) -> Result<ToolResult, ToolError> {
    let mut fields = Map::new();
    if let Some(summary) = non_empty(&args.summary) {
        fields.insert("summary".to_string(), json!(summary));
    }
    apply_common_fields(
        &mut fields,
        &args.description,
        &args.priority,
        &args.labels,
        args.story_points,
        &args.assignee,
        config,
    );
    if let Some(parent) = non_empty(&args.parent) {
        fields.insert("parent".to_string(), json!({ "key": parent }));
    }

    debug!(
        "Updating {} fields on {}",
        fields.keys().cloned().collect::<Vec<_>>().join(","),
        args.issue_key
    );
    jira.send(JiraRequest::put(
        format!("/issue/{}", args.issue_key),
        json!({ "fields": fields }),
    ))
    .await?;

    Ok(ToolResult::text(format!("✅ Updated {}", args.issue_key)))
}

async fn add_comment(args: AddCommentArgs, jira: &dyn JiraApi) -> Result<ToolResult, ToolError> {
    jira.send(JiraRequest::post(
        format!("/issue/{}/comment", args.issue_key),
        json!({ "body": adf_document(&args.comment) }),
    ))
    .await?;

    Ok(ToolResult::text(format!("✅ Comment added to {}", args.issue_key)))
}

/// Case-insensitive lookup of a transition by name
pub fn find_transition<'a>(
    candidates: &'a [TransitionCandidate],
    name: &str,
) -> Option<&'a TransitionCandidate> {
    let wanted = name.to_lowercase();
    candidates
        .iter()
        .find(|candidate| candidate.name.to_lowercase() == wanted)
}

async fn transition_issue(
    args: TransitionIssueArgs,
    jira: &dyn JiraApi,
) -> Result<ToolResult, ToolError> {
    let path = format!("/issue/{}/transitions", args.issue_key);

    let response = jira.send(JiraRequest::get(path.clone())).await?;
    let available: TransitionsResponse = decode(response, "transitions response")?;

    let Some(transition) = find_transition(&available.transitions, &args.transition_name) else {
        let names: Vec<&str> = available
            .transitions
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        info!(
            "No transition '{}' on {}; available: {:?}",
            args.transition_name, args.issue_key, names
        );
        return Ok(ToolResult::error(format!(
            "❌ Transition not found. Available: {}",
            names.join(", ")
        )));
    };

    let mut body = json!({ "transition": { "id": transition.id } });
    if let Some(comment) = non_empty(&args.comment) {
        body["update"] = json!({ "comment": [{ "add": { "body": adf_document(comment) } }] });
    }

    jira.send(JiraRequest::post(path, body)).await?;

    info!("Transitioned {} via {}", args.issue_key, transition.name);
    Ok(ToolResult::text(format!("✅ {} → {}", args.issue_key, transition.name)))
}

async fn link_issues(args: LinkIssuesArgs, jira: &dyn JiraApi) -> Result<ToolResult, ToolError> {
    let body = json!({
        "type": { "name": args.link_type },
        "inwardIssue": { "key": args.inward_issue },
        "outwardIssue": { "key": args.outward_issue },
    });
    jira.send(JiraRequest::post("/issueLink", body)).await?;

    Ok(ToolResult::text(format!(
        "✅ Linked {} {} {}",
        args.outward_issue, args.link_type, args.inward_issue
    )))
}

async fn get_projects(
    args: GetProjectsArgs,
    jira: &dyn JiraApi,
    config: &ServerConfig,
) -> Result<ToolResult, ToolError> {
    let max_results = args.max_results.unwrap_or(config.default_page_size);
    let response = jira
        .send(JiraRequest::get("/project/search").with_query("maxResults", max_results))
        .await?;
    let page: ProjectPage = decode(response, "project search response")?;

    let list = if page.values.is_empty() {
        "No projects found".to_string()
    } else {
        page.values
            .iter()
            .map(|p| format!("{}: {}", p.key, p.name))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(ToolResult::text(format!("Projects:\n{}", list)))
}
