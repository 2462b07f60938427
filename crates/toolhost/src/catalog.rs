//! The abstract tool surface.
//!
//! These names and parameter schemas are what the reasoning service and the
//! discovery pass see. They never change with the host version; the
//! [`ToolMap`](crate::mapping::ToolMap) translates them to whatever the
//! connected host calls them.

use prdigest_core::provider::ToolDefinition;
use serde_json::json;

pub const SEARCH_REPOSITORIES: &str = "search_repositories";
pub const LIST_PULL_REQUESTS: &str = "list_pull_requests";
pub const GET_PULL_REQUEST: &str = "get_pull_request";
pub const GET_PULL_REQUEST_FILES: &str = "get_pull_request_files";
pub const GET_PULL_REQUEST_DIFF: &str = "get_pull_request_diff";

/// Every abstract tool the program may invoke.
pub const ALL_TOOLS: &[&str] = &[
    SEARCH_REPOSITORIES,
    LIST_PULL_REQUESTS,
    GET_PULL_REQUEST,
    GET_PULL_REQUEST_FILES,
    GET_PULL_REQUEST_DIFF,
];

fn repo_properties() -> serde_json::Map<String, serde_json::Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "owner".into(),
        json!({"type": "string", "description": "Repository owner (organization or user)"}),
    );
    props.insert(
        "repo".into(),
        json!({"type": "string", "description": "Repository name"}),
    );
    props
}

fn pull_request_schema(paged: bool) -> serde_json::Value {
    let mut props = repo_properties();
    props.insert(
        "pull_number".into(),
        json!({"type": "integer", "description": "Pull request number"}),
    );
    if paged {
        props.insert(
            "per_page".into(),
            json!({"type": "integer", "description": "Results per page (max 100)"}),
        );
        props.insert(
            "page".into(),
            json!({"type": "integer", "description": "Page number, starting at 1"}),
        );
    }
    json!({
        "type": "object",
        "properties": props,
        "required": ["owner", "repo", "pull_number"]
    })
}

/// Tool declarations sent to the reasoning service with every request.
pub fn summarizer_tools() -> Vec<ToolDefinition> {
    let mut list_props = repo_properties();
    list_props.insert(
        "state".into(),
        json!({"type": "string", "enum": ["open", "closed", "all"], "description": "Filter by state"}),
    );
    list_props.insert(
        "sort".into(),
        json!({"type": "string", "enum": ["created", "updated", "popularity", "long-running"]}),
    );
    list_props.insert(
        "direction".into(),
        json!({"type": "string", "enum": ["asc", "desc"]}),
    );
    list_props.insert(
        "per_page".into(),
        json!({"type": "integer", "description": "Results per page (max 100)"}),
    );
    list_props.insert(
        "page".into(),
        json!({"type": "integer", "description": "Page number, starting at 1"}),
    );

    vec![
        ToolDefinition {
            name: LIST_PULL_REQUESTS.into(),
            description: "List pull requests in a repository, including merge and close timestamps."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": list_props,
                "required": ["owner", "repo"]
            }),
        },
        ToolDefinition {
            name: GET_PULL_REQUEST.into(),
            description: "Get the details of one pull request: title, body, author, labels, merge state."
                .into(),
            parameters: pull_request_schema(false),
        },
        ToolDefinition {
            name: GET_PULL_REQUEST_FILES.into(),
            description: "List the files changed by a pull request with addition and deletion counts."
                .into(),
            parameters: pull_request_schema(true),
        },
        ToolDefinition {
            name: GET_PULL_REQUEST_DIFF.into(),
            description: "Get the unified diff of a pull request. Large diffs are truncated.".into(),
            parameters: pull_request_schema(false),
        },
    ]
}
