//! Turning the model's final message into a [`RepoSummary`].
//!
//! Models wrap JSON in prose or code fences more often than not, so we scan
//! for the first balanced `{...}` that parses, then decode it leniently.
//! Anything that does not fit yields a degraded summary carrying the raw text.
//! This never fails.

use prdigest_core::summary::{BreakingChange, PullRequestSummary, RepoSummary};
use serde::Deserialize;
use serde_json::Value;

pub const NO_SUMMARY_PROVIDED: &str = "No summary provided.";
pub const NO_SUMMARY_AVAILABLE: &str = "No summary available.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryPayload {
    #[serde(default = "default_overall")]
    overall_summary: String,
    #[serde(default)]
    pull_requests: Vec<PullRequestSummary>,
    #[serde(default)]
    breaking_changes: Vec<BreakingChange>,
}

fn default_overall() -> String {
    NO_SUMMARY_PROVIDED.into()
}

/// Build a summary for `owner/repo` from the model's final text.
pub fn extract_summary(owner: &str, repo: &str, text: &str) -> RepoSummary {
    let decoded = first_json_object(text)
        .and_then(|value| serde_json::from_value::<SummaryPayload>(value).ok());

    match decoded {
        Some(payload) => RepoSummary {
            repo_name: repo.to_string(),
            owner: owner.to_string(),
            overall_summary: payload.overall_summary,
            pull_requests: payload.pull_requests,
            breaking_changes: payload.breaking_changes,
        },
        None => degraded(owner, repo, text),
    }
}

fn degraded(owner: &str, repo: &str, text: &str) -> RepoSummary {
    let trimmed = text.trim();
    RepoSummary {
        repo_name: repo.to_string(),
        owner: owner.to_string(),
        overall_summary: if trimmed.is_empty() {
            NO_SUMMARY_AVAILABLE.into()
        } else {
            trimmed.to_string()
        },
        pull_requests: Vec::new(),
        breaking_changes: Vec::new(),
    }
}

/// The first balanced `{...}` span in `text` that is a valid JSON object.
///
/// Braces inside string literals are ignored. Candidates that fail to parse
/// are skipped and the scan resumes at the next `{`.
pub fn first_json_object(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| {
            let end = matching_brace(&text[start..])?;
            match serde_json::from_str::<Value>(&text[start..start + end]) {
                Ok(value @ Value::Object(_)) => Some(value),
                _ => None,
            }
        })
}

/// Byte length of the brace-balanced prefix of `s`, which must start with `{`.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
