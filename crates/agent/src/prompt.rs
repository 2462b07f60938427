//! Prompts for the per-repository summary conversation.

use prdigest_core::summary::TimeWindow;

const SYSTEM_PROMPT: &str = r#"You are a release-notes assistant. You summarize merged pull request activity in one GitHub repository for engineering managers.

Use the tools to gather facts. Start with list_pull_requests (state "closed", sort "updated", direction "desc") and keep only pull requests merged inside the requested window. Fetch details, changed files or diffs only when the title and description are not enough to explain a change. Large outputs are truncated; do not request the same data twice.

When you are done, reply with a single JSON object and nothing else, in this shape:
{
  "overallSummary": "Two or three sentences on what changed and why it matters.",
  "pullRequests": [
    {
      "number": 123,
      "title": "PR title",
      "author": "github-login",
      "mergedDate": "YYYY-MM-DD",
      "url": "https://github.com/owner/repo/pull/123",
      "summary": "One or two sentences."
    }
  ],
  "breakingChanges": [
    { "prNumber": 123, "description": "What breaks and who must act." }
  ]
}
Use an empty array when there are no breaking changes."#;

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// The opening request for one repository.
pub fn repo_request(owner: &str, repo: &str, window: &TimeWindow) -> String {
    format!(
        "Summarize the pull requests merged in {owner}/{repo} between {} and {} (inclusive, UTC). \
         Use owner \"{owner}\" and repo \"{repo}\" in tool calls.",
        window.start_date(),
        window.end_date(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn request_names_repo_and_window() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap(),
        );
        let text = repo_request("acme", "api", &window);
        assert!(text.contains("acme/api"));
        assert!(text.contains("2024-05-01"));
        assert!(text.contains("2024-05-08"));
    }

    #[test]
    fn system_prompt_describes_the_payload() {
        for key in ["overallSummary", "pullRequests", "breakingChanges", "mergedDate", "prNumber"] {
            assert!(system_prompt().contains(key), "{key}");
        }
    }
}
