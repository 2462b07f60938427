//! Finding the repositories worth summarizing.
//!
//! Candidates come from each team's explicit repository names and from a
//! paginated name search per prefix. Every candidate is then checked for
//! closed pull requests whose merge (or close) time falls in the window.
//! Host failures never abort discovery: a failed search matches nothing and
//! a failed check counts as no activity.

use chrono::{DateTime, Utc};
use prdigest_config::{PacingConfig, TeamConfig};
use prdigest_core::summary::{RepoActivity, TimeWindow};
use prdigest_core::tool::ToolHost;
use prdigest_toolhost::catalog::{LIST_PULL_REQUESTS, SEARCH_REPOSITORIES};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const PAGE_SIZE: usize = 100;

/// Search results past this many pages are not reachable on GitHub anyway.
const MAX_SEARCH_PAGES: u32 = 10;

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Pause between paginated requests and between repository checks
    pub request_delay: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(500),
        }
    }
}

impl From<&PacingConfig> for DiscoveryOptions {
    fn from(pacing: &PacingConfig) -> Self {
        Self {
            request_delay: Duration::from_millis(pacing.request_delay_ms),
        }
    }
}

/// A repository to check, in the order it was first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub owner: String,
    pub repo: String,
}

pub struct RepoDiscovery<'a> {
    host: &'a dyn ToolHost,
    organization: String,
    options: DiscoveryOptions,
}

impl<'a> RepoDiscovery<'a> {
    pub fn new(host: &'a dyn ToolHost, organization: impl Into<String>) -> Self {
        Self {
            host,
            organization: organization.into(),
            options: DiscoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    /// Repositories with at least one qualifying pull request in `window`.
    pub async fn discover(&self, teams: &[TeamConfig], window: &TimeWindow) -> Vec<RepoActivity> {
        let candidates = self.candidates(teams).await;
        info!(
            organization = %self.organization,
            candidates = candidates.len(),
            %window,
            "Checking repositories for activity"
        );

        let mut active = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            let pr_count = self
                .count_activity(&candidate.owner, &candidate.repo, window)
                .await;
            if pr_count > 0 {
                debug!(repo = %format!("{}/{}", candidate.owner, candidate.repo), pr_count, "Active");
                active.push(RepoActivity {
                    owner: candidate.owner.clone(),
                    repo: candidate.repo.clone(),
                    pr_count,
                });
            }
        }

        info!(active = active.len(), "Discovery finished");
        active
    }

    /// Explicit names and prefix matches of every team, deduplicated.
    pub async fn candidates(&self, teams: &[TeamConfig]) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |owner: &str, repo: &str| {
            let key = (owner.to_ascii_lowercase(), repo.to_ascii_lowercase());
            if seen.insert(key) {
                out.push(Candidate {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                });
            }
        };

        for team in teams {
            for name in &team.repos {
                match name.split_once('/') {
                    Some((owner, repo)) => push(owner, repo),
                    None => push(&self.organization, name),
                }
            }
            for prefix in &team.prefixes {
                for repo in self.search_prefix(prefix).await {
                    push(&self.organization, &repo);
                }
            }
        }
        out
    }

    /// Repository names in the organization that start with `prefix`.
    pub async fn search_prefix(&self, prefix: &str) -> Vec<String> {
        let query = format!("{prefix} org:{} in:name", self.organization);
        let wanted = prefix.to_ascii_lowercase();
        let mut names = Vec::new();

        for page in 1..=MAX_SEARCH_PAGES {
            if page > 1 {
                self.pause().await;
            }
            let args = json!({"query": query, "per_page": PAGE_SIZE, "page": page});
            let Some(items) = self.fetch_items(SEARCH_REPOSITORIES, args).await else {
                break;
            };

            names.extend(
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .filter(|name| name.to_ascii_lowercase().starts_with(&wanted))
                    .map(String::from),
            );

            if items.len() < PAGE_SIZE {
                break;
            }
        }

        debug!(prefix, matches = names.len(), "Prefix search finished");
        names
    }

    /// Closed pull requests of `owner/repo` merged (or closed) inside `window`.
    pub async fn count_activity(&self, owner: &str, repo: &str, window: &TimeWindow) -> usize {
        let args = json!({
            "owner": owner,
            "repo": repo,
            "state": "closed",
            "sort": "updated",
            "direction": "desc",
            "per_page": PAGE_SIZE,
            "page": 1,
        });
        let Some(pulls) = self.fetch_items(LIST_PULL_REQUESTS, args).await else {
            return 0;
        };

        pulls
            .iter()
            .filter_map(activity_time)
            .filter(|at| window.contains(*at))
            .count()
    }

    /// Invoke a listing tool and pull out its items. `None` on any failure.
    async fn fetch_items(&self, tool: &str, args: Value) -> Option<Vec<Value>> {
        let result = self.host.invoke(tool, args).await;
        let text = result.joined_text();
        if result.is_error {
            warn!(tool, error = %text, "Host call failed during discovery");
            return None;
        }
        match parse_items(&text) {
            Some(items) => Some(items),
            None => {
                warn!(tool, "Unrecognized listing from host");
                None
            }
        }
    }

    async fn pause(&self) {
        if !self.options.request_delay.is_zero() {
            tokio::time::sleep(self.options.request_delay).await;
        }
    }
}

/// A listing is either a bare array or an object with an `items` array.
fn parse_items(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// `merged_at`, or `closed_at` for pull requests closed without merging.
fn activity_time(pull: &Value) -> Option<DateTime<Utc>> {
    ["merged_at", "closed_at"].iter().find_map(|key| {
        pull.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    })
}
