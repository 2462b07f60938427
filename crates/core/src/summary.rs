//! Repository activity and summary records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The reporting window. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_date(), self.end_date())
    }
}

/// A repository with qualifying pull-request activity in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoActivity {
    pub owner: String,
    pub repo: String,
    pub pr_count: usize,
}

impl RepoActivity {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// One merged pull request as described by the reasoning service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub merged_date: String,
    pub url: String,
    pub summary: String,
}

/// A change flagged as breaking for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreakingChange {
    pub pr_number: u64,
    pub description: String,
}

/// The per-repository artifact produced at the end of an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub repo_name: String,
    pub owner: String,
    pub overall_summary: String,
    pub pull_requests: Vec<PullRequestSummary>,
    pub breaking_changes: Vec<BreakingChange>,
}

impl RepoSummary {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 8, 0, 0, 0).unwrap();
        let window = TimeWindow::new(start, end);

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + Duration::seconds(1)));
        assert_eq!(window.to_string(), "2026-10-01 to 2026-10-08");
    }

    #[test]
    fn last_days_ends_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let window = TimeWindow::last_days(7, now);
        assert_eq!(window.end, now);
        assert_eq!(window.start_date(), "2026-10-12");
    }

    #[test]
    fn summary_uses_camel_case_on_the_wire() {
        let summary = RepoSummary {
            repo_name: "api".into(),
            owner: "acme".into(),
            overall_summary: "quiet week".into(),
            pull_requests: vec![PullRequestSummary {
                number: 3,
                merged_date: "2026-10-18".into(),
                ..Default::default()
            }],
            breaking_changes: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["overallSummary"], "quiet week");
        assert_eq!(json["pullRequests"][0]["mergedDate"], "2026-10-18");
        assert_eq!(summary.full_name(), "acme/api");
    }
}
