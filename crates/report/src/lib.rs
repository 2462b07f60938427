//! Grouping summaries by team and rendering the digest.

use prdigest_config::TeamConfig;
use prdigest_core::summary::{PullRequestSummary, RepoSummary, TimeWindow};
use std::fmt::Write;

/// Team name for repositories no configured team claims.
pub const OTHER_TEAM: &str = "Other";

#[derive(Debug, Clone, PartialEq)]
pub struct TeamGroup {
    pub name: String,
    pub summaries: Vec<RepoSummary>,
}

/// Assign each summary to the first team that owns its repository, or to
/// [`OTHER_TEAM`].
///
/// Groups follow config order with `Other` last; empty groups are dropped and
/// repositories inside a group are sorted by name.
pub fn group_by_team(
    summaries: Vec<RepoSummary>,
    teams: &[TeamConfig],
    organization: &str,
) -> Vec<TeamGroup> {
    let mut groups: Vec<TeamGroup> = teams
        .iter()
        .map(|t| TeamGroup {
            name: t.name.clone(),
            summaries: Vec::new(),
        })
        .collect();
    let mut other = Vec::new();

    for summary in summaries {
        let owner = teams
            .iter()
            .position(|t| t.owns(organization, &summary.owner, &summary.repo_name));
        match owner {
            Some(idx) => groups[idx].summaries.push(summary),
            None => other.push(summary),
        }
    }

    if !other.is_empty() {
        groups.push(TeamGroup {
            name: OTHER_TEAM.into(),
            summaries: other,
        });
    }

    groups.retain(|g| !g.summaries.is_empty());
    for group in &mut groups {
        group.summaries.sort_by(|a, b| {
            a.repo_name
                .to_ascii_lowercase()
                .cmp(&b.repo_name.to_ascii_lowercase())
                .then_with(|| a.owner.cmp(&b.owner))
        });
    }
    groups
}

/// Render the digest as Markdown.
pub fn render_markdown(groups: &[TeamGroup], window: &TimeWindow, organization: &str) -> String {
    let repos: usize = groups.iter().map(|g| g.summaries.len()).sum();
    let pulls: usize = groups
        .iter()
        .flat_map(|g| &g.summaries)
        .map(|s| s.pull_requests.len())
        .sum();
    let breaking: usize = groups
        .iter()
        .flat_map(|g| &g.summaries)
        .map(|s| s.breaking_changes.len())
        .sum();

    let mut out = String::new();
    let _ = writeln!(out, "# Pull Request Digest: {organization}");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Window:** {window}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{repos} {}, {pulls} merged pull {}, {breaking} breaking {}.",
        plural(repos, "repository", "repositories"),
        plural(pulls, "request", "requests"),
        plural(breaking, "change", "changes"),
    );

    for group in groups {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", group.name);
        for summary in &group.summaries {
            render_repo(&mut out, summary);
        }
    }
    out
}

/// Append a section listing repositories that could not be summarized.
pub fn render_skipped(out: &mut String, skipped: &[(String, String)]) {
    if skipped.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Not summarized");
    let _ = writeln!(out);
    for (repo, reason) in skipped {
        let _ = writeln!(out, "- `{repo}`: {reason}");
    }
}

fn render_repo(out: &mut String, summary: &RepoSummary) {
    let full_name = summary.full_name();
    let _ = writeln!(out);
    let _ = writeln!(out, "### [{full_name}](https://github.com/{full_name})");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", summary.overall_summary.trim());

    if !summary.breaking_changes.is_empty() {
        let _ = writeln!(out);
        for change in &summary.breaking_changes {
            let _ = writeln!(
                out,
                "> **Breaking (#{}):** {}",
                change.pr_number,
                change.description.trim()
            );
        }
    }

    if !summary.pull_requests.is_empty() {
        let _ = writeln!(out);
        for pr in &summary.pull_requests {
            let _ = writeln!(out, "{}", pull_request_line(pr));
        }
    }
}

fn pull_request_line(pr: &PullRequestSummary) -> String {
    let label = format!("#{} {}", pr.number, pr.title.trim());
    let mut line = if pr.url.is_empty() {
        format!("- {label}")
    } else {
        format!("- [{label}]({})", pr.url)
    };
    if !pr.author.is_empty() {
        let _ = write!(line, " by @{}", pr.author.trim_start_matches('@'));
    }
    if !pr.merged_date.is_empty() {
        let _ = write!(line, ", merged {}", pr.merged_date);
    }
    if !pr.summary.trim().is_empty() {
        let _ = write!(line, ": {}", pr.summary.trim());
    }
    line
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prdigest_core::summary::BreakingChange;

    fn summary(repo: &str) -> RepoSummary {
        RepoSummary {
            repo_name: repo.into(),
            owner: "acme".into(),
            overall_summary: format!("Work on {repo}."),
            pull_requests: vec![],
            breaking_changes: vec![],
        }
    }

    fn teams() -> Vec<TeamConfig> {
        vec![
            TeamConfig {
                name: "Payments".into(),
                repos: vec!["ledger".into()],
                prefixes: vec!["pay-".into()],
            },
            TeamConfig {
                name: "Platform".into(),
                repos: vec!["pay-gateway".into(), "infra".into()],
                prefixes: vec![],
            },
            TeamConfig {
                name: "Docs".into(),
                repos: vec!["handbook".into()],
                prefixes: vec![],
            },
        ]
    }

    #[test]
    fn first_owning_team_wins_and_unknown_go_to_other() {
        let groups = group_by_team(
            vec![
                summary("pay-gateway"),
                summary("infra"),
                summary("ledger"),
                summary("random-tool"),
                summary("pay-api"),
            ],
            &teams(),
            "acme",
        );

        let shape: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.name.as_str(),
                    g.summaries.iter().map(|s| s.repo_name.as_str()).collect(),
                )
            })
            .collect();

        assert_eq!(
            shape,
            vec![
                ("Payments", vec!["ledger", "pay-api", "pay-gateway"]),
                ("Platform", vec!["infra"]),
                ("Other", vec!["random-tool"]),
            ]
        );
    }

    #[test]
    fn repositories_outside_the_organization_group_by_owner() {
        let teams = vec![
            TeamConfig {
                name: "Core".into(),
                repos: vec!["api".into()],
                prefixes: vec![],
            },
            TeamConfig {
                name: "Partners".into(),
                repos: vec!["partner-org/api".into()],
                prefixes: vec![],
            },
        ];
        let mut partner = summary("api");
        partner.owner = "partner-org".into();

        let groups = group_by_team(vec![partner, summary("api")], &teams, "acme");

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Core");
        assert_eq!(groups[0].summaries[0].owner, "acme");
        assert_eq!(groups[1].name, "Partners");
        assert_eq!(groups[1].summaries[0].owner, "partner-org");
    }

    #[test]
    fn no_summaries_no_groups() {
        assert!(group_by_team(vec![], &teams(), "acme").is_empty());
    }

    #[test]
    fn markdown_has_sections_links_and_callouts() {
        let mut s = summary("ledger");
        s.pull_requests.push(PullRequestSummary {
            number: 42,
            title: "Drop v1 endpoints".into(),
            author: "octocat".into(),
            merged_date: "2024-05-03".into(),
            url: "https://github.com/acme/ledger/pull/42".into(),
            summary: "Removes the deprecated API.".into(),
        });
        s.breaking_changes.push(BreakingChange {
            pr_number: 42,
            description: "v1 clients must migrate".into(),
        });
        let groups = group_by_team(vec![s], &teams(), "acme");
        let window = TimeWindow::new(
            "2024-05-01T00:00:00Z".parse().unwrap(),
            "2024-05-08T00:00:00Z".parse().unwrap(),
        );

        let md = render_markdown(&groups, &window, "acme");

        assert!(md.starts_with("# Pull Request Digest: acme\n"));
        assert!(md.contains("**Window:** 2024-05-01 to 2024-05-08"));
        assert!(md.contains("1 repository, 1 merged pull request, 1 breaking change."));
        assert!(md.contains("## Payments"));
        assert!(!md.contains("## Platform"));
        assert!(md.contains("### [acme/ledger](https://github.com/acme/ledger)"));
        assert!(md.contains("> **Breaking (#42):** v1 clients must migrate"));
        assert!(md.contains(
            "- [#42 Drop v1 endpoints](https://github.com/acme/ledger/pull/42) by @octocat, merged 2024-05-03: Removes the deprecated API."
        ));
    }

    #[test]
    fn pull_request_line_omits_missing_parts() {
        let pr = PullRequestSummary {
            number: 7,
            title: "Tidy".into(),
            ..Default::default()
        };
        assert_eq!(pull_request_line(&pr), "- #7 Tidy");
    }

    #[test]
    fn skipped_section_only_when_needed() {
        let mut out = String::new();
        render_skipped(&mut out, &[]);
        assert!(out.is_empty());

        render_skipped(&mut out, &[("acme/api".into(), "rate limited".into())]);
        assert!(out.contains("## Not summarized"));
        assert!(out.contains("- `acme/api`: rate limited"));
    }
}
