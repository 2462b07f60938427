//! Sequential per-repository orchestration.

use crate::loop_runner::SummaryAgent;
use prdigest_config::PacingConfig;
use prdigest_core::summary::{RepoActivity, RepoSummary, TimeWindow};
use prdigest_core::tool::ToolHost;
use std::time::Duration;
use tracing::{info, warn};

/// What came out of a digest run.
#[derive(Debug, Default)]
pub struct DigestOutcome {
    pub summaries: Vec<RepoSummary>,
    /// `owner/repo` and the reason, for repositories that were skipped
    pub skipped: Vec<(String, String)>,
}

/// Summarizes repositories one at a time. A failure in one repository is
/// logged and skipped; the rest still run.
pub struct DigestRunner {
    agent: SummaryAgent,
    repo_delay: Duration,
}

impl DigestRunner {
    pub fn new(agent: SummaryAgent) -> Self {
        Self {
            agent,
            repo_delay: Duration::from_secs(2),
        }
    }

    pub fn with_pacing(mut self, pacing: &PacingConfig) -> Self {
        self.repo_delay = Duration::from_millis(pacing.repo_delay_ms);
        self
    }

    pub fn with_repo_delay(mut self, delay: Duration) -> Self {
        self.repo_delay = delay;
        self
    }

    pub async fn run(
        &self,
        host: &dyn ToolHost,
        repos: &[RepoActivity],
        window: &TimeWindow,
    ) -> DigestOutcome {
        let mut outcome = DigestOutcome::default();

        for (i, activity) in repos.iter().enumerate() {
            if i > 0 && !self.repo_delay.is_zero() {
                tokio::time::sleep(self.repo_delay).await;
            }

            let full_name = activity.full_name();
            info!(
                repo = %full_name,
                pr_count = activity.pr_count,
                progress = %format!("{}/{}", i + 1, repos.len()),
                "Processing repository"
            );

            match self
                .agent
                .summarize(host, &activity.owner, &activity.repo, window)
                .await
            {
                Ok(summary) => outcome.summaries.push(summary),
                Err(e) => {
                    warn!(repo = %full_name, error = %e, "Skipping repository");
                    outcome.skipped.push((full_name, e.to_string()));
                }
            }
        }

        outcome
    }
}
