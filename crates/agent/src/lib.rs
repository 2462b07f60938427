//! The summarizing agent.
//!
//! For each repository the agent runs a bounded tool-calling conversation:
//!
//! 1. **Prune** the history to fit the context ceiling
//! 2. **Send** it to the reasoning service with the tool declarations
//! 3. **If tool calls**: run each through the tool host, truncate the
//!    output, append one tool message per call, loop back to step 1
//! 4. **If text**: extract a [`RepoSummary`](prdigest_core::RepoSummary)
//!
//! [`discovery`] decides which repositories are worth a conversation and
//! [`runner`] walks them one at a time.

pub mod budget;
pub mod discovery;
pub mod extract;
pub mod loop_runner;
pub mod prompt;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use budget::{BudgetPolicy, TokenBudgeter};
pub use discovery::{Candidate, DiscoveryOptions, RepoDiscovery};
pub use extract::extract_summary;
pub use loop_runner::SummaryAgent;
pub use runner::{DigestOutcome, DigestRunner};
