//! Token accounting for the tool-calling loop.
//!
//! Uses a character heuristic: one token ≈ four characters, rounded up.
//! Two levers keep a conversation inside the context window:
//!
//! 1. **Per-result truncation**: every tool output is cut to a budget before
//!    it enters the conversation. Diff and file-listing tools get a smaller
//!    budget than everything else.
//! 2. **History pruning**: once the whole conversation estimate passes the
//!    ceiling, the interior is dropped, keeping the system prompt and the
//!    most recent messages.

use prdigest_config::AgentConfig;
use prdigest_core::message::{Message, Role};
use tracing::debug;

pub const CHARS_PER_TOKEN: usize = 4;

/// Appended to a tool result that was cut.
pub const TRUNCATION_MARKER: &str = "\n[... output truncated ...]";

/// Estimate the token count of a string. Rounds up; empty text is free.
pub fn estimate(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate one message: its content plus the name and arguments of every
/// tool call it carries.
pub fn estimate_message(message: &Message) -> usize {
    let calls: usize = message
        .tool_calls
        .iter()
        .map(|tc| estimate(&tc.name) + estimate(&tc.arguments))
        .sum();
    estimate(&message.content) + calls
}

pub fn estimate_messages(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message).sum()
}

/// Cut `text` to roughly `max_tokens` tokens.
///
/// Text within budget comes back unchanged. Otherwise the first
/// `max_tokens * 4` characters are kept and the marker appended, shortening
/// the prefix so the result is never longer than the input. If the marker
/// alone does not fit, the bare prefix is returned. Applying this twice gives
/// the same result as applying it once.
pub fn truncate(text: &str, max_tokens: usize) -> String {
    if estimate(text) <= max_tokens {
        return text.to_string();
    }

    let len = text.chars().count();
    let marker_len = TRUNCATION_MARKER.chars().count();
    let limit = max_tokens.saturating_mul(CHARS_PER_TOKEN);

    if len < marker_len {
        return char_prefix(text, limit).to_string();
    }

    let keep = limit.min(len - marker_len);
    let mut out = String::with_capacity(keep * 4 + TRUNCATION_MARKER.len());
    out.push_str(char_prefix(text, keep));
    out.push_str(TRUNCATION_MARKER);
    out
}

/// The first `chars` characters of `text`, split on a char boundary.
fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Budgets applied by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPolicy {
    /// Conversation estimate above which history is pruned
    pub ceiling: usize,
    /// Recent messages kept when pruning, besides message 0
    pub keep_recent: usize,
    /// Budget for ordinary tool results
    pub tool_result_tokens: usize,
    /// Budget for diff and file-listing results
    pub bulk_result_tokens: usize,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            ceiling: 60_000,
            keep_recent: 5,
            tool_result_tokens: 6_000,
            bulk_result_tokens: 2_000,
        }
    }
}

impl From<&AgentConfig> for BudgetPolicy {
    fn from(config: &AgentConfig) -> Self {
        Self {
            ceiling: config.context_ceiling_tokens,
            keep_recent: config.keep_recent,
            tool_result_tokens: config.tool_result_tokens,
            bulk_result_tokens: config.bulk_result_tokens,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenBudgeter {
    policy: BudgetPolicy,
}

impl TokenBudgeter {
    pub fn new(policy: BudgetPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Whether a tool's output is bulk (diffs, file listings).
    pub fn is_bulk_tool(name: &str) -> bool {
        name.contains("diff") || name.contains("files")
    }

    /// Result budget for the named tool.
    pub fn result_budget(&self, tool_name: &str) -> usize {
        if Self::is_bulk_tool(tool_name) {
            self.policy.bulk_result_tokens
        } else {
            self.policy.tool_result_tokens
        }
    }

    /// Truncate a tool result with the budget for its tool.
    pub fn fit_tool_result(&self, tool_name: &str, text: &str) -> String {
        truncate(text, self.result_budget(tool_name))
    }

    /// Prune `messages` to fit under the ceiling.
    ///
    /// Identity when the estimate is within the ceiling. Otherwise keeps
    /// message 0 and the last `keep_recent` messages. If that tail would open
    /// with tool results whose assistant message was dropped, the tail grows
    /// backward to include it.
    pub fn budget_conversation(&self, messages: Vec<Message>) -> Vec<Message> {
        let total = estimate_messages(&messages);
        if total <= self.policy.ceiling {
            return messages;
        }

        let keep = self.policy.keep_recent;
        if messages.len() <= keep + 1 {
            return messages;
        }

        let mut start = messages.len() - keep;
        while start > 1 && start < messages.len() && messages[start].role == Role::Tool {
            start -= 1;
        }
        if start <= 1 {
            return messages;
        }

        let dropped = start - 1;
        let mut iter = messages.into_iter();
        let mut pruned = Vec::with_capacity(1 + keep);
        pruned.extend(iter.next());
        pruned.extend(iter.skip(dropped));

        debug!(
            total,
            ceiling = self.policy.ceiling,
            dropped,
            remaining = estimate_messages(&pruned),
            "Pruned conversation history"
        );
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prdigest_core::message::MessageToolCall;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate(""), 0);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate("test"), 1);
        assert_eq!(estimate("hello"), 2);
        assert_eq!(estimate(&"a".repeat(100)), 25);
    }

    #[test]
    fn estimate_counts_chars_not_bytes() {
        assert_eq!(estimate("ééé"), 1);
    }

    #[test]
    fn estimate_is_monotonic_under_append() {
        let mut text = String::new();
        let mut prev = 0;
        for _ in 0..50 {
            text.push('x');
            let now = estimate(&text);
            assert!(now >= prev);
            prev = now;
        }
    }

    #[test]
    fn message_estimate_includes_tool_calls() {
        let msg = Message::assistant_with_tools(
            "",
            vec![MessageToolCall {
                id: "c1".into(),
                name: "list_pull_requests".into(), // 18 chars -> 5
                arguments: r#"{"owner":"a"}"#.into(), // 13 chars -> 4
            }],
        );
        assert_eq!(estimate_message(&msg), 9);
    }

    #[test]
    fn truncate_within_budget_is_unchanged() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn truncate_appends_marker() {
        let text = "x".repeat(1_000);
        let out = truncate(&text, 100);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert!(out.starts_with(&"x".repeat(400)));
        assert_eq!(out.chars().count(), 400 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn truncate_shortens_prefix_to_stay_under_input_length() {
        // 410 chars, budget 100 tokens: 400 + marker would exceed 410.
        let text = "y".repeat(410);
        let out = truncate(&text, 100);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert!(out.chars().count() <= 410);
    }

    #[test]
    fn truncate_returns_bare_prefix_when_marker_does_not_fit() {
        let out = truncate("abcdefghijklmnop", 2);
        assert_eq!(out, "abcdefgh");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "日本語".repeat(100);
        let out = truncate(&text, 10);
        assert!(out.starts_with(&"日本語".repeat(13)));
    }

    #[test]
    fn truncate_bound_and_idempotence_hold_across_sizes() {
        let samples = [
            String::new(),
            "a".into(),
            "abc ".repeat(3),
            "z".repeat(26),
            "z".repeat(27),
            "z".repeat(28),
            "line\n".repeat(500),
            "ü".repeat(9_001),
        ];
        for text in &samples {
            for budget in [0, 1, 2, 5, 7, 8, 100, 2_000, 6_000] {
                let once = truncate(text, budget);
                assert!(
                    once.chars().count() <= text.chars().count(),
                    "grew: len={} budget={budget}",
                    text.len()
                );
                assert!(
                    estimate(&once) <= budget + estimate(TRUNCATION_MARKER),
                    "over budget: len={} budget={budget}",
                    text.len()
                );
                if estimate(text) <= budget {
                    assert_eq!(&once, text);
                }
                assert_eq!(truncate(&once, budget), once, "budget={budget}");
            }
        }
    }

    #[test]
    fn bulk_tools_get_smaller_budget() {
        let b = TokenBudgeter::default();
        assert_eq!(b.result_budget("get_pull_request_diff"), 2_000);
        assert_eq!(b.result_budget("get_pull_request_files"), 2_000);
        assert_eq!(b.result_budget("list_pull_requests"), 6_000);
        assert_eq!(b.result_budget("get_pull_request"), 6_000);
    }

    fn conversation(n: usize, each_chars: usize) -> Vec<Message> {
        let mut msgs = vec![Message::system("system prompt")];
        for i in 1..n {
            let body = format!("{i}:{}", "m".repeat(each_chars));
            if i % 2 == 1 {
                msgs.push(Message::user(body));
            } else {
                msgs.push(Message::assistant(body));
            }
        }
        msgs
    }

    fn budgeter(ceiling: usize) -> TokenBudgeter {
        TokenBudgeter::new(BudgetPolicy {
            ceiling,
            ..BudgetPolicy::default()
        })
    }

    #[test]
    fn budget_is_identity_under_ceiling() {
        let msgs = conversation(12, 40);
        let total = estimate_messages(&msgs);
        let out = budgeter(total).budget_conversation(msgs.clone());
        assert_eq!(out, msgs);
    }

    #[test]
    fn budget_keeps_first_and_recent_over_ceiling() {
        let msgs = conversation(12, 400);
        let total = estimate_messages(&msgs);
        let out = budgeter(100).budget_conversation(msgs.clone());

        assert_eq!(out.len(), 6);
        assert_eq!(out[0], msgs[0]);
        assert_eq!(&out[1..], &msgs[7..]);
        assert!(estimate_messages(&out) <= total);
    }

    #[test]
    fn budget_short_conversation_is_untouched() {
        let msgs = conversation(4, 4_000);
        let out = budgeter(10).budget_conversation(msgs.clone());
        assert_eq!(out, msgs);
    }

    #[test]
    fn budget_widens_tail_to_keep_tool_results_answered() {
        let call = |id: &str| MessageToolCall {
            id: id.into(),
            name: "get_pull_request".into(),
            arguments: "{}".into(),
        };
        let big = "d".repeat(4_000);
        let msgs = vec![
            Message::system("sys"),
            Message::user("summarize"),
            Message::assistant_with_tools("", vec![call("a")]),
            Message::tool_result("a", big.clone()),
            Message::assistant_with_tools("", vec![call("b"), call("c"), call("d")]),
            Message::tool_result("b", big.clone()),
            Message::tool_result("c", big.clone()),
            Message::tool_result("d", big.clone()),
            Message::assistant_with_tools("", vec![call("e")]),
            Message::tool_result("e", big),
        ];

        // Last five starts at tool result "c"; the tail must reach back to
        // the assistant message that requested b, c and d.
        let out = budgeter(100).budget_conversation(msgs.clone());
        assert_eq!(out[0], msgs[0]);
        assert_eq!(&out[1..], &msgs[4..]);
        assert_ne!(out[1].role, Role::Tool);

        let mut conv = prdigest_core::message::Conversation::new();
        conv.messages = out;
        assert!(conv.unanswered_tool_calls().is_empty());
    }

    #[test]
    fn budget_with_no_recent_messages_keeps_only_the_first() {
        let budgeter = TokenBudgeter::new(BudgetPolicy {
            ceiling: 1,
            keep_recent: 0,
            ..BudgetPolicy::default()
        });
        let msgs = vec![Message::system("system prompt"), Message::user("summarize acme/api")];

        let out = budgeter.budget_conversation(msgs.clone());
        assert_eq!(out, vec![msgs[0].clone()]);
    }
}
