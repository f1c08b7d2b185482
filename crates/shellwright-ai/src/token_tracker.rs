//! Token usage tracking across sessions.

use std::collections::HashMap;

use crate::TokenUsage;

/// Tracks cumulative token usage in total and per conversation.
pub struct TokenTracker {
    total: TokenUsage,
    by_session: HashMap<String, TokenUsage>,
    call_count: u64,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self {
            total: TokenUsage::default(),
            by_session: HashMap::new(),
            call_count: 0,
        }
    }

    /// Record token usage from one model call.
    pub fn record(&mut self, session: &str, usage: &TokenUsage) {
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        self.call_count += 1;

        let entry = self.by_session.entry(session.to_string()).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
    }

    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    pub fn for_session(&self, session: &str) -> Option<&TokenUsage> {
        self.by_session.get(session)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total.total_tokens()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn reset(&mut self) {
        self.total = TokenUsage::default();
        self.by_session.clear();
        self.call_count = 0;
    }
}

impl Default for TokenTracker {
    fn default() -> Self {
        Self::new()
    }
}
