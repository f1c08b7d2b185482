//! The turn loop.

use shellwright_ai::{Message, Role};
use tracing::{debug, info, warn};

use super::{Agent, AgentError};

const MEMORY_CONTEXT_HEADER: &str = "[LONG-TERM MEMORY CONTEXT]";

impl Agent {
    /// Answer `prompt` in conversation `session`.
    ///
    /// History load, history write and model failures abort the turn. The
    /// raw prompt is persisted as the user turn and the final answer, when
    /// non-empty, as the model turn.
    pub async fn run(&self, session: &str, prompt: &str) -> Result<String, AgentError> {
        info!(session, "starting agent turn");

        let context = self.recall_context(prompt).await;
        let history = self.history.load_history(session).await?;

        let mut messages: Vec<Message> = history
            .into_iter()
            .map(|entry| Message::new(entry.role, entry.content))
            .collect();
        let enriched = match context {
            Some(context) => format!("{context}\n\nUser Prompt: {prompt}"),
            None => prompt.to_string(),
        };
        messages.push(Message::user(enriched));
        self.history.add_message(session, Role::User, prompt).await?;

        let mut reply = self.model.generate_content(&messages, &self.tools).await?;
        self.record_usage(session, &reply.usage);

        while reply.has_tool_calls() {
            let calls = std::mem::take(&mut reply.tool_calls);
            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                responses.push(self.dispatch(session, call).await);
            }

            messages.push(Message::model_with_calls(reply.text, calls));
            reply = self
                .model
                .send_tool_response(&messages, &self.tools, &responses)
                .await?;
            messages.push(Message::tool_results(responses));
            self.record_usage(session, &reply.usage);
        }

        if !reply.text.is_empty() {
            self.history
                .add_message(session, Role::Model, &reply.text)
                .await?;
        }

        let usage = self.token_usage(session);
        debug!(
            session,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "agent turn complete"
        );
        Ok(reply.text)
    }

    /// Related memories as a labelled block, or `None` when there are none.
    /// Recall failures only cost the enrichment.
    async fn recall_context(&self, prompt: &str) -> Option<String> {
        if self.options.recall_limit == 0 {
            return None;
        }
        let hits = match self.memory.recall(prompt, self.options.recall_limit).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "memory recall failed, continuing without context");
                return None;
            }
        };
        if hits.is_empty() {
            return None;
        }

        info!(count = hits.len(), "memory context injected");
        let mut block = format!("\n{MEMORY_CONTEXT_HEADER}\n");
        for hit in &hits {
            block.push_str("- ");
            block.push_str(&hit.content);
            block.push('\n');
        }
        Some(block)
    }
}
