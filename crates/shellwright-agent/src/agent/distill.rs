use std::collections::HashMap;

use shellwright_ai::Message;
use tracing::info;

use super::{Agent, AgentError};

const DISTILL_INSTRUCTIONS: &str = "Summarize the following conversation into a concise set of \
key facts, decisions, and context for long-term memory. Focus on information that will be \
useful for future interactions. Conversation:";

impl Agent {
    /// Summarize a session into long-term memory.
    ///
    /// Returns the memory id, or `None` if the session is too short to be
    /// worth summarizing. The id is `distill-<session>-<turns>`, so running
    /// again without new turns overwrites the same memory.
    pub async fn distill(&self, session: &str) -> Result<Option<String>, AgentError> {
        let history = self.history.load_history(session).await?;
        if history.len() < self.options.distill_min_turns {
            info!(session, turns = history.len(), "too few turns to distill");
            return Ok(None);
        }

        info!(session, turns = history.len(), "starting memory distillation");
        let transcript: String = history
            .iter()
            .map(|entry| format!("{}: {}\n", entry.role, entry.content))
            .collect();
        let prompt = format!("{DISTILL_INSTRUCTIONS}\n{transcript}");

        let reply = self
            .model
            .generate_content(&[Message::user(prompt)], &[])
            .await?;
        self.record_usage(session, &reply.usage);

        let id = format!("distill-{session}-{}", history.len());
        let metadata = HashMap::from([
            ("session_id".to_string(), session.to_string()),
            ("type".to_string(), "distillation".to_string()),
        ]);
        self.memory.memorize(&id, &reply.text, metadata).await?;

        info!(session, id = %id, "memory distillation complete");
        Ok(Some(id))
    }
}
