//! Tool dispatch, sequential and parallel.

use std::collections::HashMap;
use std::sync::Arc;

use shellwright_ai::{ToolCall, ToolResponse};
use tracing::{info, warn};

use crate::orchestrator::{run_parallel, Task};
use crate::tools::{self, format_memory_hits, ToolError, ToolRequest};

use super::Agent;

impl Agent {
    /// Run one tool call. Every outcome, including failure, becomes the
    /// response text.
    pub(crate) async fn dispatch(&self, session: &str, call: &ToolCall) -> ToolResponse {
        info!(session, tool = %call.name, "handling tool call");
        ToolResponse::new(&call.name, self.render(session, call).await)
    }

    /// Run a batch of independent tool calls concurrently. Responses are
    /// in the same order as `calls`.
    pub async fn dispatch_parallel(&self, session: &str, calls: Vec<ToolCall>) -> Vec<ToolResponse> {
        info!(session, count = calls.len(), "dispatching tool calls in parallel");
        let names: Vec<String> = calls.iter().map(|c| c.name.clone()).collect();
        let tasks = calls
            .into_iter()
            .map(|call| Task::new(call.id.clone(), call))
            .collect();

        let results = run_parallel(tasks, |task| async move {
            self.handle(session, &task.payload).await
        })
        .await;

        names
            .into_iter()
            .zip(results)
            .map(|(name, result)| {
                let content = match result.error {
                    Some(e) => format!("Error: {e}"),
                    None => result.output,
                };
                ToolResponse::new(name, content)
            })
            .collect()
    }

    async fn render(&self, session: &str, call: &ToolCall) -> String {
        match self.handle(session, call).await {
            Ok(output) => output,
            Err(e) => {
                warn!(session, tool = %call.name, error = %e, "tool call failed");
                format!("Error: {e}")
            }
        }
    }

    async fn handle(&self, session: &str, call: &ToolCall) -> Result<String, ToolError> {
        let request = ToolRequest::from_call(call)?;

        if request.is_mutating() {
            if let Some(confirmer) = &self.confirmer {
                if !confirmer.confirm(&request.describe()).await {
                    info!(session, tool = request.name(), "action declined");
                    return Ok(tools::CANCELLED.to_string());
                }
            }
        }

        match request {
            ToolRequest::ExecuteCommand { command } => {
                let executor = Arc::clone(&self.executor);
                let session = session.to_string();
                let output =
                    tokio::task::spawn_blocking(move || executor.execute(&session, &command))
                        .await
                        .map_err(|e| ToolError::Task(e.to_string()))??;
                Ok(output)
            }
            ToolRequest::ReadFile { path, start, end } => {
                Ok(self.editor.read_lines(&path, start, end)?.join("\n"))
            }
            ToolRequest::ReplaceText {
                path,
                old_text,
                new_text,
            } => {
                self.editor.replace(&path, &old_text, &new_text)?;
                Ok(tools::TEXT_REPLACED.to_string())
            }
            ToolRequest::MemorySave { id, content } => {
                self.memory.memorize(&id, &content, HashMap::new()).await?;
                Ok(tools::MEMORIZED.to_string())
            }
            ToolRequest::MemoryLoad { query, limit } => {
                let hits = self.memory.recall(&query, limit).await?;
                Ok(format_memory_hits(&hits))
            }
            ToolRequest::MemoryForget { id } => {
                self.memory.forget(&id).await?;
                Ok(tools::FORGOTTEN.to_string())
            }
        }
    }
}
