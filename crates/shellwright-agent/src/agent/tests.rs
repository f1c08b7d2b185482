use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use shellwright_ai::{
    AiError, LanguageModel, Message, ModelReply, Role, TokenUsage, ToolCall, ToolDefinition,
    ToolResponse,
};

use super::*;
use crate::confirm::Confirmer;
use crate::executor::{ExecError, Executor};
use crate::history::{History, HistoryEntry, HistoryError, SessionSummary, DEFAULT_SESSION_NAME};
use crate::memory::{Memory, MemoryDocument, MemoryError, MemoryHit};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ModelCall {
    messages: Vec<Message>,
    tool_count: usize,
    responses: Vec<ToolResponse>,
}

/// Replays scripted replies; errors once the script runs out.
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        responses: &[ToolResponse],
    ) -> Result<ModelReply, AiError> {
        self.calls.lock().unwrap().push(ModelCall {
            messages: messages.to_vec(),
            tool_count: tools.len(),
            responses: responses.to_vec(),
        });
        self.replies.lock().unwrap().pop_front().ok_or(AiError::RetriesExhausted {
            attempts: 3,
            last: Box::new(AiError::NetworkError("unreachable".into())),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_content(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, AiError> {
        self.next(messages, tools, &[])
    }

    async fn send_tool_response(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        responses: &[ToolResponse],
    ) -> Result<ModelReply, AiError> {
        self.next(messages, tools, responses)
    }
}

#[derive(Default)]
struct RecordingExecutor {
    commands: Mutex<Vec<(String, String)>>,
}

impl RecordingExecutor {
    fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, session_id: &str, command: &str) -> Result<String, ExecError> {
        if command.starts_with("forbidden") {
            return Err(ExecError::NotAllowed("forbidden".into()));
        }
        self.commands
            .lock()
            .unwrap()
            .push((session_id.to_string(), command.to_string()));
        Ok(format!("output of {command}"))
    }
}

#[derive(Default)]
struct InMemoryHistory {
    turns: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    fail_load: bool,
}

impl InMemoryHistory {
    fn with_turns(session: &str, turns: &[(Role, &str)]) -> Arc<Self> {
        let entries = turns
            .iter()
            .map(|(role, content)| HistoryEntry::new(*role, *content))
            .collect();
        Arc::new(Self {
            turns: Mutex::new(HashMap::from([(session.to_string(), entries)])),
            fail_load: false,
        })
    }

    fn turns(&self, session: &str) -> Vec<(Role, String)> {
        self.turns
            .lock()
            .unwrap()
            .get(session)
            .map(|e| e.iter().map(|t| (t.role, t.content.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl History for InMemoryHistory {
    async fn create_session(&self, _name: &str) -> Result<String, HistoryError> {
        Ok("created".into())
    }

    async fn add_message(&self, session: &str, role: Role, content: &str) -> Result<(), HistoryError> {
        self.turns
            .lock()
            .unwrap()
            .entry(session.to_string())
            .or_default()
            .push(HistoryEntry::new(role, content));
        Ok(())
    }

    async fn load_history(&self, session: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        if self.fail_load {
            return Err(HistoryError::Io(std::io::Error::other("disk gone")));
        }
        Ok(self.turns.lock().unwrap().get(session).cloned().unwrap_or_default())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, HistoryError> {
        Ok(Vec::new())
    }

    async fn set_session_name(&self, _session: &str, _name: &str) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn session_name(&self, _session: &str) -> String {
        DEFAULT_SESSION_NAME.to_string()
    }
}

/// Recall returns every stored document, newest last, up to the limit.
#[derive(Default)]
struct InMemoryMemory {
    docs: Mutex<Vec<MemoryDocument>>,
}

impl InMemoryMemory {
    fn with(contents: &[&str]) -> Arc<Self> {
        let memory = Self::default();
        for (i, c) in contents.iter().enumerate() {
            memory.docs.lock().unwrap().push(MemoryDocument {
                id: format!("m{i}"),
                content: c.to_string(),
                metadata: HashMap::new(),
                embedding: Vec::new(),
            });
        }
        Arc::new(memory)
    }

    fn get(&self, id: &str) -> Option<MemoryDocument> {
        self.docs.lock().unwrap().iter().find(|d| d.id == id).cloned()
    }
}

#[async_trait]
impl Memory for InMemoryMemory {
    async fn memorize(
        &self,
        id: &str,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), MemoryError> {
        let mut docs = self.docs.lock().unwrap();
        docs.retain(|d| d.id != id);
        docs.push(MemoryDocument {
            id: id.to_string(),
            content: content.to_string(),
            metadata,
            embedding: Vec::new(),
        });
        Ok(())
    }

    async fn recall(&self, _query: &str, limit: usize) -> Result<Vec<MemoryHit>, MemoryError> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .map(|d| MemoryHit {
                id: d.id.clone(),
                content: d.content.clone(),
                metadata: d.metadata.clone(),
                similarity: 1.0,
            })
            .collect())
    }

    async fn forget(&self, id: &str) -> Result<(), MemoryError> {
        self.docs.lock().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MemoryDocument>, MemoryError> {
        Ok(self.docs.lock().unwrap().clone())
    }
}

struct FixedConfirmer {
    answer: bool,
    asked: AtomicUsize,
}

impl FixedConfirmer {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, _action: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    model: Arc<ScriptedModel>,
    executor: Arc<RecordingExecutor>,
    memory: Arc<InMemoryMemory>,
    history: Arc<InMemoryHistory>,
}

impl Harness {
    fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            model: ScriptedModel::new(replies),
            executor: Arc::new(RecordingExecutor::default()),
            memory: InMemoryMemory::with(&[]),
            history: Arc::new(InMemoryHistory::default()),
        }
    }

    fn agent(&self) -> Agent {
        Agent::new(
            self.model.clone(),
            self.executor.clone(),
            self.memory.clone(),
            self.history.clone(),
        )
    }
}

fn calls(calls: Vec<ToolCall>) -> ModelReply {
    ModelReply {
        text: String::new(),
        tool_calls: calls,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 2,
        },
    }
}

fn exec(command: &str) -> ToolCall {
    ToolCall::new("execute_command", json!({ "command": command }))
}

// ---------------------------------------------------------------------------
// Turn loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plain_answer_takes_one_model_call() {
    let h = Harness::new(vec![ModelReply::text("Hello!")]);
    let answer = h.agent().run("s", "hi").await.unwrap();

    assert_eq!(answer, "Hello!");
    assert_eq!(h.model.calls().len(), 1);
    assert_eq!(h.model.calls()[0].tool_count, 6);
    assert_eq!(
        h.history.turns("s"),
        vec![(Role::User, "hi".to_string()), (Role::Model, "Hello!".to_string())]
    );
}

#[tokio::test]
async fn one_tool_round_then_answer() {
    let h = Harness::new(vec![calls(vec![exec("ls")]), ModelReply::text("Done.")]);
    let answer = h.agent().run("s", "list files").await.unwrap();

    assert_eq!(answer, "Done.");
    let model_calls = h.model.calls();
    assert_eq!(model_calls.len(), 2);
    assert_eq!(
        model_calls[1].responses,
        vec![ToolResponse::new("execute_command", "output of ls")]
    );

    // The follow-up replays the model's call turn before the responses.
    let last = model_calls[1].messages.last().unwrap();
    assert_eq!(last.role, Role::Model);
    assert_eq!(last.tool_calls[0].name, "execute_command");

    assert_eq!(h.executor.commands(), vec![("s".into(), "ls".into())]);
    assert_eq!(h.history.turns("s").len(), 2);
}

#[tokio::test]
async fn tool_results_keep_call_order() {
    let h = Harness::new(vec![
        calls(vec![exec("first"), exec("second"), exec("third")]),
        ModelReply::text("ok"),
    ]);
    h.agent().run("s", "go").await.unwrap();

    let contents: Vec<_> = h.model.calls()[1]
        .responses
        .iter()
        .map(|r| r.content.clone())
        .collect();
    assert_eq!(contents, ["output of first", "output of second", "output of third"]);
}

#[tokio::test]
async fn multiple_rounds_accumulate_messages() {
    let h = Harness::new(vec![
        calls(vec![exec("a")]),
        calls(vec![exec("b")]),
        ModelReply::text("end"),
    ]);
    h.agent().run("s", "go").await.unwrap();

    let model_calls = h.model.calls();
    assert_eq!(model_calls.len(), 3);
    // user, model(a), results(a), model(b)
    assert_eq!(model_calls[2].messages.len(), 4);
    assert_eq!(model_calls[2].messages[2].tool_responses[0].content, "output of a");
}

#[tokio::test]
async fn tool_errors_become_text() {
    let h = Harness::new(vec![
        calls(vec![
            exec("forbidden thing"),
            ToolCall::new("launch_rocket", json!({})),
            ToolCall::new("read_file", json!({"path": "x"})),
        ]),
        ModelReply::text("handled"),
    ]);
    let answer = h.agent().run("s", "try").await.unwrap();
    assert_eq!(answer, "handled");

    let responses = &h.model.calls()[1].responses;
    assert_eq!(
        responses[0].content,
        "Error: command 'forbidden' is not in the allowlist"
    );
    assert_eq!(responses[1].content, "Error: unknown tool: launch_rocket");
    assert_eq!(
        responses[2].content,
        "Error: read_file: missing required argument 'start'"
    );
}

#[tokio::test]
async fn model_failure_aborts_turn() {
    let h = Harness::new(vec![calls(vec![exec("ls")])]);
    let err = h.agent().run("s", "hi").await.unwrap_err();

    assert!(matches!(err, AgentError::Model(AiError::RetriesExhausted { .. })));
    // Only the user turn was persisted.
    assert_eq!(h.history.turns("s"), vec![(Role::User, "hi".to_string())]);
}

#[tokio::test]
async fn history_failure_aborts_before_model() {
    let mut h = Harness::new(vec![ModelReply::text("never")]);
    h.history = Arc::new(InMemoryHistory {
        fail_load: true,
        ..Default::default()
    });
    let err = h.agent().run("s", "hi").await.unwrap_err();

    assert!(matches!(err, AgentError::History(_)));
    assert!(h.model.calls().is_empty());
}

#[tokio::test]
async fn prior_history_is_sent() {
    let mut h = Harness::new(vec![ModelReply::text("again")]);
    h.history = InMemoryHistory::with_turns("s", &[(Role::User, "earlier"), (Role::Model, "reply")]);
    h.agent().run("s", "now").await.unwrap();

    let messages = &h.model.calls()[0].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "earlier");
    assert_eq!(messages[1].role, Role::Model);
    assert_eq!(messages[2].content, "now");
}

#[tokio::test]
async fn empty_final_text_is_not_persisted() {
    let h = Harness::new(vec![ModelReply::text("")]);
    let answer = h.agent().run("s", "hi").await.unwrap();
    assert!(answer.is_empty());
    assert_eq!(h.history.turns("s").len(), 1);
}

#[tokio::test]
async fn memory_context_enriches_prompt_only() {
    let mut h = Harness::new(vec![ModelReply::text("ok")]);
    h.memory = InMemoryMemory::with(&["User prefers zsh", "Project lives in ~/src"]);
    h.agent().run("s", "open my project").await.unwrap();

    let sent = &h.model.calls()[0].messages[0].content;
    assert_eq!(
        sent,
        "\n[LONG-TERM MEMORY CONTEXT]\n- User prefers zsh\n- Project lives in ~/src\n\n\nUser Prompt: open my project"
    );
    assert_eq!(h.history.turns("s")[0].1, "open my project");
}

#[tokio::test]
async fn recall_limit_bounds_context() {
    let mut h = Harness::new(vec![ModelReply::text("ok")]);
    h.memory = InMemoryMemory::with(&["a", "b", "c"]);
    h.agent()
        .with_options(AgentOptions {
            recall_limit: 1,
            ..AgentOptions::default()
        })
        .run("s", "q")
        .await
        .unwrap();

    let sent = &h.model.calls()[0].messages[0].content;
    assert!(sent.contains("- a\n"));
    assert!(!sent.contains("- b\n"));
}

#[tokio::test]
async fn usage_is_tracked_per_session() {
    let h = Harness::new(vec![calls(vec![exec("ls")]), calls(vec![])]);
    let agent = h.agent();
    agent.run("s", "hi").await.unwrap();
    assert_eq!(agent.token_usage("s").total_tokens(), 24);
    assert_eq!(agent.token_usage("other").total_tokens(), 0);
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn declined_command_never_runs() {
    let h = Harness::new(vec![calls(vec![exec("rm -rf build")]), ModelReply::text("ok")]);
    let confirmer = FixedConfirmer::new(false);
    h.agent().with_confirmer(confirmer.clone()).run("s", "clean").await.unwrap();

    assert_eq!(
        h.model.calls()[1].responses[0].content,
        "Action cancelled by user"
    );
    assert!(h.executor.commands().is_empty());
    assert_eq!(confirmer.asked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn approved_command_runs() {
    let h = Harness::new(vec![calls(vec![exec("make")]), ModelReply::text("built")]);
    let agent = h.agent().with_confirmer(FixedConfirmer::new(true));
    assert!(agent.is_interactive());
    agent.run("s", "build").await.unwrap();
    assert_eq!(h.executor.commands().len(), 1);
}

#[tokio::test]
async fn read_only_tools_skip_confirmation() {
    let h = Harness::new(vec![
        calls(vec![ToolCall::new("memory_load", json!({"query": "x"}))]),
        ModelReply::text("ok"),
    ]);
    let confirmer = FixedConfirmer::new(false);
    h.agent().with_confirmer(confirmer.clone()).run("s", "q").await.unwrap();

    assert_eq!(confirmer.asked.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.calls()[1].responses[0].content, "No memories found");
}

// ---------------------------------------------------------------------------
// Individual tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_tools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();
    let p = path.to_str().unwrap();

    let h = Harness::new(vec![]);
    let agent = h.agent();

    let read = agent
        .dispatch("s", &ToolCall::new("read_file", json!({"path": p, "start": 2, "end": 3})))
        .await;
    assert_eq!(read.content, "beta\ngamma");

    let replaced = agent
        .dispatch(
            "s",
            &ToolCall::new(
                "replace_text",
                json!({"path": p, "old_text": "beta", "new_text": "BETA"}),
            ),
        )
        .await;
    assert_eq!(replaced.content, "Text replaced successfully");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\nBETA\ngamma\n");

    let ambiguous = agent
        .dispatch(
            "s",
            &ToolCall::new("replace_text", json!({"path": p, "old_text": "a", "new_text": "x"})),
        )
        .await;
    assert!(ambiguous.content.starts_with("Error: old text found multiple times"));
}

#[tokio::test]
async fn memory_tools() {
    let h = Harness::new(vec![]);
    let agent = h.agent();

    let saved = agent
        .dispatch(
            "s",
            &ToolCall::new("memory_save", json!({"id": "shell", "content": "uses fish"})),
        )
        .await;
    assert_eq!(saved.content, "Information memorized");

    let loaded = agent
        .dispatch("s", &ToolCall::new("memory_load", json!({"query": "shell", "limit": 3})))
        .await;
    assert_eq!(loaded.content, "ID: shell\nContent: uses fish\n\n");

    let forgot = agent
        .dispatch("s", &ToolCall::new("memory_forget", json!({"id": "shell"})))
        .await;
    assert_eq!(forgot.content, "Memory forgotten");
    assert!(h.memory.get("shell").is_none());
}

// ---------------------------------------------------------------------------
// Parallel dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn parallel_dispatch_isolates_failures() {
    let h = Harness::new(vec![]);
    let agent = h.agent();
    let responses = agent
        .dispatch_parallel(
            "p",
            vec![exec("one"), exec("forbidden"), exec("three"), exec("four")],
        )
        .await;

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0].content, "output of one");
    assert!(responses[1].content.starts_with("Error: "));
    assert_eq!(responses[2].content, "output of three");
    assert_eq!(responses[3].content, "output of four");
    assert_eq!(h.executor.commands().len(), 3);
}

// ---------------------------------------------------------------------------
// Distillation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn short_sessions_are_not_distilled() {
    let mut h = Harness::new(vec![ModelReply::text("summary")]);
    h.history = InMemoryHistory::with_turns("s", &[(Role::User, "a"), (Role::Model, "b")]);
    assert_eq!(h.agent().distill("s").await.unwrap(), None);
    assert!(h.model.calls().is_empty());
}

#[tokio::test]
async fn distill_stores_summary() {
    let mut h = Harness::new(vec![ModelReply::text("User maintains a Rust CLI.")]);
    let turns: Vec<(Role, &str)> = (0..6)
        .map(|i| if i % 2 == 0 { (Role::User, "q") } else { (Role::Model, "a") })
        .collect();
    h.history = InMemoryHistory::with_turns("proj", &turns);

    let id = h.agent().distill("proj").await.unwrap();
    assert_eq!(id.as_deref(), Some("distill-proj-6"));

    let call = &h.model.calls()[0];
    assert_eq!(call.tool_count, 0);
    assert!(call.messages[0].content.contains("user: q\nmodel: a\n"));

    let doc = h.memory.get("distill-proj-6").unwrap();
    assert_eq!(doc.content, "User maintains a Rust CLI.");
    assert_eq!(doc.metadata["session_id"], "proj");
    assert_eq!(doc.metadata["type"], "distillation");
}
