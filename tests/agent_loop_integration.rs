//! Integration tests for the agent loop.
//!
//! Each test drives a full REPL session with scripted user lines and a stub
//! model that replays canned responses and records every request it sees.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use terminal_coding_agent::agent::{Agent, AgentDeps, ScriptedInput};
use terminal_coding_agent::config::AgentConfig;
use terminal_coding_agent::error::{Error, LlmError};
use terminal_coding_agent::llm::{
    ContentBlock, InferenceRequest, LlmProvider, Message, Role,
};
use terminal_coding_agent::tools::ToolRegistry;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub LLM provider that replays scripted replies (no real API calls).
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<Message, LlmError>>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<Message, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        request: InferenceRequest,
        _cancel: &CancellationToken,
    ) -> Result<Message, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidResponse {
                    provider: "stub".to_string(),
                    reason: "script exhausted".to_string(),
                })
            })
    }
}

fn text(s: &str) -> ContentBlock {
    ContentBlock::text(s)
}

fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

fn agent(llm: &Arc<ScriptedLlm>, lines: &[&str]) -> Agent<ScriptedInput, Vec<u8>> {
    let deps = AgentDeps {
        llm: Arc::clone(llm) as Arc<dyn LlmProvider>,
        tools: ToolRegistry::builtin(),
    };
    Agent::new(
        AgentConfig::default(),
        deps,
        ScriptedInput::new(lines.iter().copied()),
        Vec::new(),
    )
}

async fn run(agent: &mut Agent<ScriptedInput, Vec<u8>>) -> Result<(), Error> {
    timeout(TEST_TIMEOUT, agent.run(&CancellationToken::new()))
        .await
        .expect("agent loop hung")
}

fn printed(agent: &Agent<ScriptedInput, Vec<u8>>) -> String {
    String::from_utf8_lossy(agent.output()).into_owned()
}

#[tokio::test]
async fn test_plain_reply_returns_to_input() {
    let llm = ScriptedLlm::new(vec![Ok(Message::model(vec![text("Hi there")]))]);
    let mut agent = agent(&llm, &["hello"]);

    run(&mut agent).await.unwrap();

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages, vec![Message::user("hello")]);
    assert_eq!(requests[0].tools.len(), 5);
    assert!(requests[0].system.is_some());

    assert_eq!(agent.conversation().len(), 2);
    assert!(printed(&agent).contains("Hi there"));
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let llm = ScriptedLlm::new(vec![Ok(Message::model(vec![text("ok")]))]);
    let mut agent = agent(&llm, &["", "   ", "list files"]);

    run(&mut agent).await.unwrap();

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages, vec![Message::user("list files")]);
}

#[tokio::test]
async fn test_tool_uses_get_correlated_results() {
    let llm = ScriptedLlm::new(vec![
        Ok(Message::model(vec![
            text("Let me compare those."),
            tool_use(
                "toolu_1",
                "generate_diff",
                json!({"original_code": "a\nb", "modified_code": "a\nc"}),
            ),
            tool_use("toolu_2", "no_such_tool", json!({"anything": true})),
        ])),
        Ok(Message::model(vec![text("Done.")])),
    ]);
    let mut agent = agent(&llm, &["diff it"]);

    run(&mut agent).await.unwrap();

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);

    let results = requests[1].messages.last().unwrap();
    assert_eq!(results.role, Role::User);
    assert_eq!(
        results.content,
        vec![
            ContentBlock::tool_result("toolu_1", "Diff:\n\n  a\n- b\n+ c\n", false),
            ContentBlock::tool_result("toolu_2", "tool not found: no_such_tool", true),
        ]
    );

    // user, model, tool results, model
    assert_eq!(agent.conversation().len(), 4);

    let out = printed(&agent);
    let said = out.find("Let me compare those.").unwrap();
    let traced = out.find("generate_diff(").unwrap();
    assert!(said < traced);
    assert!(out.contains("no_such_tool("));
    assert!(out.contains("Done."));
}

#[tokio::test]
async fn test_chained_tool_rounds() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("hello.txt");
    let path_str = path.to_str().unwrap();

    let llm = ScriptedLlm::new(vec![
        Ok(Message::model(vec![tool_use(
            "toolu_1",
            "edit_file",
            json!({"path": path_str, "old_str": "", "new_str": "hello\nworld"}),
        )])),
        Ok(Message::model(vec![tool_use(
            "toolu_2",
            "edit_file",
            json!({"path": path_str, "old_str": "world", "new_str": "there"}),
        )])),
        Ok(Message::model(vec![text("Created and updated the file.")])),
    ]);
    let mut agent = agent(&llm, &["make a file"]);

    run(&mut agent).await.unwrap();

    assert_eq!(llm.requests().len(), 3);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\nthere");
    assert_eq!(agent.conversation().len(), 6);
}

#[tokio::test]
async fn test_inference_error_ends_run() {
    let llm = ScriptedLlm::new(vec![Err(LlmError::RequestFailed {
        provider: "stub".to_string(),
        reason: "connection reset".to_string(),
    })]);
    let mut agent = agent(&llm, &["hello", "never read"]);

    let result = run(&mut agent).await;

    assert!(matches!(result, Err(Error::Llm(LlmError::RequestFailed { .. }))));
    assert_eq!(llm.requests().len(), 1);
    assert_eq!(printed(&agent).matches("connection reset").count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_input_ends_cleanly() {
    let llm = ScriptedLlm::new(vec![]);
    let mut agent = agent(&llm, &["hello"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = timeout(TEST_TIMEOUT, agent.run(&cancel)).await.unwrap();

    assert!(result.is_ok());
    assert!(llm.requests().is_empty());
    assert!(agent.conversation().is_empty());
}

#[tokio::test]
async fn test_end_of_input_without_lines() {
    let llm = ScriptedLlm::new(vec![]);
    let mut agent = agent(&llm, &[]);

    run(&mut agent).await.unwrap();

    assert!(llm.requests().is_empty());
}
