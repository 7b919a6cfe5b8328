use async_trait::async_trait;
use sandbot_core::agent::{SessionEvent, SessionState};
use sandbot_core::{
    AgentError, AgentLoop, ChatRequest, ChatResponse, ContextBuilder, Provider, Sandbox, Session,
    ToolCall, ToolRegistry, register_filesystem_tools,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct Script {
    steps: Mutex<VecDeque<ChatResponse>>,
    invocations: AtomicUsize,
}

impl Script {
    fn new(steps: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            invocations: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Provider for Script {
    fn name(&self) -> &str {
        "script"
    }

    async fn chat(&self, _request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("401 Invalid API Key"))
    }
}

fn calls(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::ToolCalls {
        content: "working on it".to_string(),
        calls,
    }
}

fn session(tmp: &TempDir, provider: Arc<Script>) -> (Session, Arc<Sandbox>) {
    let sandbox = Arc::new(Sandbox::open(tmp.path().join("sandbox")).unwrap());
    let mut registry = ToolRegistry::new();
    register_filesystem_tools(&mut registry, Arc::clone(&sandbox)).unwrap();
    let agent = AgentLoop::new(
        provider,
        ContextBuilder::new(sandbox.root()),
        Arc::new(registry),
    );
    (Session::new(agent), sandbox)
}

#[tokio::test]
async fn reorganizes_files_across_turns() {
    let tmp = TempDir::new().unwrap();
    let provider = Script::new(vec![
        calls(vec![ToolCall::new("c1", "list_files", json!({}))]),
        calls(vec![ToolCall::new(
            "c2",
            "rename_file",
            json!({"name": "a.txt", "newName": "sub2/c.txt"}),
        )]),
        ChatResponse::Final("Moved a.txt to sub2/c.txt".to_string()),
        calls(vec![ToolCall::new("c3", "list_files", json!({}))]),
        ChatResponse::Final("sub2/c.txt".to_string()),
    ]);
    let (mut session, sandbox) = session(&tmp, Arc::clone(&provider));
    std::fs::write(sandbox.root().join("a.txt"), "a").unwrap();

    let event = session.handle_input("move a.txt into sub2 as c.txt").await;
    assert!(matches!(event, SessionEvent::Reply(ref r) if r == "Moved a.txt to sub2/c.txt"));
    assert!(sandbox.root().join("sub2/c.txt").is_file());
    assert!(!sandbox.root().join("a.txt").exists());

    session.handle_input("what is there now?").await;
    let history = session.agent().history().snapshot();
    let listing = history
        .iter()
        .rev()
        .find(|m| m.tool_call_id.as_deref() == Some("c3"))
        .unwrap();
    assert_eq!(listing.content, r#"["sub2/c.txt"]"#);
    assert_eq!(session.agent().history().turn_count(), 2);
}

#[tokio::test]
async fn escape_attempt_is_reported_to_the_model() {
    let tmp = TempDir::new().unwrap();
    let provider = Script::new(vec![
        calls(vec![ToolCall::new(
            "c1",
            "rename_file",
            json!({"name": "a.txt", "newName": "../escape.txt"}),
        )]),
        ChatResponse::Final("I cannot move files outside the sandbox.".to_string()),
    ]);
    let (mut session, sandbox) = session(&tmp, provider);
    std::fs::write(sandbox.root().join("a.txt"), "a").unwrap();

    let event = session.handle_input("move a.txt up one level").await;
    assert!(matches!(event, SessionEvent::Reply(_)));
    assert!(!tmp.path().join("escape.txt").exists());
    assert!(sandbox.root().join("a.txt").exists());

    let history = session.agent().history().snapshot();
    assert!(history[2].content.contains("outside the sandbox"));
}

#[tokio::test]
async fn blank_input_and_exit() {
    let tmp = TempDir::new().unwrap();
    let provider = Script::new(vec![]);
    let (mut session, _sandbox) = session(&tmp, Arc::clone(&provider));

    assert!(matches!(session.handle_input("   ").await, SessionEvent::Ignored));
    assert!(matches!(session.handle_input("ExIt").await, SessionEvent::Farewell));
    assert_eq!(session.state(), SessionState::Shutdown);

    assert!(matches!(session.handle_input("hello?").await, SessionEvent::Closed));
    assert_eq!(provider.invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn backend_failure_keeps_session_alive() {
    let tmp = TempDir::new().unwrap();
    let provider = Script::new(vec![]);
    let (mut session, _sandbox) = session(&tmp, provider);

    let event = session.handle_input("hi").await;
    let SessionEvent::Failed(AgentError::Backend(err)) = event else {
        panic!("expected a backend failure");
    };
    assert!(err.to_string().contains("401"));
    assert_eq!(session.state(), SessionState::AwaitingUserInput);
    assert_eq!(session.agent().history().message_count(), 0);
}
