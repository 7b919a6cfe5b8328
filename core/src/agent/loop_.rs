use crate::agent::{ContextBuilder, ConversationHistory, ToolRegistry};
use crate::agent::history::DEFAULT_MAX_TURNS;
use crate::error::AgentError;
use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_STEPS: usize = 5;

/// Where the controller is within a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    Invoking,
    ToolExecuting,
    Responding,
}

/// Drives one conversation: user text in, backend invocations and tool
/// batches in between, final answer out. Owns the conversation history.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    history: ConversationHistory,
    state: TurnState,
    max_steps: usize,
    max_turns: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        let context_builder = context_builder.with_tool_specs(tool_registry.declarations());
        Self {
            provider,
            context_builder,
            tool_registry,
            history: ConversationHistory::new(),
            state: TurnState::AwaitingUserInput,
            max_steps: DEFAULT_MAX_STEPS,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max.max(1);
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Runs one full turn for `message` and returns the final answer.
    ///
    /// On any error the in-progress turn is discarded, so the history is
    /// exactly what it was before the call.
    pub async fn process(&mut self, message: &str) -> Result<String, AgentError> {
        self.history.append(ChatMessage::user(message))?;

        let outcome = self.run_turn().await;
        self.state = TurnState::AwaitingUserInput;

        match outcome {
            Ok(answer) => {
                self.history.enforce_limit(self.max_turns);
                Ok(answer)
            }
            Err(e) => {
                let dropped = self.history.rollback_turn();
                warn!(error = %e, dropped, "turn aborted, history rolled back");
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self) -> Result<String, AgentError> {
        let tools = self.tool_registry.declarations();
        let mut steps = 0;

        loop {
            if steps >= self.max_steps {
                return Err(AgentError::StepLimitExceeded(self.max_steps));
            }

            self.state = TurnState::Invoking;
            let messages = self.context_builder.build_messages(self.history.snapshot());
            debug!(step = steps, messages = messages.len(), "invoking backend");

            let request = ChatRequest {
                messages: &messages,
                tools: &tools,
            };
            let response = self
                .provider
                .chat(request)
                .await
                .map_err(AgentError::Backend)?;

            let (content, calls) = match response {
                ChatResponse::Final(text) => return self.respond(text),
                ChatResponse::ToolCalls { content, calls } if calls.is_empty() => {
                    return self.respond(content);
                }
                ChatResponse::ToolCalls { content, calls } => (content, calls),
            };

            self.execute_tool_calls(content, calls).await?;
            steps += 1;
        }
    }

    fn respond(&mut self, answer: String) -> Result<String, AgentError> {
        self.history.append(ChatMessage::assistant(answer.clone()))?;
        self.state = TurnState::Responding;
        debug!("turn completed");
        Ok(answer)
    }

    async fn execute_tool_calls(
        &mut self,
        content: String,
        calls: Vec<ToolCall>,
    ) -> Result<(), AgentError> {
        self.tool_registry.validate_batch(&calls)?;
        self.history
            .append(ChatMessage::assistant_with_tool_calls(content, calls.clone()))?;

        self.state = TurnState::ToolExecuting;
        debug!(count = calls.len(), "executing tool batch");
        let results = self.tool_registry.execute_batch(&calls).await?;

        for result in results {
            self.history
                .append(ChatMessage::tool_result(result.tool_call_id, result.content))?;
        }
        Ok(())
    }
}
