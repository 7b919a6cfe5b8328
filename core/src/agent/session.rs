use crate::agent::AgentLoop;
use crate::error::AgentError;

pub const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingUserInput,
    Shutdown,
}

#[derive(Debug)]
pub enum SessionEvent {
    /// Blank input, nothing was sent.
    Ignored,
    Reply(String),
    /// The turn failed; the session keeps going.
    Failed(AgentError),
    Farewell,
    /// Input arrived after shutdown and was dropped.
    Closed,
}

/// Line-oriented front of an [`AgentLoop`].
pub struct Session {
    agent: AgentLoop,
    state: SessionState,
}

impl Session {
    pub fn new(agent: AgentLoop) -> Self {
        Self {
            agent,
            state: SessionState::AwaitingUserInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    pub fn is_exit_command(input: &str) -> bool {
        input.trim().eq_ignore_ascii_case(EXIT_COMMAND)
    }

    pub async fn handle_input(&mut self, input: &str) -> SessionEvent {
        if self.state == SessionState::Shutdown {
            return SessionEvent::Closed;
        }

        let input = input.trim();
        if input.is_empty() {
            return SessionEvent::Ignored;
        }
        if Self::is_exit_command(input) {
            self.shutdown();
            return SessionEvent::Farewell;
        }

        match self.agent.process(input).await {
            Ok(answer) => SessionEvent::Reply(answer),
            Err(e) => SessionEvent::Failed(e),
        }
    }

    /// Ends the session, e.g. when input reaches EOF.
    pub fn shutdown(&mut self) {
        if self.state != SessionState::Shutdown {
            tracing::info!(turns = self.agent.history().turn_count(), "session shut down");
        }
        self.state = SessionState::Shutdown;
    }
}
