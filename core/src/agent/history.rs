use crate::error::HistoryError;
use crate::traits::{ChatMessage, Role};
use std::collections::VecDeque;

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Ordered conversation transcript, stored as whole turns.
///
/// A turn opens with a user message and closes with the assistant message
/// that carries no tool calls. Tool exchanges in between belong to the turn,
/// so trimming and rollback never separate a call from its result.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: VecDeque<Vec<ChatMessage>>,
    open: Option<OpenTurn>,
}

#[derive(Debug, Clone)]
struct OpenTurn {
    messages: Vec<ChatMessage>,
    outstanding: Vec<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) -> Result<(), HistoryError> {
        if message.role == Role::User {
            if self.open.is_some() {
                return Err(HistoryError::TurnAlreadyOpen);
            }
            self.open = Some(OpenTurn {
                messages: vec![message],
                outstanding: Vec::new(),
            });
            return Ok(());
        }

        let turn = self.open.as_mut().ok_or(HistoryError::NoOpenTurn)?;

        match message.role {
            Role::Tool => {
                let id = message.tool_call_id.as_deref().unwrap_or_default();
                let Some(pos) = turn.outstanding.iter().position(|o| o == id) else {
                    return Err(HistoryError::OrphanToolResult(id.to_string()));
                };
                turn.outstanding.remove(pos);
                turn.messages.push(message);
            }
            Role::Assistant => {
                if !turn.outstanding.is_empty() {
                    return Err(HistoryError::UnansweredToolCalls(turn.outstanding.len()));
                }
                let calls = message.requested_calls();
                if calls.is_empty() {
                    turn.messages.push(message);
                    if let Some(turn) = self.open.take() {
                        self.turns.push_back(turn.messages);
                    }
                } else {
                    turn.outstanding = calls.iter().map(|c| c.id.clone()).collect();
                    turn.messages.push(message);
                }
            }
            Role::System | Role::User => turn.messages.push(message),
        }

        Ok(())
    }

    /// Full ordered transcript, including the turn in progress.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        let open = self.open.iter().flat_map(|t| t.messages.iter());
        self.turns.iter().flatten().chain(open).cloned().collect()
    }

    /// Drops the oldest completed turns until at most `max_turns` remain.
    /// Returns how many turns were removed.
    pub fn enforce_limit(&mut self, max_turns: usize) -> usize {
        let excess = self.turns.len().saturating_sub(max_turns);
        for _ in 0..excess {
            self.turns.pop_front();
        }
        if excess > 0 {
            tracing::debug!(removed = excess, kept = self.turns.len(), "trimmed history");
        }
        excess
    }

    /// Discards the turn in progress. Returns the number of messages dropped.
    pub fn rollback_turn(&mut self) -> usize {
        self.open.take().map_or(0, |t| t.messages.len())
    }

    pub fn is_turn_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn message_count(&self) -> usize {
        self.turns.iter().map(Vec::len).sum::<usize>()
            + self.open.as_ref().map_or(0, |t| t.messages.len())
    }
}
