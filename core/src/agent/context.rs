use crate::traits::{ChatMessage, ToolSpec};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an experienced programmer with file operation capabilities.";

/// Builds the system message sent ahead of the transcript on every step.
pub struct ContextBuilder {
    pub sandbox_root: PathBuf,
    pub system_prompt: String,
    pub tool_specs: Vec<ToolSpec>,
}

impl ContextBuilder {
    pub fn new(sandbox_root: impl AsRef<Path>) -> Self {
        Self {
            sandbox_root: sandbox_root.as_ref().to_path_buf(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tool_specs: vec![],
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tool_specs(mut self, tool_specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = tool_specs;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        let mut parts = vec![self.system_prompt.trim().to_string()];
        parts.push(self.get_runtime_context());
        if let Some(tools) = self.get_tool_summary() {
            parts.push(tools);
        }
        parts.join("\n\n---\n\n")
    }

    fn get_runtime_context(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");

        format!(
            "## Runtime Context

### Current Time
{}

### Sandbox
All file paths are relative to {}. Paths outside it are rejected.",
            timestamp,
            self.sandbox_root.display()
        )
    }

    fn get_tool_summary(&self) -> Option<String> {
        if self.tool_specs.is_empty() {
            return None;
        }

        let mut summary = String::from("## Available Tools\n");
        for tool in &self.tool_specs {
            let _ = write!(summary, "\n- **{}**: {}", tool.name, tool.description);
        }
        Some(summary)
    }

    /// Prepends the system message to a transcript snapshot.
    pub fn build_messages(&self, history: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.build_system_prompt()));
        messages.extend(history);
        messages
    }
}
