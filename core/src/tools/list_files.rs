use crate::error::ToolError;
use crate::tools::Sandbox;
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use walkdir::WalkDir;

pub struct ListFilesTool {
    sandbox: Arc<Sandbox>,
}

impl ListFilesTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    /// Every regular file below the root, depth-first in lexical order.
    pub async fn list(&self) -> Result<Vec<String>, ToolError> {
        let sandbox = Arc::clone(&self.sandbox);
        tokio::task::spawn_blocking(move || walk(&sandbox))
            .await
            .map_err(|e| ToolError::io("File listing task failed", std::io::Error::other(e)))?
    }
}

fn walk(sandbox: &Sandbox) -> Result<Vec<String>, ToolError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(sandbox.root())
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            ToolError::io("Failed to walk sandbox", std::io::Error::other(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(rel) = sandbox.relative(entry.path()) {
            files.push(rel);
        }
    }
    Ok(files)
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files in the sandbox directory recursively"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<String, ToolError> {
        tracing::info!(tool = "list_files", "tool invoked");

        let files = self.list().await?;
        serde_json::to_string(&files)
            .map_err(|e| ToolError::io("Failed to encode file list", std::io::Error::other(e)))
    }
}
