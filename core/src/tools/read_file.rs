use crate::error::ToolError;
use crate::tools::{Sandbox, extract_string_arg};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub struct ReadFileTool {
    sandbox: Arc<Sandbox>,
}

impl ReadFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file content from the sandbox directory. Returns file content or an error message."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "File name relative to the sandbox directory"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let name = extract_string_arg(args, "name")?;
        tracing::info!(tool = "read_file", %name, "tool invoked");

        let path = self.sandbox.resolve(name).await?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::from_io(name, "Failed to read", e))
    }
}
