use crate::error::{AgentError, RegistryError, ToolError};
use crate::traits::{Tool, ToolCall, ToolResult, ToolSpec};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Tool catalog offered to the backend, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.get(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        validate_shape(&tool.parameters_schema()).map_err(|reason| {
            RegistryError::InvalidShape {
                name: name.to_string(),
                reason,
            }
        })?;

        tracing::debug!(tool = name, "registered tool");
        self.tools.push(tool);
        Ok(())
    }

    pub fn declarations(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Fails on the first request naming a tool that is not registered.
    pub fn validate_batch(&self, calls: &[ToolCall]) -> Result<(), AgentError> {
        match calls.iter().find(|c| self.get(&c.name).is_none()) {
            Some(call) => Err(AgentError::UnknownTool(call.name.clone())),
            None => Ok(()),
        }
    }

    /// Runs one request. Only an unknown tool name is a fault; every tool
    /// failure comes back as the text of an error result.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        let outcome = match check_arguments(&tool.parameters_schema(), &call.arguments) {
            Ok(()) => tool.execute(&call.arguments).await,
            Err(e) => Err(e),
        };

        Ok(match outcome {
            Ok(content) => ToolResult::success(&call.id, content),
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "tool failed");
                ToolResult::error(&call.id, e)
            }
        })
    }

    /// Runs a whole batch concurrently. Results come back in request order.
    pub async fn execute_batch(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, AgentError> {
        self.validate_batch(calls)?;
        join_all(calls.iter().map(|call| self.execute(call)))
            .await
            .into_iter()
            .collect()
    }
}

fn validate_shape(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "schema must be a JSON object".to_string())?;
    if obj.get("type").and_then(Value::as_str) != Some("object") {
        return Err("schema type must be \"object\"".to_string());
    }
    let properties = match obj.get("properties") {
        None => None,
        Some(Value::Object(props)) => Some(props),
        Some(_) => return Err("\"properties\" must be an object".to_string()),
    };
    let Some(required) = obj.get("required") else {
        return Ok(());
    };
    let required = required
        .as_array()
        .ok_or_else(|| "\"required\" must be an array".to_string())?;
    for key in required {
        let key = key
            .as_str()
            .ok_or_else(|| "\"required\" entries must be strings".to_string())?;
        if !properties.is_some_and(|p| p.contains_key(key)) {
            return Err(format!("required parameter '{key}' is not declared"));
        }
    }
    Ok(())
}

fn check_arguments(schema: &Value, args: &Map<String, Value>) -> Result<(), ToolError> {
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for key in required {
        if !args.contains_key(key) {
            return Err(ToolError::InvalidArguments(format!(
                "Missing '{key}' parameter"
            )));
        }
    }

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .into_iter()
        .flatten();
    for (key, prop) in properties {
        let expects_string = prop.get("type").and_then(Value::as_str) == Some("string");
        if expects_string && args.get(key).is_some_and(|v| !v.is_string()) {
            return Err(ToolError::InvalidArguments(format!(
                "'{key}' must be a string"
            )));
        }
    }
    Ok(())
}
