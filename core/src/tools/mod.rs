use crate::agent::ToolRegistry;
use crate::error::{RegistryError, ToolError};
use serde_json::{Map, Value};
use std::sync::Arc;

pub mod list_files;
pub mod read_file;
pub mod rename_file;
pub mod sandbox;

pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use rename_file::RenameFileTool;
pub use sandbox::{Sandbox, SandboxPath};

pub fn extract_string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{}' parameter", key)))
}

/// Registers `read_file`, `list_files` and `rename_file`, all confined to `sandbox`.
pub fn register_filesystem_tools(
    registry: &mut ToolRegistry,
    sandbox: Arc<Sandbox>,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(ReadFileTool::new(Arc::clone(&sandbox))))?;
    registry.register(Arc::new(ListFilesTool::new(Arc::clone(&sandbox))))?;
    registry.register(Arc::new(RenameFileTool::new(sandbox)))?;
    Ok(())
}
