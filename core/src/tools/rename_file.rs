use crate::error::ToolError;
use crate::tools::{Sandbox, extract_string_arg};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Renames or moves a file inside the sandbox.
///
/// Both paths are resolved and checked before anything on disk changes.
/// Renames from different sessions sharing one root are not coordinated.
pub struct RenameFileTool {
    sandbox: Arc<Sandbox>,
}

impl RenameFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for RenameFileTool {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Rename or move a file within the sandbox directory. Creates target directories if needed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Current file name"
                },
                "newName": {
                    "type": "string",
                    "description": "New file name"
                }
            },
            "required": ["name", "newName"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let name = extract_string_arg(args, "name")?;
        let new_name = extract_string_arg(args, "newName")?;
        tracing::info!(tool = "rename_file", %name, new_name = %new_name, "tool invoked");

        let source = self.sandbox.resolve(name).await?;
        let target = self.sandbox.resolve(new_name).await?;

        if source.as_path() == self.sandbox.root() || target.as_path() == self.sandbox.root() {
            return Err(ToolError::InvalidArguments(
                "the sandbox root itself cannot be renamed or replaced".to_string(),
            ));
        }

        let meta = tokio::fs::metadata(&source)
            .await
            .map_err(|e| ToolError::from_io(name, "Failed to stat", e))?;
        if !meta.is_file() {
            return Err(ToolError::InvalidArguments(format!(
                "'{name}' is not a regular file"
            )));
        }

        if let Some(parent) = target.as_path().parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::io(format!("Failed to create directory for '{new_name}'"), e)
            })?;
        }

        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| ToolError::from_io(name, "Failed to rename", e))?;

        Ok(format!("File '{name}' successfully renamed to '{new_name}'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ListFilesTool;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        rename: RenameFileTool,
        list: ListFilesTool,
    }

    fn setup() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let sandbox = Arc::new(Sandbox::open(tmp.path().join("box")).unwrap());
        fs::write(sandbox.root().join("a.txt"), "a").unwrap();
        Fixture {
            tmp,
            rename: RenameFileTool::new(Arc::clone(&sandbox)),
            list: ListFilesTool::new(sandbox),
        }
    }

    fn args(name: &str, new_name: &str) -> Map<String, Value> {
        json!({"name": name, "newName": new_name})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn moves_into_new_directory() {
        let fx = setup();
        let out = fx.rename.execute(&args("a.txt", "sub2/c.txt")).await.unwrap();
        assert!(out.contains("successfully renamed"));
        assert!(fx.tmp.path().join("box/sub2").is_dir());
        assert_eq!(fx.list.list().await.unwrap(), vec!["sub2/c.txt"]);
    }

    #[tokio::test]
    async fn parent_escape_is_rejected_without_mutation() {
        let fx = setup();
        let err = fx
            .rename
            .execute(&args("a.txt", "../escape.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
        assert!(!fx.tmp.path().join("escape.txt").exists());
        assert_eq!(fx.list.list().await.unwrap(), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn escape_through_new_directory_creates_nothing() {
        let fx = setup();
        let err = fx
            .rename
            .execute(&args("a.txt", "deep/../../outside/x.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
        assert!(!fx.tmp.path().join("outside").exists());
        assert!(!fx.tmp.path().join("box/deep").exists());
    }

    #[tokio::test]
    async fn sibling_with_shared_prefix_is_rejected() {
        let fx = setup();
        let err = fx
            .rename
            .execute(&args("a.txt", "../box-evil/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
        assert!(!fx.tmp.path().join("box-evil").exists());
    }

    #[tokio::test]
    async fn absolute_target_is_rejected() {
        let fx = setup();
        let target = fx.tmp.path().join("abs.txt");
        let err = fx
            .rename
            .execute(&args("a.txt", target.to_str().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn missing_source_is_not_found_and_creates_nothing() {
        let fx = setup();
        let err = fx
            .rename
            .execute(&args("nope.txt", "made/up.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
        assert!(!fx.tmp.path().join("box/made").exists());
    }

    #[tokio::test]
    async fn sandbox_root_is_never_a_source_or_target() {
        let fx = setup();
        for (name, new_name) in [(".", "x/y.txt"), ("", "x/y.txt"), ("a.txt", "x/..")] {
            let err = fx.rename.execute(&args(name, new_name)).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)), "{name} -> {new_name}");
        }
        assert!(!fx.tmp.path().join("box/x").exists());
        assert_eq!(fx.list.list().await.unwrap(), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn directory_source_is_rejected_without_mutation() {
        let fx = setup();
        fs::create_dir(fx.tmp.path().join("box/d")).unwrap();
        fs::write(fx.tmp.path().join("box/d/b.txt"), "b").unwrap();

        let err = fx
            .rename
            .execute(&args("d", "x/moved"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
        assert!(fx.tmp.path().join("box/d/b.txt").is_file());
        assert!(!fx.tmp.path().join("box/x").exists());
    }
}
