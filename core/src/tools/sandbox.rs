use crate::error::ToolError;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// The single directory every filesystem tool is confined to.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

/// A path that resolved inside the sandbox root. Only [`Sandbox::resolve`]
/// constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPath(PathBuf);

impl SandboxPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for SandboxPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Sandbox {
    /// Opens the sandbox at `root`, creating the directory if it is missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            std::fs::create_dir_all(root).with_context(|| {
                format!("Failed to create sandbox directory at {}", root.display())
            })?;
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve sandbox root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` against the root.
    ///
    /// The path is normalized lexically first, then re-anchored on the
    /// canonical form of its deepest existing ancestor so symlinks cannot
    /// lead out. Both forms must stay at or below the root, compared per
    /// path component rather than per character.
    pub async fn resolve(&self, name: &str) -> Result<SandboxPath, ToolError> {
        if name.contains('\0') {
            return Err(ToolError::InvalidArguments(
                "path must not contain NUL bytes".to_string(),
            ));
        }

        let lexical = normalize(&self.root.join(name));
        if !lexical.starts_with(&self.root) {
            return Err(self.out_of_sandbox(name));
        }

        let real = self.resolve_existing_prefix(&lexical).await;
        if !real.starts_with(&self.root) {
            return Err(self.out_of_sandbox(name));
        }

        Ok(SandboxPath(real))
    }

    /// Path of `path` relative to the root, `/`-separated on every platform.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    async fn resolve_existing_prefix(&self, lexical: &Path) -> PathBuf {
        for ancestor in lexical.ancestors() {
            if let Ok(canonical) = tokio::fs::canonicalize(ancestor).await {
                return match lexical.strip_prefix(ancestor) {
                    Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                    _ => canonical,
                };
            }
        }
        lexical.to_path_buf()
    }

    fn out_of_sandbox(&self, name: &str) -> ToolError {
        ToolError::OutOfSandbox {
            path: name.to_string(),
            root: self.root.clone(),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_missing_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested").join("sandbox");
        let sandbox = Sandbox::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(sandbox.root().is_absolute());
    }

    #[tokio::test]
    async fn resolve_inside_root() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path()).unwrap();

        let path = sandbox.resolve("sub/../a.txt").await.unwrap();
        assert_eq!(path.as_path(), sandbox.root().join("a.txt"));

        let root = sandbox.resolve(".").await.unwrap();
        assert_eq!(root.as_path(), sandbox.root());
    }

    #[tokio::test]
    async fn resolve_rejects_parent_escape() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path().join("box")).unwrap();

        for name in ["../escape.txt", "a/../../escape.txt", "../../../../etc/passwd"] {
            let err = sandbox.resolve(name).await.unwrap_err();
            assert!(matches!(err, ToolError::OutOfSandbox { .. }), "{name}");
        }
    }

    #[tokio::test]
    async fn resolve_rejects_absolute_path() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path().join("box")).unwrap();
        let outside = tmp.path().join("outside.txt");

        let err = sandbox
            .resolve(outside.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
    }

    #[tokio::test]
    async fn resolve_rejects_sibling_sharing_prefix() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path().join("box")).unwrap();
        std::fs::create_dir_all(tmp.path().join("box-evil")).unwrap();

        let err = sandbox.resolve("../box-evil/x.txt").await.unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlink_leading_out() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path().join("box")).unwrap();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, sandbox.root().join("link")).unwrap();

        let err = sandbox.resolve("link/x.txt").await.unwrap_err();
        assert!(matches!(err, ToolError::OutOfSandbox { .. }));
    }

    #[test]
    fn relative_uses_forward_slashes() {
        let tmp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(tmp.path()).unwrap();
        let path = sandbox.root().join("sub").join("b.txt");
        assert_eq!(sandbox.relative(&path).as_deref(), Some("sub/b.txt"));
    }
}
