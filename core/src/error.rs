use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single filesystem tool. These never abort a turn: the
/// registry renders them into the tool result the model reads.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("file not found: {path}: {source}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path '{path}' is outside the sandbox root {}", .root.display())]
    OutOfSandbox { path: String, root: PathBuf },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Maps an I/O error on `path` to `NotFound` when that is what it is.
    pub(crate) fn from_io(path: &str, context: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_string(),
                source,
            }
        } else {
            Self::io(format!("{context} '{path}'"), source)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no turn is open")]
    NoOpenTurn,

    #[error("a turn is already open")]
    TurnAlreadyOpen,

    #[error("tool result '{0}' does not answer an outstanding tool call")]
    OrphanToolResult(String),

    #[error("{0} tool call(s) are still unanswered")]
    UnansweredToolCalls(usize),
}

/// Faults that abort the current turn. The session survives all of them.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("backend requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("turn exceeded the limit of {0} tool steps without a final answer")]
    StepLimitExceeded(usize),

    #[error("backend error: {0:#}")]
    Backend(anyhow::Error),

    #[error(transparent)]
    History(#[from] HistoryError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool name must not be empty")]
    EmptyName,

    #[error("tool '{0}' is already registered")]
    Duplicate(String),

    #[error("tool '{name}' has an invalid parameter shape: {reason}")]
    InvalidShape { name: String, reason: String },
}
