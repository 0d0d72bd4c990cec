//! Tool error types

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::sandbox::PathError;

/// Errors that can occur during tool execution
///
/// Every variant maps to a [`ToolErrorKind`]; the message is what the
/// planner reads back, so it names the offending path or tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Cannot {action} \"{path}\" as it is outside the permitted working directory")]
    Escape { action: &'static str, path: String },

    #[error("\"{path}\" is not a directory")]
    NotADirectory { path: String },

    #[error("File not found or is not a regular file: \"{path}\"")]
    NotAFile { path: String },

    #[error("\"{path}\" is not a .{extension} file")]
    NotExecutableKind { path: String, extension: String },

    #[error("Could not read info for '{entry}': {source}")]
    StatError {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read \"{path}\": {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write to \"{path}\": {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution of \"{path}\" timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    #[error("Unknown function: {name}")]
    UnknownTool { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Error executing function: {0}")]
    Handler(String),
}

impl ToolError {
    /// Map a sandbox failure for `path` onto the tool taxonomy
    ///
    /// `action` is the verb used in the planner-facing message
    /// ("list", "read", "write to", "execute").
    pub fn from_path(action: &'static str, path: &str, err: PathError) -> Self {
        match err {
            PathError::Escape { .. } => ToolError::Escape {
                action,
                path: path.to_string(),
            },
            other => ToolError::Handler(other.to_string()),
        }
    }

    /// Error kind reported in the result envelope
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::Escape { .. } => ToolErrorKind::Escape,
            ToolError::NotADirectory { .. } => ToolErrorKind::NotADirectory,
            ToolError::NotAFile { .. } => ToolErrorKind::NotAFile,
            ToolError::NotExecutableKind { .. } => ToolErrorKind::NotExecutableKind,
            ToolError::StatError { .. } => ToolErrorKind::StatError,
            ToolError::ReadError { .. } => ToolErrorKind::ReadError,
            ToolError::WriteError { .. } => ToolErrorKind::WriteError,
            ToolError::Timeout { .. } => ToolErrorKind::TimeoutError,
            ToolError::UnknownTool { .. } => ToolErrorKind::UnknownTool,
            ToolError::InvalidArgument(_) => ToolErrorKind::InvalidArgument,
            ToolError::Handler(_) => ToolErrorKind::HandlerError,
        }
    }
}

/// Classification of a failed tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToolErrorKind {
    Escape,
    NotADirectory,
    NotAFile,
    NotExecutableKind,
    StatError,
    ReadError,
    WriteError,
    TimeoutError,
    UnknownTool,
    InvalidArgument,
    HandlerError,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
