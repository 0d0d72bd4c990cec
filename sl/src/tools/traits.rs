//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::context::ToolContext;
use super::error::{ToolError, ToolErrorKind};
use super::spec::ToolSpec;

/// A tool that can be called by the planner
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameters advertised to the planner
    fn spec(&self) -> ToolSpec;

    /// Execute the tool
    ///
    /// `input` is the planner's argument object. The sandbox root comes
    /// from `ctx` only.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Result of a tool execution, as fed back to the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success(String),
    Failure { kind: ToolErrorKind, message: String },
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        debug!("ToolResult::success: called");
        ToolResult::Success(content.into())
    }

    /// Create an error result
    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        debug!(%kind, "ToolResult::error: called");
        ToolResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failure { .. })
    }

    /// Error kind, if this is a failure
    pub fn kind(&self) -> Option<ToolErrorKind> {
        match self {
            ToolResult::Success(_) => None,
            ToolResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Text handed to the planner
    pub fn content(&self) -> String {
        match self {
            ToolResult::Success(text) => text.clone(),
            ToolResult::Failure { message, .. } => format!("Error: {}", message),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::error(err.kind(), err.to_string())
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(content) => ToolResult::success(content),
            Err(err) => err.into(),
        }
    }
}
