//! ToolContext - execution context for tools

use tracing::debug;

use crate::sandbox::Root;

/// Execution context for tools - scoped to a single session
///
/// The root is injected here by the session, never taken from planner
/// arguments, so a tool can only ever see the sandbox it was given.
#[derive(Debug, Clone)]
pub struct ToolContext {
    root: Root,
    session_id: String,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(root: Root, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        debug!(%root, %session_id, "ToolContext::new: called");
        Self { root, session_id }
    }

    /// Sandbox root for this session
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Session identifier (for log correlation)
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
