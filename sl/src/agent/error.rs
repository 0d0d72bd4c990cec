//! Agent loop errors

use thiserror::Error;

use crate::planner::PlannerError;

/// Failures that end a session early
///
/// Tool failures never appear here; they are fed back to the planner as
/// tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Planner failed: {0}")]
    Planner(#[from] PlannerError),

    #[error("Bootstrap call names unknown tool '{name}'")]
    UnknownBootstrapTool { name: String },
}
