//! Planner trait definition

use async_trait::async_trait;

use super::{PlanRequest, PlanResponse, PlannerError};

/// The decision-maker driving a session
///
/// Given the transcript so far and the available tools, a planner returns
/// some text, some tool calls, or both. It holds no conversation state of
/// its own; everything it knows arrives in the request.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produce the next round's content
    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse, PlannerError>;
}
