//! Planner interface
//!
//! The planner decides what happens next in a session: answer the user, or
//! call tools. The core loop depends only on the [`Planner`] trait.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod types;

pub use anthropic::AnthropicPlanner;
pub use client::Planner;
pub use error::PlannerError;
pub use types::{
    ContentBlock, PlanRequest, PlanResponse, Role, StopReason, TokenUsage, ToolCallRequest, TranscriptEntry,
};

use crate::config::PlannerConfig;

/// Create a planner for the provider named in config
pub fn create_planner(config: &PlannerConfig) -> Result<Arc<dyn Planner>, PlannerError> {
    debug!(provider = %config.provider, model = %config.model, "create_planner: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicPlanner::from_config(config)?)),
        other => {
            debug!(provider = %other, "create_planner: unknown provider");
            Err(PlannerError::Config(format!(
                "Unknown planner provider: '{}'. Supported: anthropic",
                other
            )))
        }
    }
}
