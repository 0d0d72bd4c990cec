//! Planner error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while asking the planner for a round
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Planner configuration error: {0}")]
    Config(String),
}

impl PlannerError {
    /// Whether the adapter should try the same request again
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::RateLimited { .. } => true,
            PlannerError::ApiError { status, .. } => *status >= 500,
            PlannerError::Network(_) => true,
            PlannerError::Timeout(_) => true,
            PlannerError::InvalidResponse(_) | PlannerError::Json(_) | PlannerError::Config(_) => false,
        }
    }

    /// Server-requested delay for a rate limit
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlannerError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
