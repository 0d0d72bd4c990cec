//! Agent loop
//!
//! A [`Session`] holds one user prompt's transcript; an [`AgentLoop`] runs it
//! against a planner until the planner answers or the round limit is hit.

mod config;
mod engine;
mod error;
mod session;

pub use config::{AgentConfig, BootstrapCall, DEFAULT_MAX_ITERATIONS};
pub use engine::{AgentEvent, AgentLoop};
pub use error::AgentError;
pub use session::{Session, SessionOutcome};
