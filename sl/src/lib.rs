//! SandLoop - sandboxed tool-invocation agent loop
//!
//! SandLoop lets an external planner (typically an LLM) work inside one
//! directory: list it, read and write files in it, and run scripts in it.
//! Every path is confined to the session root, every tool failure is fed
//! back to the planner as data, and every session ends after a bounded
//! number of rounds.
//!
//! # Modules
//!
//! - [`sandbox`] - root confinement for relative paths
//! - [`tools`] - tool trait, registry, invoker and the built-in file tools
//! - [`planner`] - planner trait, transcript types and the Anthropic planner
//! - [`agent`] - sessions and the loop that drives them
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod planner;
pub mod sandbox;
pub mod tools;

pub use agent::{AgentConfig, AgentError, AgentEvent, AgentLoop, BootstrapCall, Session, SessionOutcome};
pub use config::{Config, PlannerConfig, SandboxConfig};
pub use planner::{
    ContentBlock, PlanRequest, PlanResponse, Planner, PlannerError, Role, ToolCallRequest, TranscriptEntry,
    create_planner,
};
pub use sandbox::{PathError, Root};
pub use tools::{ToolError, ToolErrorKind, ToolInvoker, ToolRegistry, ToolResult, ToolSpec};
