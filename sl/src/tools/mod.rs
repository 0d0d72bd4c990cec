//! Tool system for agent sessions
//!
//! Tools give the planner filesystem access and script execution. Each
//! session gets a `ToolContext` carrying its sandbox root; every builtin
//! resolves its paths through [`crate::sandbox`] before touching anything.
//! Handlers return typed `Result`s, and the [`ToolInvoker`] turns those
//! into the uniform [`ToolResult`] envelope the planner sees.

mod context;
mod error;
mod invoker;
mod registry;
mod spec;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use error::{ToolError, ToolErrorKind};
pub use invoker::{ToolInvoker, invoke};
pub use registry::{RegisteredTool, RegistryError, ToolRegistry};
pub use spec::{ParamSpec, ParamType, ToolSpec};
pub use traits::{Tool, ToolResult};
