//! Agent loop settings

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default round limit for a session
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, use the available functions to gather information \
before producing a final answer. You can:

- List files and directories
- Read file contents
- Execute Python files with optional arguments
- Write or overwrite files

All paths are relative to the working directory. Do not guess or fabricate file contents.";

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Planner rounds before the session gives up
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Instructions sent to the planner with every round
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,

    /// Tool calls executed before the first planner round
    pub bootstrap: Vec<BootstrapCall>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            bootstrap: Vec::new(),
        }
    }
}

/// A tool call to pre-run at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapCall {
    /// Registered tool name
    pub tool: String,

    /// Arguments, as the planner would send them
    #[serde(default = "empty_args")]
    pub args: Value,
}

impl BootstrapCall {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

fn empty_args() -> Value {
    Value::Object(Default::default())
}
