//! ToolRegistry - tool specs and handlers for a session

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::SandboxConfig;

use super::builtin::{ListDirectoryTool, ReadFileTool, RunScriptTool, WriteFileTool};
use super::{Tool, ToolSpec};

/// Errors raised while building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },
}

/// A registered tool: the advertised spec plus the handler it dispatches to
#[derive(Clone)]
pub struct RegisteredTool {
    pub spec: ToolSpec,
    pub handler: Arc<dyn Tool>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool").field("spec", &self.spec).finish()
    }
}

/// Maps tool names to specs and handlers
///
/// Populated once at startup, then shared read-only (usually behind an
/// `Arc`). Listing order is registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        debug!("ToolRegistry::empty: called");
        Self::default()
    }

    /// Create a registry with the four sandboxed file tools
    pub fn standard(config: &SandboxConfig) -> Self {
        debug!(?config, "ToolRegistry::standard: called");
        let mut registry = Self::empty();

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ListDirectoryTool),
            Arc::new(ReadFileTool::new(config.max_file_chars)),
            Arc::new(RunScriptTool::from_config(config)),
            Arc::new(WriteFileTool),
        ];

        for tool in tools {
            let spec = tool.spec();
            // Builtin names are distinct, a duplicate here is a programming error
            if let Err(e) = registry.register(spec, tool) {
                debug!(%e, "ToolRegistry::standard: skipping duplicate builtin");
            }
        }

        registry
    }

    /// Register `handler` under `spec`
    pub fn register(&mut self, spec: ToolSpec, handler: Arc<dyn Tool>) -> Result<(), RegistryError> {
        debug!(tool_name = %spec.name, "ToolRegistry::register: called");
        if self.index.contains_key(&spec.name) {
            debug!(tool_name = %spec.name, "ToolRegistry::register: duplicate name");
            return Err(RegistryError::DuplicateTool { name: spec.name });
        }

        self.index.insert(spec.name.clone(), self.entries.len());
        self.entries.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Register a tool under its own spec
    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let spec = tool.spec();
        self.register(spec, Arc::new(tool))
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        debug!(%name, "ToolRegistry::get: called");
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Specs for every registered tool, in registration order
    pub fn list(&self) -> Vec<ToolSpec> {
        debug!(tool_count = self.entries.len(), "ToolRegistry::list: called");
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get tool names, in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.spec.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
