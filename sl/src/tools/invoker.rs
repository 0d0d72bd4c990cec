//! ToolInvoker - executes planner tool calls against a registry

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::planner::ToolCallRequest;

use super::{ToolContext, ToolError, ToolRegistry, ToolResult};

/// Argument keys that only the session may supply
const RESERVED_ARGS: &[&str] = &["root", "working_directory"];

/// Executes tool calls, always producing a [`ToolResult`]
///
/// Unknown names, handler errors and handler panics all come back as
/// failure results; nothing escapes this boundary.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        debug!(tool_count = registry.len(), "ToolInvoker::new: called");
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a single tool call
    pub async fn invoke(&self, request: &ToolCallRequest, ctx: &ToolContext) -> ToolResult {
        invoke(&self.registry, request, ctx).await
    }

    /// Execute tool calls in the order issued
    pub async fn invoke_all(&self, requests: &[ToolCallRequest], ctx: &ToolContext) -> Vec<(String, ToolResult)> {
        debug!(call_count = requests.len(), "ToolInvoker::invoke_all: called");
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self.invoke(request, ctx).await;
            results.push((request.id.clone(), result));
        }

        results
    }
}

/// Execute `request` against `registry` inside the sandbox of `ctx`
pub async fn invoke(registry: &ToolRegistry, request: &ToolCallRequest, ctx: &ToolContext) -> ToolResult {
    debug!(tool_name = %request.name, session_id = %ctx.session_id(), "invoke: called");

    let Some(entry) = registry.get(&request.name) else {
        warn!(tool_name = %request.name, "Planner requested unknown tool");
        return ToolError::UnknownTool {
            name: request.name.clone(),
        }
        .into();
    };

    let input = match sanitize_arguments(&request.arguments) {
        Ok(input) => input,
        Err(e) => {
            debug!(tool_name = %request.name, %e, "invoke: rejected arguments");
            return e.into();
        }
    };
    let outcome = AssertUnwindSafe(entry.handler.execute(input, ctx)).catch_unwind().await;

    let result: ToolResult = match outcome {
        Ok(result) => result.into(),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(tool_name = %request.name, %message, "Tool handler panicked");
            ToolError::Handler(message).into()
        }
    };

    if let ToolResult::Failure { kind, message } = &result {
        debug!(tool_name = %request.name, %kind, %message, "invoke: tool failed");
    }
    result
}

/// Normalize planner arguments to an object and drop session-only keys
///
/// Missing arguments (`null`) count as an empty object; any other
/// non-object value is an invalid argument.
fn sanitize_arguments(arguments: &Value) -> Result<Value, ToolError> {
    let mut object = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(ToolError::InvalidArgument(format!(
                "arguments must be a JSON object, got {}",
                other
            )));
        }
    };

    for key in RESERVED_ARGS {
        if object.remove(*key).is_some() {
            warn!(%key, "Dropping planner-supplied reserved argument");
        }
    }

    Ok(Value::Object(object))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
