//! write_file tool - write content to a file

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::sandbox::Root;
use crate::tools::{ParamType, Tool, ToolContext, ToolError, ToolSpec};

use super::required_str;

/// Write `content` to `path`, replacing any existing file
///
/// Missing parent directories are created. The sandbox check runs before
/// anything is created, so an escaping path leaves the filesystem alone.
pub async fn write_file(root: &Root, path: &str, content: &str) -> Result<String, ToolError> {
    debug!(%path, content_len = content.len(), "write_file: called");
    let full_path = root.resolve(path).map_err(|e| ToolError::from_path("write to", path, e))?;

    let write_error = |source| ToolError::WriteError {
        path: path.to_string(),
        source,
    };

    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    debug!("write_file: parent directories ensured");

    tokio::fs::write(&full_path, content).await.map_err(write_error)?;

    let written = content.chars().count();
    debug!(%written, "write_file: file written successfully");
    Ok(format!("Successfully wrote to \"{}\" ({} characters written)", path, written))
}

/// Write content to a file
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "write_file",
            "Writes or overwrites content to a file in the working directory. Creates parent directories if needed.",
        )
        .param(
            "file_path",
            ParamType::String,
            true,
            "Path to the file relative to the working directory.",
        )
        .param("content", ParamType::String, true, "Content to write")
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!("WriteFileTool::execute: called");
        let path = required_str(&input, "file_path")?;
        let content = required_str(&input, "content")?;

        write_file(ctx.root(), path, content).await
    }
}
