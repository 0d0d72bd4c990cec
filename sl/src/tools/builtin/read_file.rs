//! get_file_content tool - read a file as text, bounded in size

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::sandbox::Root;
use crate::tools::{ParamType, Tool, ToolContext, ToolError, ToolSpec};

use super::{required_str, truncate_chars};

/// Default read limit, in characters
pub const DEFAULT_MAX_FILE_CHARS: usize = 10_000;

/// Read a file's contents
pub struct ReadFileTool {
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(max_chars: usize) -> Self {
        debug!(%max_chars, "ReadFileTool::new: called");
        Self { max_chars }
    }

    /// Read `path` as lossy UTF-8, truncated to the configured limit
    ///
    /// Truncated output ends with a marker naming the file and the limit,
    /// so it is informational and not a faithful copy of the file.
    pub async fn read(&self, root: &Root, path: &str) -> Result<String, ToolError> {
        debug!(%path, max_chars = self.max_chars, "ReadFileTool::read: called");
        let full_path = root.resolve(path).map_err(|e| ToolError::from_path("read", path, e))?;

        let is_file = tokio::fs::metadata(&full_path).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            debug!(?full_path, "ReadFileTool::read: not a regular file");
            return Err(ToolError::NotAFile { path: path.to_string() });
        }

        let bytes = tokio::fs::read(&full_path).await.map_err(|source| ToolError::ReadError {
            path: path.to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let (kept, truncated) = truncate_chars(&content, self.max_chars);
        if truncated {
            debug!(original_len = content.len(), "ReadFileTool::read: truncating");
            return Ok(format!(
                "{}\n[...File \"{}\" truncated at {} characters]",
                kept, path, self.max_chars
            ));
        }

        Ok(content.into_owned())
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_CHARS)
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "get_file_content",
            "Reads the contents of a file within the working directory. Long files are truncated.",
        )
        .param(
            "file_path",
            ParamType::String,
            true,
            "Path to the file relative to the working directory.",
        )
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?input, "ReadFileTool::execute: called");
        let path = required_str(&input, "file_path")?;
        self.read(ctx.root(), path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, ToolContext) {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(Root::new(temp.path()).unwrap(), "test");
        (temp, ctx)
    }

    #[tokio::test]
    async fn test_read_file_basic() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("main.py"), "print('hi')\n").unwrap();

        let content = ReadFileTool::default()
            .execute(serde_json::json!({"file_path": "main.py"}), &ctx)
            .await
            .unwrap();

        assert_eq!(content, "print('hi')\n");
    }

    #[tokio::test]
    async fn test_read_file_truncates_at_limit() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("big.txt"), "x".repeat(25)).unwrap();
        let tool = ReadFileTool::new(10);

        let first = tool.read(ctx.root(), "big.txt").await.unwrap();
        let second = tool.read(ctx.root(), "big.txt").await.unwrap();

        assert_eq!(first, format!("{}\n[...File \"big.txt\" truncated at 10 characters]", "x".repeat(10)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_read_file_exactly_at_limit_not_truncated() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("exact.txt"), "0123456789").unwrap();

        let content = ReadFileTool::new(10).read(ctx.root(), "exact.txt").await.unwrap();

        assert_eq!(content, "0123456789");
    }

    #[tokio::test]
    async fn test_read_file_replaces_invalid_utf8() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("bin.dat"), [b'o', b'k', 0xff, 0xfe]).unwrap();

        let content = ReadFileTool::default().read(ctx.root(), "bin.dat").await.unwrap();

        assert!(content.starts_with("ok"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_read_file_not_a_file() {
        let (temp, ctx) = setup();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        let tool = ReadFileTool::default();

        assert_eq!(
            tool.read(ctx.root(), "missing.py").await.unwrap_err().kind(),
            ToolErrorKind::NotAFile
        );
        assert_eq!(tool.read(ctx.root(), "pkg").await.unwrap_err().kind(), ToolErrorKind::NotAFile);
    }

    #[tokio::test]
    async fn test_read_file_escape() {
        let (_temp, ctx) = setup();

        let err = ReadFileTool::default().read(ctx.root(), "../../etc/passwd").await.unwrap_err();

        assert_eq!(err.kind(), ToolErrorKind::Escape);
    }

    #[tokio::test]
    async fn test_read_file_missing_argument() {
        let (_temp, ctx) = setup();

        let err = ReadFileTool::default().execute(serde_json::json!({}), &ctx).await.unwrap_err();

        assert_eq!(err.kind(), ToolErrorKind::InvalidArgument);
    }
}
