//! get_files_info tool - list a directory with sizes

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::sandbox::Root;
use crate::tools::{ParamType, Tool, ToolContext, ToolError, ToolSpec};

use super::optional_str;

/// One immediate entry of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

impl fmt::Display for DirEntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}: file_size={} bytes, is_dir={}", self.name, self.size, self.is_dir)
    }
}

/// List the immediate entries of `dir`, sorted by name
///
/// Fails on the first entry whose metadata cannot be read rather than
/// returning a partial listing.
pub async fn list_directory(root: &Root, dir: &str) -> Result<Vec<DirEntryInfo>, ToolError> {
    debug!(%dir, "list_directory: called");
    let full_path = root.resolve(dir).map_err(|e| ToolError::from_path("list", dir, e))?;

    let is_dir = tokio::fs::metadata(&full_path).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        debug!(?full_path, "list_directory: not a directory");
        return Err(ToolError::NotADirectory { path: dir.to_string() });
    }

    let mut reader = tokio::fs::read_dir(&full_path)
        .await
        .map_err(|source| ToolError::StatError {
            entry: dir.to_string(),
            source,
        })?;

    let mut entries = Vec::new();
    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                debug!(%source, "list_directory: failed to advance directory");
                return Err(ToolError::StatError {
                    entry: dir.to_string(),
                    source,
                });
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        // Follows symlinks, so a link reports its target's size and kind
        let metadata = tokio::fs::metadata(entry.path()).await.map_err(|source| {
            debug!(%name, %source, "list_directory: failed to stat entry");
            ToolError::StatError {
                entry: name.clone(),
                source,
            }
        })?;

        entries.push(DirEntryInfo {
            name,
            size: metadata.len(),
            is_dir: metadata.is_dir(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(entries_count = entries.len(), "list_directory: entries collected");
    Ok(entries)
}

/// List files and directories in a path
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "get_files_info",
            "Lists files in the specified directory along with their sizes, constrained to the working directory.",
        )
        .param(
            "directory",
            ParamType::String,
            false,
            "Directory to list files from, relative to the working directory (default: .)",
        )
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?input, "ListDirectoryTool::execute: called");
        let dir = optional_str(&input, "directory")?.unwrap_or(".");

        let entries = list_directory(ctx.root(), dir).await?;

        if entries.is_empty() {
            debug!("ListDirectoryTool::execute: empty directory");
            return Ok("(empty directory)".to_string());
        }

        Ok(entries.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))
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
    async fn test_list_directory_file_and_subdirectory() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();

        let entries = list_directory(ctx.root(), ".").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].size, 5);
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "b");
        assert!(entries[1].is_dir);
    }

    #[tokio::test]
    async fn test_list_directory_tool_output_format() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let output = ListDirectoryTool.execute(serde_json::json!({}), &ctx).await.unwrap();

        assert_eq!(output, "- a.txt: file_size=5 bytes, is_dir=false");
    }

    #[tokio::test]
    async fn test_list_directory_with_path() {
        let (temp, ctx) = setup();
        let subdir = temp.path().join("pkg");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("render.py"), "").unwrap();

        let output = ListDirectoryTool
            .execute(serde_json::json!({"directory": "pkg"}), &ctx)
            .await
            .unwrap();

        assert!(output.contains("render.py"));
    }

    #[tokio::test]
    async fn test_list_directory_empty() {
        let (_temp, ctx) = setup();

        let output = ListDirectoryTool.execute(serde_json::json!({}), &ctx).await.unwrap();

        assert!(output.contains("empty"));
    }

    #[tokio::test]
    async fn test_list_directory_not_a_directory() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("a.txt"), "").unwrap();

        let err = list_directory(ctx.root(), "a.txt").await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::NotADirectory);

        let err = list_directory(ctx.root(), "missing").await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn test_list_directory_escape() {
        let (_temp, ctx) = setup();

        let err = list_directory(ctx.root(), "../").await.unwrap_err();

        assert_eq!(err.kind(), ToolErrorKind::Escape);
        assert!(err.to_string().contains("Cannot list \"../\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_directory_dangling_entry_fails_whole_call() {
        let (temp, ctx) = setup();
        fs::write(temp.path().join("ok.txt"), "").unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", temp.path().join("broken")).unwrap();

        let err = list_directory(ctx.root(), ".").await.unwrap_err();

        assert_eq!(err.kind(), ToolErrorKind::StatError);
        assert!(err.to_string().contains("broken"));
    }
}
