//! Built-in sandboxed file tools

mod list_directory;
mod read_file;
mod run_script;
mod write_file;

pub use list_directory::{DirEntryInfo, ListDirectoryTool, list_directory};
pub use read_file::{DEFAULT_MAX_FILE_CHARS, ReadFileTool};
pub use run_script::{DEFAULT_SCRIPT_TIMEOUT, RunScriptTool, ScriptOutput};
pub use write_file::{WriteFileTool, write_file};

use serde_json::Value;

use crate::tools::ToolError;

/// Fetch a required string argument
fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match input.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ToolError::InvalidArgument(format!("{} must be a string", key))),
        None => Err(ToolError::InvalidArgument(format!("{} is required", key))),
    }
}

/// Fetch an optional string argument
fn optional_str<'a>(input: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match input.get(key) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(ToolError::InvalidArgument(format!("{} must be a string", key))),
    }
}

/// Fetch an optional array-of-strings argument
fn optional_string_array(input: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    match input.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::InvalidArgument(format!("{} must contain only strings", key)))
            })
            .collect(),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(ToolError::InvalidArgument(format!("{} must be an array of strings", key))),
    }
}

/// Truncate to at most `max_chars` characters, returning whether anything was cut
fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let input = json!({"file_path": "a.txt", "n": 1});

        assert_eq!(required_str(&input, "file_path").unwrap(), "a.txt");
        assert!(required_str(&input, "missing").unwrap_err().to_string().contains("is required"));
        assert!(required_str(&input, "n").unwrap_err().to_string().contains("must be a string"));
    }

    #[test]
    fn test_optional_string_array() {
        assert_eq!(
            optional_string_array(&json!({"args": ["3 + 5", "x"]}), "args").unwrap(),
            vec!["3 + 5".to_string(), "x".to_string()]
        );
        assert!(optional_string_array(&json!({}), "args").unwrap().is_empty());
        assert!(optional_string_array(&json!({"args": [1]}), "args").is_err());
        assert!(optional_string_array(&json!({"args": "x"}), "args").is_err());
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
        assert_eq!(truncate_chars("héllo", 5), ("héllo", false));
        assert_eq!(truncate_chars("", 0), ("", false));
    }
}
