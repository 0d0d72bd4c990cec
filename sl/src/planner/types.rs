//! Transcript and planner request/response types
//!
//! The transcript is the whole conversation state of a session. These
//! types are provider-agnostic; adapters such as the Anthropic planner
//! translate them to their wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::tools::{ToolResult, ToolSpec};

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// A content block in a transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create a tool-use block from a call request
    pub fn tool_use(call: &ToolCallRequest) -> Self {
        ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        }
    }
}

/// One entry of the append-only session transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl TranscriptEntry {
    /// The user's request
    pub fn user(text: impl Into<String>) -> Self {
        debug!("TranscriptEntry::user: called");
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Content returned by the planner
    pub fn agent(blocks: Vec<ContentBlock>) -> Self {
        debug!(block_count = blocks.len(), "TranscriptEntry::agent: called");
        Self {
            role: Role::Agent,
            content: blocks,
        }
    }

    /// A tool result answering call `call_id`
    pub fn tool_result(call_id: impl Into<String>, name: impl Into<String>, result: &ToolResult) -> Self {
        debug!(is_error = result.is_error(), "TranscriptEntry::tool_result: called");
        Self {
            role: Role::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: call_id.into(),
                name: name.into(),
                content: result.content(),
                is_error: result.is_error(),
            }],
        }
    }

    /// Concatenated text blocks, if any
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() { None } else { Some(texts.join("\n")) }
    }
}

/// A tool call requested by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Everything the planner sees for one round
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Fixed instructions for the planner
    pub system_prompt: String,

    /// Full transcript so far
    pub transcript: Vec<TranscriptEntry>,

    /// Tools the planner may call
    pub tools: Vec<ToolSpec>,
}

/// The planner's answer for one round
#[derive(Debug, Clone)]
pub struct PlanResponse {
    /// Text and tool-use blocks, in the order produced
    pub content: Vec<ContentBlock>,

    /// Why the planner stopped
    pub stop_reason: StopReason,

    /// Token usage, if the backend reports it
    pub usage: TokenUsage,
}

impl PlanResponse {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        let stop_reason = if content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. })) {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };

        Self {
            content,
            stop_reason,
            usage: TokenUsage::default(),
        }
    }

    /// Tool calls in the order issued
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCallRequest::new(id, name, input.clone())),
                _ => None,
            })
            .collect()
    }

    /// Non-blank text blocks joined with newlines
    pub fn final_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() { None } else { Some(texts.join("\n")) }
    }
}

/// Why the planner stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Parse from Anthropic API stop_reason string
    pub fn from_anthropic(s: &str) -> Self {
        debug!(%s, "StopReason::from_anthropic: called");
        match s {
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage for one planner call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use serde_json::json;

    #[test]
    fn test_user_entry() {
        let entry = TranscriptEntry::user("How does the calculator render?");
        assert_eq!(entry.role, Role::User);
        assert_eq!(entry.text().as_deref(), Some("How does the calculator render?"));
    }

    #[test]
    fn test_tool_result_entry() {
        let result = ToolResult::error(ToolErrorKind::NotAFile, "File not found");
        let entry = TranscriptEntry::tool_result("call_1", "get_file_content", &result);

        assert_eq!(entry.role, Role::Tool);
        match &entry.content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                name,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "call_1");
                assert_eq!(name, "get_file_content");
                assert_eq!(content, "Error: File not found");
                assert!(is_error);
            }
            other => panic!("Expected ToolResult block, got {:?}", other),
        }
        assert!(entry.text().is_none());
    }

    #[test]
    fn test_plan_response_splits_text_and_calls() {
        let response = PlanResponse::new(vec![
            ContentBlock::text("Let me look at the files."),
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "get_files_info".to_string(),
                input: json!({"directory": "."}),
            },
        ]);

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.final_text().as_deref(), Some("Let me look at the files."));
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_files_info");
        assert_eq!(calls[0].arguments["directory"], ".");
    }

    #[test]
    fn test_final_text_ignores_blank_blocks() {
        let response = PlanResponse::new(vec![ContentBlock::text("  \n"), ContentBlock::text("")]);

        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert!(response.final_text().is_none());
        assert!(response.tool_calls().is_empty());
    }

    #[test]
    fn test_stop_reason_from_anthropic() {
        assert_eq!(StopReason::from_anthropic("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_anthropic("tool_use"), StopReason::ToolUse);
        assert_eq!(StopReason::from_anthropic("max_tokens"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_anthropic("stop_sequence"), StopReason::StopSequence);
        assert_eq!(StopReason::from_anthropic("unknown"), StopReason::EndTurn);
    }

    #[test]
    fn test_content_block_serde_tag() {
        let block = ContentBlock::text("hi");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }
}
