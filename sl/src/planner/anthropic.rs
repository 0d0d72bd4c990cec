//! Anthropic Messages API planner
//!
//! Translates the session transcript into Anthropic messages. Agent entries
//! become `assistant` turns; user and tool entries become `user` turns, and
//! adjacent entries with the same API role are merged because the API
//! requires roles to alternate.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    ContentBlock, PlanRequest, PlanResponse, Planner, PlannerError, Role, StopReason, TokenUsage, TranscriptEntry,
};
use crate::config::PlannerConfig;
use crate::tools::ToolSpec;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest server-requested rate-limit wait we honour before giving up
const MAX_RETRY_AFTER_SECS: u64 = 60;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Planner backed by Anthropic's Messages API
pub struct AnthropicPlanner {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicPlanner {
    /// Create a planner from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        debug!(model = %config.model, base_url = %config.base_url, "AnthropicPlanner::from_config: called");
        let api_key = config.get_api_key().map_err(|e| PlannerError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(PlannerError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, request: &PlanRequest) -> Value {
        debug!(%self.model, entries = request.transcript.len(), "build_request_body: called");
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system_prompt,
            "messages": convert_transcript(&request.transcript),
        });

        if !request.tools.is_empty() {
            body["tools"] = json!(request.tools.iter().map(tool_schema).collect::<Vec<_>>());
        }

        body
    }

    /// Parse the Anthropic API response
    fn parse_response(&self, api_response: AnthropicResponse) -> PlanResponse {
        debug!(?api_response.stop_reason, "parse_response: called");
        let content = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    debug!(%id, %name, "parse_response: ToolUse block");
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicContentBlock::Other => {
                    debug!("parse_response: skipping unsupported block");
                    None
                }
            })
            .collect();

        PlanResponse {
            content,
            stop_reason: api_response
                .stop_reason
                .as_deref()
                .map(StopReason::from_anthropic)
                .unwrap_or(StopReason::EndTurn),
            usage: TokenUsage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        }
    }
}

/// Anthropic tool definition for a registered tool
fn tool_schema(spec: &ToolSpec) -> Value {
    json!({
        "name": spec.name,
        "description": spec.description,
        "input_schema": spec.input_schema(),
    })
}

fn api_role(role: Role) -> &'static str {
    match role {
        Role::Agent => "assistant",
        Role::User | Role::Tool => "user",
    }
}

/// Convert transcript entries to Anthropic messages, merging same-role runs
fn convert_transcript(transcript: &[TranscriptEntry]) -> Vec<Value> {
    debug!(entry_count = %transcript.len(), "convert_transcript: called");
    let mut messages: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for entry in transcript {
        let role = api_role(entry.role);
        let blocks = entry.content.iter().map(convert_content_block);

        match messages.last_mut() {
            Some((last_role, content)) if *last_role == role => content.extend(blocks),
            _ => messages.push((role, blocks.collect())),
        }
    }

    messages
        .into_iter()
        .filter(|(_, content)| !content.is_empty())
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect()
}

/// Convert a ContentBlock to Anthropic API format
fn convert_content_block(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({
            "type": "text",
            "text": text,
        }),
        ContentBlock::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
            ..
        } => json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": is_error,
        }),
    }
}

#[async_trait]
impl Planner for AnthropicPlanner {
    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse, PlannerError> {
        debug!(%self.model, "AnthropicPlanner::plan: called");
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        let mut delay = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = delay
                    .take()
                    .unwrap_or_else(|| Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1)));
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, "plan: retrying after transient error");
                tokio::time::sleep(backoff).await;
            }

            let response = match self
                .http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "plan: network error");
                    last_error = Some(if e.is_timeout() {
                        PlannerError::Timeout(self.timeout)
                    } else {
                        PlannerError::Network(e)
                    });
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(MAX_RETRY_AFTER_SECS);
                debug!(retry_after, "plan: rate limited (429)");

                let err = PlannerError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                };
                if attempt == MAX_RETRIES || retry_after > MAX_RETRY_AFTER_SECS {
                    return Err(err);
                }
                delay = err.retry_after();
                last_error = Some(err);
                continue;
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "plan: retryable error");
                last_error = Some(PlannerError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "plan: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(PlannerError::ApiError { status, message: text });
            }

            debug!("plan: success");
            let api_response: AnthropicResponse = response.json().await?;
            return Ok(self.parse_response(api_response));
        }

        Err(last_error.unwrap_or_else(|| PlannerError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
