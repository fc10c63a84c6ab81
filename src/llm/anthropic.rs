//! Anthropic Messages API adapter.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::{ContentBlock, InferenceRequest, LlmProvider, Message};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Client for `POST /v1/messages`.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_body(&self, request: &InferenceRequest) -> Result<Value, LlmError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": serde_json::to_value(&request.messages)?,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(&request.tools)?;
        }
        Ok(body)
    }

    async fn send(&self, body: Value) -> Result<Message, LlmError> {
        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), retry_after, body_text));
        }

        let text = resp.text().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        parse_response(&text)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: InferenceRequest,
        cancel: &CancellationToken,
    ) -> Result<Message, LlmError> {
        let body = self.build_body(&request)?;
        tracing::debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending inference request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            result = self.send(body) => result,
        }
    }
}

fn status_error(status: u16, retry_after: Option<Duration>, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {}: {}", status, body),
        },
    }
}

#[derive(Deserialize)]
struct WireResponse {
    content: Vec<WireBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Decode a Messages API response body into a model message.
fn parse_response(body: &str) -> Result<Message, LlmError> {
    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!(stop_reason = ?wire.stop_reason, blocks = wire.content.len(), "Inference response");

    let content = wire
        .content
        .into_iter()
        .filter_map(|block| match block {
            WireBlock::Text { text } => Some(ContentBlock::Text { text }),
            WireBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse { id, name, input }),
            WireBlock::Other => None,
        })
        .collect();

    Ok(Message::model(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolDefinition};

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(&LlmConfig {
            api_key: SecretString::from("sk-ant-test"),
            model: "claude-3-7-sonnet-latest".to_string(),
            max_tokens: 1024,
            base_url: "https://api.anthropic.com/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_build_body() {
        let request = InferenceRequest {
            system: Some("You are a coding assistant.".into()),
            messages: vec![Message::user("list the files")],
            tools: vec![ToolDefinition {
                name: "list_files".into(),
                description: "List files".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }],
        };
        let body = provider().build_body(&request).unwrap();

        assert_eq!(body["model"], "claude-3-7-sonnet-latest");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "You are a coding assistant.");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], "list the files");
        assert_eq!(body["tools"][0]["name"], "list_files");
        assert!(body["tools"][0]["input_schema"].is_object());
    }

    #[test]
    fn test_build_body_omits_empty_fields() {
        let request = InferenceRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let body = provider().build_body(&request).unwrap();
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(provider().base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_parse_response_with_tool_use() {
        let body = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Reading it now."},
                {"type": "tool_use", "id": "toolu_01", "name": "read_file", "input": {"path": "go.mod"}}
            ],
            "stop_reason": "tool_use"
        }"#;
        let message = parse_response(body).unwrap();
        assert_eq!(message.role, Role::Model);
        assert_eq!(message.content.len(), 2);
        let (id, name, input) = message.tool_uses().next().unwrap();
        assert_eq!(id, "toolu_01");
        assert_eq!(name, "read_file");
        assert_eq!(input["path"], "go.mod");
    }

    #[test]
    fn test_parse_response_skips_unknown_blocks() {
        let body = r#"{
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "abc"},
                {"type": "text", "text": "Done."}
            ],
            "stop_reason": "end_turn"
        }"#;
        let message = parse_response(body).unwrap();
        assert_eq!(message.content, vec![ContentBlock::text("Done.")]);
    }

    #[test]
    fn test_parse_response_invalid_json() {
        let err = parse_response("not json").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(
            status_error(401, None, String::new()),
            LlmError::AuthFailed { .. }
        ));
        match status_error(429, Some(Duration::from_secs(30)), String::new()) {
            LlmError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let err = status_error(500, None, "overloaded".into());
        assert!(err.to_string().contains("HTTP 500: overloaded"));
    }

    #[tokio::test]
    async fn test_complete_honours_cancellation() {
        let provider = provider();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider
            .complete(
                InferenceRequest {
                    messages: vec![Message::user("hi")],
                    ..Default::default()
                },
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}
