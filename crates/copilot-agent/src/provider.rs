//! Language-model provider: the Anthropic Messages API.

use async_trait::async_trait;
use flareconf::ModelConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::tools::ToolDefinition;
use crate::types::{ContentBlock, Message};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("model API key is not configured")]
    MissingApiKey,
}

/// Why the model stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

/// One model call's inputs, borrowed from the orchestrator.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub tools: &'a [ToolDefinition],
    pub messages: &'a [Message],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            content: vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        }
    }

    /// Text blocks joined line by line, empty if there are none.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_tool_uses(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// The turn ends unless the model stopped to use tools and actually asked for one.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == Some(StopReason::ToolUse) && self.has_tool_uses()
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError>;
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    tools: &'a [ToolDefinition],
    messages: &'a [Message],
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn from_config(config: &ModelConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for AnthropicProvider {
    #[instrument(
        skip(self, request),
        fields(
            model = %self.model,
            messages = request.messages.len(),
            stop_reason = tracing::field::Empty,
        )
    )]
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError> {
        let body = MessagesBody {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: request.system,
            tools: request.tools,
            messages: request.messages,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ModelResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;

        tracing::Span::current().record("stop_reason", tracing::field::debug(&parsed.stop_reason));
        debug!(blocks = parsed.content.len(), "model responded");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::from_config(&ModelConfig {
            api_key: Some("sk-test".to_string()),
            base_url: format!("{}/", server.uri()),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_sends_messages_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "system": "be brief",
                "messages": [{ "role": "user", "content": "price of btc?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-test",
                "content": [
                    { "type": "text", "text": "Let me check." },
                    { "type": "tool_use", "id": "toolu_1", "name": "get_flare_price", "input": { "symbol": "BTC" } }
                ],
                "stop_reason": "tool_use",
                "usage": { "input_tokens": 10, "output_tokens": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = vec![Message::user("price of btc?")];
        let response = provider(&server)
            .complete(ModelRequest {
                system: "be brief",
                tools: registry(),
                messages: &messages,
            })
            .await
            .unwrap();

        assert!(response.wants_tools());
        assert_eq!(response.text_content(), "Let me check.");
        assert_eq!(response.model.as_deref(), Some("claude-test"));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["tools"].as_array().unwrap().len(), 6);
        assert_eq!(body["max_tokens"], 4096);
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(ModelRequest {
                system: "",
                tools: &[],
                messages: &[],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Status { status: 529, ref body } if body == "overloaded"));
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            AnthropicProvider::from_config(&ModelConfig::default()),
            Err(ProviderError::MissingApiKey)
        ));
    }

    #[test]
    fn test_unknown_stop_reason_and_blocks_tolerated() {
        let response: ModelResponse = serde_json::from_value(json!({
            "content": [
                { "type": "thinking", "thinking": "hmm", "signature": "x" },
                { "type": "text", "text": "a" },
                { "type": "text", "text": "b" }
            ],
            "stop_reason": "pause_turn"
        }))
        .unwrap();

        assert_eq!(response.stop_reason, Some(StopReason::Other));
        assert_eq!(response.text_content(), "a\nb");
        assert!(!response.wants_tools());
    }

    #[test]
    fn test_text_blocks_keep_line_breaks() {
        let response = ModelResponse {
            content: vec![ContentBlock::text("Line one."), ContentBlock::text("Line two.")],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        };
        assert_eq!(response.text_content(), "Line one.\nLine two.");
    }

    #[test]
    fn test_tool_use_stop_without_blocks_is_terminal() {
        let response = ModelResponse {
            content: vec![ContentBlock::text("done")],
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        };
        assert!(!response.wants_tools());
    }
}
