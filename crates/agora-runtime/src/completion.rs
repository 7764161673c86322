//! Anthropic Messages API client implementing [`CompletionService`]

use agora_core::completion::{CompletionRequest, CompletionService};
use agora_core::decision::Decision;
use agora_core::error::{CompletionError, CompletionResult, ConfigError};
use agora_core::tool::ToolDescriptor;
use agora_core::transcript::{ContentBlock, Turn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Read `ANTHROPIC_API_KEY`, `ANTHROPIC_API_BASE_URL`, `AGORA_MODEL` and
    /// `AGORA_MAX_TOKENS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| ConfigError::InvalidEnvVar {
            key: "ANTHROPIC_API_KEY".to_string(),
            message: "not set".to_string(),
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("ANTHROPIC_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("AGORA_MODEL") {
            config.model = model;
        }
        if let Ok(val) = std::env::var("AGORA_MAX_TOKENS") {
            config.max_tokens = val.parse().map_err(|e| ConfigError::InvalidEnvVar {
                key: "AGORA_MAX_TOKENS".to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            })?;
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDescriptor],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

fn no_tools(tools: &&[ToolDescriptor]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

/// Anthropic Claude client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(AnthropicConfig::from_env()?))
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> CompletionResult<Decision> {
        if self.config.api_key.is_empty() {
            return Err(CompletionError::NotConfigured(
                "ANTHROPIC_API_KEY is empty".to_string(),
            ));
        }

        let tools = request.tools.as_slice();
        let tool_choice = (request.force_tool_use && !tools.is_empty())
            .then(|| json!({"type": "any", "disable_parallel_tool_use": true}));
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: request.system_prompt,
            messages: request.transcript.turns(),
            tools,
            tool_choice,
        };

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed { status, body });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let content: Vec<ContentBlock> = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseBlock::Other => None,
            })
            .collect();

        if content.is_empty() {
            return Err(CompletionError::InvalidResponse(
                "response contained no text or tool_use blocks".to_string(),
            ));
        }

        debug!(
            blocks = content.len(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            "Completion received"
        );
        Ok(Decision::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::tool::ToolRegistry;
    use agora_core::transcript::Transcript;
    use agora_tools::builtin_registry;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new(AnthropicConfig::new("test-key").with_base_url(server.uri()))
    }

    fn transcript() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text("find me a loan offer"));
        transcript
    }

    #[tokio::test]
    async fn decodes_text_and_tool_use_and_drops_unknown_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "max_tokens": 8000,
                "tool_choice": {"type": "any", "disable_parallel_tool_use": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "Contacting the bank."},
                    {"type": "tool_use", "id": "toolu_1", "name": "calculator", "input": {"expression": "2+4"}}
                ],
                "stop_reason": "tool_use"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tools = builtin_registry(&Default::default());
        let transcript = transcript();
        let decision = client(&server)
            .complete(CompletionRequest {
                system_prompt: "You are a shopping assistant.",
                transcript: &transcript,
                tools: &tools,
                force_tool_use: true,
            })
            .await
            .unwrap();

        assert_eq!(decision.content.len(), 2);
        assert_eq!(decision.correlation_id(), Some("toolu_1"));
    }

    #[tokio::test]
    async fn tool_result_turn_sends_results_before_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Done."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut transcript = transcript();
        transcript.push(Turn::assistant(vec![
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "calculator".into(),
                input: json!({"expression": "60000/12"}),
            },
            ContentBlock::ToolUse {
                id: "toolu_2".into(),
                name: "notify_operator".into(),
                input: json!({"message": "EMI is 5000"}),
            },
        ]));
        transcript.push(Turn::tool_result(
            Some("toolu_1"),
            &["toolu_2"],
            "Output of 60000/12 is 5000.0",
        ));
        let tools = builtin_registry(&Default::default());
        client(&server)
            .complete(CompletionRequest {
                system_prompt: "",
                transcript: &transcript,
                tools: &tools,
                force_tool_use: true,
            })
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        let answer = &body["messages"][2];
        assert_eq!(answer["role"], "user");
        let kinds: Vec<&str> = answer["content"]
            .as_array()
            .unwrap()
            .iter()
            .map(|block| block["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["tool_result", "tool_result", "text"]);
        assert_eq!(answer["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(answer["content"][0]["content"], "Output of 60000/12 is 5000.0");
    }

    #[tokio::test]
    async fn http_error_is_a_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let tools = ToolRegistry::new();
        let transcript = transcript();
        let err = client(&server)
            .complete(CompletionRequest {
                system_prompt: "",
                transcript: &transcript,
                tools: &tools,
                force_tool_use: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::RequestFailed { status: 529, ref body } if body == "overloaded"));
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let tools = ToolRegistry::new();
        let transcript = transcript();
        let err = client(&server)
            .complete(CompletionRequest {
                system_prompt: "",
                transcript: &transcript,
                tools: &tools,
                force_tool_use: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }
}
