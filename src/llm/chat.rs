//! OpenAI-compatible chat completion client bound to one role.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RoleConfig;
use crate::error::LlmError;

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature override for this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate for this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new request; sampling parameters default to the role's.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that generated this response.
    pub model: String,
    /// Generated choices.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    pub usage: Usage,
}

impl ChatResponse {
    /// Content of the first choice, if available.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single generated choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Generated message.
    pub message: Message,
    /// Reason the generation stopped (e.g., "stop", "length").
    pub finish_reason: String,
}

/// Token usage statistics for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
    /// Number of tokens generated.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// Trait for models that can run a chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Runs the request and returns the completion.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Model identifier used for this client.
    fn model(&self) -> &str;
}

/// Chat client for one role's OpenAI-compatible endpoint.
///
/// The Debug output omits the credential.
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    default_temperature: Option<f64>,
    default_max_tokens: Option<u32>,
    http_client: Client,
}

impl ChatClient {
    /// Builds a client from a resolved role configuration.
    ///
    /// `timeout` applies to every call; the role's proxy is honored when
    /// set.
    pub fn from_role_config(config: &RoleConfig, timeout: Duration) -> Result<Self, LlmError> {
        let mut builder = Client::builder().timeout(timeout);

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| LlmError::RequestFailed(format!("Invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http_client = builder
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
            http_client,
        })
    }

    /// Base endpoint URL for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .finish_non_exhaustive()
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: Message,
    #[serde(default)]
    finish_reason: String,
}

/// Error response body from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let api_request = ApiRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature.or(self.default_temperature),
            max_tokens: request.max_tokens.or(self.default_max_tokens),
        };

        let url = format!("{}/chat/completions", self.base_url);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {e}")))?;

        Ok(ChatResponse {
            model: api_response.model,
            choices: api_response
                .choices
                .into_iter()
                .map(|c| Choice {
                    message: c.message,
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage: api_response.usage,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Role;

    fn role_config() -> RoleConfig {
        RoleConfig {
            role: Role::Plan,
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:4000/v1/".to_string(),
            model: "gpt-plan".to_string(),
            max_tokens: Some(2000),
            temperature: Some(0.2),
            proxy: None,
        }
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("a").role, "system");
        assert_eq!(Message::user("b").role, "user");
        assert_eq!(Message::assistant("c").role, "assistant");
    }

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new(vec![Message::user("hi")])
            .with_temperature(0.7)
            .with_max_tokens(512);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn test_client_from_role_config_trims_base_url() {
        let client =
            ChatClient::from_role_config(&role_config(), Duration::from_secs(5)).expect("client");
        assert_eq!(client.base_url(), "http://localhost:4000/v1");
        assert_eq!(client.model(), "gpt-plan");
    }

    #[test]
    fn test_invalid_proxy_is_an_error() {
        let mut config = role_config();
        config.proxy = Some("::not a proxy::".to_string());
        let err = ChatClient::from_role_config(&config, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed(_)));
    }

    #[test]
    fn test_api_request_serialization_skips_none() {
        let messages = vec![Message::user("test")];
        let request = ApiRequest {
            model: "gpt-plan",
            messages: &messages,
            temperature: Some(0.2),
            max_tokens: None,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"temperature\":0.2"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_first_content() {
        let response = ChatResponse {
            model: "gpt-plan".to_string(),
            choices: vec![Choice {
                message: Message::assistant("42"),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        };
        assert_eq!(response.first_content(), Some("42"));

        let empty = ChatResponse {
            model: "gpt-plan".to_string(),
            choices: vec![],
            usage: Usage::default(),
        };
        assert_eq!(empty.first_content(), None);
    }

    #[tokio::test]
    async fn test_chat_connection_error() {
        let mut config = role_config();
        config.base_url = "http://localhost:65535".to_string();
        let client =
            ChatClient::from_role_config(&config, Duration::from_millis(200)).expect("client");

        let result = client.chat(ChatRequest::new(vec![Message::user("hi")])).await;
        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
    }
}
