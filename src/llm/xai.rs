use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
const DEFAULT_MODEL: &str = "grok-4";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug)]
pub struct XaiClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub timeout: Duration,
}

impl Default for XaiClientConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("XAI_API_KEY").ok(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: std::env::var("XAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            default_temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl XaiClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("XAI_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(temp) = std::env::var("XAI_TEMPERATURE") {
            if let Ok(parsed) = temp.parse::<f32>() {
                cfg.default_temperature = parsed;
            }
        }
        if let Ok(timeout) = std::env::var("XAI_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

#[derive(Clone)]
pub struct XaiClient {
    http: HttpClient,
    cfg: XaiClientConfig,
}

impl XaiClient {
    pub fn new(cfg: XaiClientConfig) -> Result<Self, XaiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(XaiError::http)?;
        Ok(Self { http, cfg })
    }

    fn resolve_api_key(&self) -> Result<String, XaiError> {
        if let Some(key) = &self.cfg.api_key {
            return Ok(key.clone());
        }
        std::env::var("XAI_API_KEY").map_err(|_| XaiError::MissingApiKey)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        )
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiChatCompletionRequest {
        ApiChatCompletionRequest {
            model: req
                .model
                .clone()
                .unwrap_or_else(|| self.cfg.default_model.clone()),
            temperature: req.temperature.unwrap_or(self.cfg.default_temperature),
            max_tokens: req.max_tokens,
            messages: req
                .messages
                .iter()
                .map(|m| ApiChatMessage {
                    role: m.role.as_api_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, XaiError>;
}

#[async_trait]
impl LlmClient for XaiClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, XaiError> {
        if request.messages.is_empty() {
            return Err(XaiError::EmptyMessages);
        }

        let api_key = self.resolve_api_key()?;
        let api_request = self.build_api_request(&request);
        let endpoint = self.endpoint();

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(XaiError::http)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(XaiError::http)?;

        if !status.is_success() {
            let api_err = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .ok()
                .map(|env| env.error);
            return Err(XaiError::Api {
                status,
                error: api_err.unwrap_or_default(),
            });
        }

        let parsed: ApiChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(XaiError::Decode)?;

        let content = parsed
            .choices
            .iter()
            .find_map(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(ChatCompletionResponse {
            content,
            usage: parsed.usage.map(|usage| UsageMetrics {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn as_api_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug)]
pub enum XaiError {
    MissingApiKey,
    EmptyMessages,
    Http(reqwest::Error),
    Timeout,
    Api {
        status: StatusCode,
        error: ApiErrorBody,
    },
    MockQueueEmpty,
    Decode(serde_json::Error),
}

impl XaiError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            XaiError::Timeout
        } else {
            XaiError::Http(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            XaiError::Timeout => true,
            XaiError::Http(_) => true,
            XaiError::Api { status, .. } => status.is_server_error(),
            XaiError::MissingApiKey
            | XaiError::EmptyMessages
            | XaiError::MockQueueEmpty
            | XaiError::Decode(_) => false,
        }
    }
}

impl std::fmt::Display for XaiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XaiError::MissingApiKey => write!(f, "XAI_API_KEY is not set"),
            XaiError::EmptyMessages => {
                write!(f, "chat completion requires at least one message")
            }
            XaiError::Http(err) => write!(f, "http error: {err}"),
            XaiError::Timeout => write!(f, "request timed out"),
            XaiError::Api { status, error } => {
                write!(f, "api error {status}: {}", error.message)
            }
            XaiError::MockQueueEmpty => {
                write!(f, "mock client response queue is empty")
            }
            XaiError::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl std::error::Error for XaiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XaiError::Http(err) => Some(err),
            XaiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self {
            message: "unknown error".to_string(),
            r#type: None,
            code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

/// Test double: pops queued responses and records every request it saw.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, XaiError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<ChatCompletionResponse, XaiError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, XaiError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(XaiError::MockQueueEmpty))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    choices: Vec<ApiChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: None,
            messages: vec![
                ChatMessage::new(ChatRole::System, "You are a helpful assistant."),
                ChatMessage::new(ChatRole::User, "Rewrite this text for clarity: hello"),
            ],
            max_tokens: Some(256),
            temperature: Some(0.3),
        }
    }

    #[test]
    fn build_request_serializes_messages() {
        let client = XaiClient::new(XaiClientConfig {
            api_key: Some("test".into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "grok-4".into(),
            default_temperature: 0.7,
            timeout: Duration::from_secs(30),
        })
        .unwrap();

        let request = sample_request();
        let api_request = client.build_api_request(&request);
        let value = serde_json::to_value(&api_request).unwrap();

        assert_eq!(value["model"], "grok-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(
            value["messages"][1]["content"],
            "Rewrite this text for clarity: hello"
        );
        assert_eq!(value["temperature"], 0.3);
        assert_eq!(value["max_tokens"], 256);
    }

    #[test]
    fn build_request_falls_back_to_config_defaults() {
        let client = XaiClient::new(XaiClientConfig {
            api_key: Some("test".into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "grok-4".into(),
            default_temperature: 0.7,
            timeout: Duration::from_secs(30),
        })
        .unwrap();

        let request = ChatCompletionRequest {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::User, "hi")],
            max_tokens: None,
            temperature: None,
        };
        let value = serde_json::to_value(&client.build_api_request(&request)).unwrap();

        assert_eq!(value["model"], "grok-4");
        assert_eq!(value["temperature"], 0.7);
        assert!(value.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn mock_client_returns_enqueued_response() {
        let mock = MockClient::new();
        let response = ChatCompletionResponse {
            content: "hi".into(),
            usage: None,
        };
        mock.push_response(Ok(response.clone()));

        let req = sample_request();
        let out = mock.chat_completion(req.clone()).await.unwrap();

        assert_eq!(out.content, "hi");
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.calls()[0], req);
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = XaiError::Api {
            status: StatusCode::BAD_REQUEST,
            error: ApiErrorBody {
                message: "bad request".into(),
                r#type: Some("invalid_request_error".into()),
                code: None,
            },
        };

        assert_eq!(format!("{err}"), "api error 400 Bad Request: bad request");
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = XaiError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error: ApiErrorBody::default(),
        };
        assert!(err.is_retryable());
        assert!(XaiError::Timeout.is_retryable());
        assert!(!XaiError::MissingApiKey.is_retryable());
    }
}
