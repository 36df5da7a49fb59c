use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider, truncate_for_log};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model used by `test_connection`
    model: String,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// `"json"` or a JSON schema the answer must follow
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: None,
            format: None,
            stream: Some(false),
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Limit the number of generated tokens
    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }

    /// Set the structured output format
    pub fn format(mut self, format: serde_json::Value) -> Self {
        self.format = Some(format);
        self
    }
}

impl From<CompletionRequest> for ChatRequest {
    fn from(request: CompletionRequest) -> Self {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: request.system,
            },
            ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            },
        ];
        let mut chat = Self::new(request.model, messages).format(request.schema.schema);
        if let Some(temperature) = request.temperature {
            chat = chat.temperature(temperature);
        }
        chat
    }
}

/// Add a scheme and a port to a bare host
fn build_base_url(host: &str, port: u16) -> String {
    match host.split_once("://") {
        Some((scheme, host_part)) if !host_part.is_empty() => {
            // Already has a port
            if host_part.contains(':') {
                host.trim_end_matches('/').to_string()
            } else {
                format!("{}://{}:{}", scheme, host_part.trim_end_matches('/'), port)
            }
        }
        Some(_) => format!("http://localhost:{}", port),
        None => format!("http://{}:{}", host, port),
    }
}

impl Ollama {
    /// Create a new Ollama client for a host and port
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self::from_url(build_base_url(&host.into(), port), model, timeout_secs)
    }

    /// Create a new Ollama client from a complete URL
    pub fn from_url(url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama uses HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat with the Ollama API
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending chat request to {} (model {})", url, request.model);

        let response = self.client.post(&url).json(request).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::ConnectionError(format!("Failed to reach Ollama at {}: {}", self.base_url, e))
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, truncate_for_log(&error_text));
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        parse_chat_response(&response_text)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a chat answer. A streamed (JSONL) answer is accepted too: the
/// message pieces of every line are concatenated.
fn parse_chat_response(response_text: &str) -> Result<ChatResponse, ProviderError> {
    let parse_error = match serde_json::from_str::<ChatResponse>(response_text) {
        Ok(chat_response) => return Ok(chat_response),
        Err(e) => e,
    };

    debug!(
        "Ollama chat response is not a single object ({}), trying JSONL: {}",
        parse_error,
        truncate_for_log(response_text)
    );

    let lines: Vec<serde_json::Value> = response_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    if lines.is_empty() {
        return Err(ProviderError::ParseError(format!(
            "Failed to parse Ollama API chat response: {}",
            parse_error
        )));
    }

    let content: String = lines
        .iter()
        .filter_map(|value| value.get("message")?.get("content")?.as_str())
        .collect();
    let model = lines
        .iter()
        .rev()
        .find_map(|value| value.get("model")?.as_str())
        .unwrap_or("unknown")
        .to_string();
    let done = lines
        .iter()
        .any(|value| value.get("done").and_then(|v| v.as_bool()).unwrap_or(false));

    Ok(ChatResponse {
        model,
        message: ChatMessage {
            role: "assistant".to_string(),
            content,
        },
        done,
    })
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let response = self.chat(&ChatRequest::from(request)).await?;
        Ok(CompletionResponse::single(response.message.content))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);

        let request = ChatRequest::new(
            &self.model,
            vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
        )
        .num_predict(10);
        self.chat(&request).await.map(|_| ())
    }
}
