/*!
 * Provider implementations for language-generation services.
 *
 * This module contains client implementations for:
 * - OpenAI: chat completions with a JSON schema response format. LM Studio
 *   exposes the same API and reuses this client.
 * - Ollama: local LLM server, schema passed as the `format` field
 * - Mock: scripted behaviours for tests
 */

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Structured-output schema attached to a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    /// Schema name, sent to services that require one
    pub name: String,
    pub description: String,
    /// JSON schema of the expected object
    pub schema: Value,
}

impl ResponseSchema {
    /// One required string field, no additional properties
    pub fn single_string_field(name: &str, field: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    field: {
                        "type": "string",
                        "description": description,
                    }
                },
                "required": [field],
                "additionalProperties": false,
            }),
        }
    }
}

/// Provider-independent completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// System instruction
    pub system: String,
    /// User prompt
    pub prompt: String,
    pub schema: ResponseSchema,
    pub temperature: Option<f32>,
}

/// Provider-independent completion response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Raw text of every returned choice, in order
    pub choices: Vec<String>,
}

impl CompletionResponse {
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            choices: vec![text.into()],
        }
    }

    /// Text of the first choice
    pub fn first(&self) -> Option<&str> {
        self.choices.first().map(String::as_str)
    }
}

/// Common trait for all LLM providers
///
/// Providers are shared between concurrent translation units, so the trait
/// is object safe and implementations are `Send + Sync`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Shorten a service response body for error messages
pub(crate) fn truncate_for_log(text: &str) -> String {
    if text.chars().count() > 500 {
        text.chars().take(500).collect()
    } else {
        text.to_string()
    }
}

pub mod mock;
pub mod ollama;
pub mod openai;
