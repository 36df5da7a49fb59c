/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which turns one
 * document and one target language into exactly one provider call and
 * decodes the structured answer.
 */

use anyhow::Result;
use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider, parse_endpoint_url};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils::{LanguageCode, get_language_name};
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{CompletionRequest, Provider, ResponseSchema};
use crate::translation::prompts::PromptTemplate;

/// Name of the single field of the structured answer
pub const MARKDOWN_FIELD: &str = "markdown";

/// Structured answer expected from the provider
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    markdown: String,
}

/// One translated document for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub language: LanguageCode,
    /// Full translated document, frontmatter included
    pub text: String,
}

/// Schema sent with every translation request
pub fn translation_schema() -> ResponseSchema {
    ResponseSchema::single_string_field("markdown", MARKDOWN_FIELD, "translated markdown")
}

/// Main translation service for markdown documents
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,
    model: String,
    source_language: LanguageCode,
    system_prompt: String,
    user_prompt: PromptTemplate,
    temperature: Option<f32>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: &TranslationConfig, source_language: &str) -> Result<Self> {
        let provider = build_provider(config)?;
        Ok(Self::with_provider(provider, config.get_model(), source_language)
            .with_prompts(&config.common.system_prompt, &config.common.user_prompt)
            .with_temperature(config.common.temperature))
    }

    /// Create a service around an existing provider with the default prompts
    pub fn with_provider(provider: Arc<dyn Provider>, model: impl Into<String>, source_language: &str) -> Self {
        Self {
            provider,
            model: model.into(),
            source_language: LanguageCode::new(source_language),
            system_prompt: PromptTemplate::MARKDOWN_TRANSLATOR.to_string(),
            user_prompt: PromptTemplate::default(),
            temperature: None,
        }
    }

    pub fn with_prompts(mut self, system_prompt: &str, user_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self.user_prompt = PromptTemplate::new(user_prompt);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn source_language(&self) -> &LanguageCode {
        &self.source_language
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Build the provider request for one document and one language
    pub fn build_request(&self, content: &str, target: &LanguageCode) -> Result<CompletionRequest, TranslationError> {
        let source_name = language_name(self.source_language.as_str())?;
        let target_name = language_name(target.as_str())?;

        Ok(CompletionRequest {
            model: self.model.clone(),
            system: self.system_prompt.clone(),
            prompt: self.user_prompt.render(&source_name, &target_name, content),
            schema: translation_schema(),
            temperature: self.temperature,
        })
    }

    /// Translate a full document into one language
    pub async fn translate(&self, content: &str, target: &LanguageCode) -> Result<TranslationResult, TranslationError> {
        let request = self.build_request(content, target)?;
        debug!("Translating {} chars into {}", content.len(), target);

        let response = self.provider.complete(request).await?;
        let text = decode_markdown(response.first())?;

        debug!("Received {} chars for {}", text.len(), target);
        Ok(TranslationResult {
            language: target.clone(),
            text,
        })
    }
}

fn language_name(code: &str) -> Result<String, TranslationError> {
    get_language_name(code).map_err(|_| TranslationError::UnknownLanguage(code.to_string()))
}

/// Decode the first choice of a structured answer
fn decode_markdown(choice: Option<&str>) -> Result<String, TranslationError> {
    let content = match choice {
        Some(content) if !content.trim().is_empty() => content,
        _ => return Err(TranslationError::EmptyResult),
    };

    let response: TranslateResponse =
        serde_json::from_str(content).map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

    if response.markdown.trim().is_empty() {
        return Err(TranslationError::EmptyTranslation);
    }
    Ok(response.markdown)
}

/// Instantiate the configured provider
pub fn build_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let endpoint = config.get_endpoint();
    let timeout = config.get_timeout_secs();
    let model = config.get_model();

    let provider: Arc<dyn Provider> = match config.provider {
        ConfigTranslationProvider::OpenAI => Arc::new(OpenAI::new(config.get_api_key(), endpoint, model, timeout)),
        ConfigTranslationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = match config.get_api_key() {
                key if key.is_empty() => "lm-studio".to_string(),
                key => key,
            };
            Arc::new(OpenAI::new(api_key, endpoint, model, timeout))
        }
        ConfigTranslationProvider::Ollama => {
            let url = parse_endpoint_url(&endpoint)?;
            Arc::new(Ollama::from_url(url.as_str(), model, timeout))
        }
    };
    Ok(provider)
}
