/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a structured answer
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::empty()` - Answers with an empty `markdown` field
 * - `MockProvider::no_choices()` - Answers without any choice
 * - `MockProvider::slow(ms)` - Succeeds after a delay
 */

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation wrapped in the response schema
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns a structured answer with an empty `markdown` field
    Empty,
    /// Returns a response without choices
    NoChoices,
    /// Returns text that is not the expected JSON object
    Malformed,
    /// Simulates slow response, then succeeds
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom markdown generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
    /// Prompt fragment that makes a request fail regardless of behavior
    fail_when_prompt_contains: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            fail_when_prompt_contains: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns an empty `markdown` field
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that returns no choices
    pub fn no_choices() -> Self {
        Self::new(MockBehavior::NoChoices)
    }

    /// Create a mock that returns unstructured text
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom markdown generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Fail every request whose prompt contains `fragment`
    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_when_prompt_contains = Some(fragment.into());
        self
    }

    /// Number of requests received so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Shared counter handle, usable after the provider is moved
    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Wrap markdown the way a schema-following service answers
    pub fn structured_answer(markdown: &str) -> String {
        json!({ "markdown": markdown }).to_string()
    }

    fn markdown_for(&self, request: &CompletionRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[TRANSLATED] {}", request.prompt),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            fail_when_prompt_contains: self.fail_when_prompt_contains.clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        if let Some(fragment) = &self.fail_when_prompt_contains {
            if request.prompt.contains(fragment.as_str()) {
                return Err(ProviderError::ApiError {
                    message: format!("Simulated failure for prompt containing '{}'", fragment),
                    status_code: 500,
                });
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(CompletionResponse::single(Self::structured_answer(
                &self.markdown_for(&request),
            ))),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(CompletionResponse::single(Self::structured_answer(
                        &self.markdown_for(&request),
                    )))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(CompletionResponse::single(Self::structured_answer(""))),

            MockBehavior::NoChoices => Ok(CompletionResponse::default()),

            MockBehavior::Malformed => Ok(CompletionResponse::single("Sure! Here is your translation.")),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(CompletionResponse::single(Self::structured_answer(
                    &self.markdown_for(&request),
                )))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
