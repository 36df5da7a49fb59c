/*!
 * Tests for provider implementations
 */

use std::sync::Arc;

use yamtwai::errors::ProviderError;
use yamtwai::providers::mock::MockProvider;
use yamtwai::providers::openai::OpenAI;
use yamtwai::providers::{CompletionRequest, Provider, ResponseSchema};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o-mini".to_string(),
        system: "You translate markdown.".to_string(),
        prompt: "Translate this".to_string(),
        schema: ResponseSchema::single_string_field("markdown", "markdown", "translated markdown"),
        temperature: Some(0.3),
    }
}

#[tokio::test]
async fn test_mockProvider_behaviours_shouldMatchTheirNames() {
    let working = MockProvider::working();
    let response = working.complete(request()).await.unwrap();
    let answer: serde_json::Value = serde_json::from_str(response.first().unwrap()).unwrap();
    assert_eq!(answer["markdown"], "[TRANSLATED] Translate this");

    assert!(MockProvider::failing().complete(request()).await.is_err());
    assert!(MockProvider::failing().test_connection().await.is_err());
    assert!(MockProvider::no_choices().complete(request()).await.unwrap().choices.is_empty());
}

#[tokio::test]
async fn test_mockProvider_intermittent_shouldFailEveryNthRequest() {
    let provider = MockProvider::intermittent(3);
    let mut outcomes = Vec::new();
    for _ in 0..6 {
        outcomes.push(provider.complete(request()).await.is_ok());
    }
    assert_eq!(outcomes, vec![true, true, false, true, true, false]);
    assert_eq!(provider.request_count(), 6);
}

#[tokio::test]
async fn test_provider_asTraitObject_shouldBeShareable() {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::working());
    let clone = Arc::clone(&provider);

    let (a, b) = tokio::join!(provider.complete(request()), clone.complete(request()));
    assert!(a.is_ok() && b.is_ok());
}

#[tokio::test]
async fn test_openAI_withUnreachableEndpoint_shouldFailWithConnectionError() {
    let provider = OpenAI::new("sk-test", "http://127.0.0.1:9/v1", "gpt-4o-mini", 5);
    let result = provider.complete(request()).await;

    assert!(matches!(
        result,
        Err(ProviderError::ConnectionError(_)) | Err(ProviderError::RequestFailed(_))
    ));
}
