/*!
 * Common test utilities for the yamtwai test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use yamtwai::app_config::{Config, TranslationProvider};
use yamtwai::providers::CompletionRequest;
use yamtwai::providers::mock::MockProvider;
use yamtwai::translation::TranslationService;

/// Route library logs to the test output, once per process
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, parent directories included
pub fn create_test_file(dir: &Path, relative_path: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative_path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A Korean post with a title and a body
pub fn sample_post(title: &str) -> String {
    format!("---\ntitle: {}\ndate: 2024-05-01\ndraft: false\n---\n# {}\n\n본문입니다.\n", title, title)
}

/// Mock answer that returns the document embedded in the prompt unchanged
pub fn echo_source(request: &CompletionRequest) -> String {
    let prompt = request.prompt.as_str();
    let start = prompt.find("\"\"\"\n").map(|i| i + 4).unwrap_or(0);
    let end = prompt.rfind("\n\"\"\"").unwrap_or(prompt.len()).max(start);
    prompt[start..end].to_string()
}

/// Valid configuration for a content tree, translating Korean sources
pub fn test_config(content_dir: &Path, targets: &[&str]) -> Config {
    let mut config = Config::default();
    config.source_language = "ko".to_string();
    config.target_languages = targets.iter().map(|t| t.to_string()).collect();
    config.content_dir = content_dir.to_string_lossy().to_string();
    config
        .translation
        .set_api_key_if_empty(&TranslationProvider::OpenAI, "test-api-key");
    config
}

/// Translation service backed by the given mock, Korean sources
pub fn mock_service(provider: MockProvider) -> TranslationService {
    TranslationService::with_provider(Arc::new(provider), "mock-model", "ko")
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e))
}
