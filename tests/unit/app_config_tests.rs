/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use yamtwai::app_config::{Config, LogLevel, TranslationProvider};

use crate::common;

fn valid_config() -> Config {
    let mut config = Config::default();
    config
        .translation
        .set_api_key_if_empty(&TranslationProvider::OpenAI, "sk-test");
    config
}

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_languages, vec!["fr".to_string()]);
    assert_eq!(config.target_path_rule, "{origin}/{fileName}.{language}.md");
    assert!(config.use_translated_marker);
    assert!(!config.retranslate);
    assert!(config.history_path.is_none());
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(config.translation.optimal_concurrent_requests(), 4);
    assert_eq!(config.translation.get_timeout_secs(), 120);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_validate_withOllama_shouldAcceptAnyModelWithoutKey() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config.translation.set_model("qwen2.5:14b");
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withBadTemplateOrGlob_shouldFail() {
    let mut config = valid_config();
    config.target_path_rule = "{origin}/{fileName}.md".to_string();
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.ignore_rules = vec!["drafts/[".to_string()];
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.translation.common.user_prompt = "Translate into {target_language}".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "ko",
            "target_languages": ["en", "ja"],
            "content_dir": "~/blog/content",
            "history_path": "~/.yamtwai/history",
            "translation": {
                "provider": "ollama",
                "available_providers": [{ "type": "ollama", "model": "llama3.1" }]
            }
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_languages, vec!["en".to_string(), "ja".to_string()]);
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert!(config.use_translated_marker);
    if let Some(home) = dirs::home_dir() {
        assert_eq!(config.content_path(), home.join("blog/content"));
    }
    assert!(config.history_file().is_some());
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_providerParsing_shouldAcceptKnownNames() {
    assert_eq!("openai".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("Ollama".parse::<TranslationProvider>().unwrap(), TranslationProvider::Ollama);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("anthropic".parse::<TranslationProvider>().is_err());
}
