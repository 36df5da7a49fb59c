use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use url::Url;

use crate::discovery::IgnoreRules;
use crate::file_utils::FileManager;
use crate::language_utils::validate_language_code;
use crate::target_path::{DEFAULT_TARGET_PATH_RULE, TargetPathRule};
use crate::translation::PromptTemplate;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language of the source documents
    pub source_language: String,

    /// Languages to translate into, in output order
    pub target_languages: Vec<String>,

    /// Root of the markdown tree
    pub content_dir: String,

    /// Double-star globs on paths relative to `content_dir`
    #[serde(default)]
    pub ignore_rules: Vec<String>,

    /// Output path template
    #[serde(default = "default_target_path_rule")]
    pub target_path_rule: String,

    /// Ledger of produced paths, disabled when absent
    #[serde(default)]
    pub history_path: Option<String>,

    /// Honour the `translated: true` frontmatter marker
    #[serde(default = "default_true")]
    pub use_translated_marker: bool,

    /// Translate everything again and rewrite the ledger
    #[serde(default)]
    pub retranslate: bool,

    /// Stop the whole run at the first failed document
    #[serde(default)]
    pub fail_fast: bool,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests per document
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Models accepted for this provider, empty accepts any
    #[serde(default)]
    pub allowed_models: Vec<String>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            allowed_models: default_allowed_models(&provider_type),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System instruction sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// User prompt template
    /// Placeholders: {source_language}, {target_language}, {source}
    #[serde(default = "default_user_prompt")]
    pub user_prompt: String,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            user_prompt: default_user_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Environment variable overriding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Bounds for per-document concurrency
pub const MIN_CONCURRENT_REQUESTS: usize = 1;
pub const MAX_CONCURRENT_REQUESTS: usize = 32;

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_target_path_rule() -> String {
    DEFAULT_TARGET_PATH_RULE.to_string()
}

fn default_endpoint(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        TranslationProvider::Ollama => "http://localhost:11434".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        TranslationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => "gpt-4o-mini".to_string(),
        TranslationProvider::Ollama => "llama3.1".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        TranslationProvider::LMStudio => "local-model".to_string(),
    }
}

// Structured outputs with json_schema need a recent model
fn default_allowed_models(provider: &TranslationProvider) -> Vec<String> {
    match provider {
        TranslationProvider::OpenAI => ["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini", "gpt-4.1-nano"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn default_system_prompt() -> String {
    PromptTemplate::MARKDOWN_TRANSLATOR.to_string()
}

fn default_user_prompt() -> String {
    PromptTemplate::TRANSLATE_DOCUMENT.to_string()
}

impl Config {
    /// Load the configuration from a JSON file. A missing file is created
    /// with default values.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, creating one with default values", path);
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = FileManager::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        FileManager::write_to_file(path, &content)
    }

    /// Take secrets from the environment when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            self.translation.set_api_key_if_empty(&TranslationProvider::OpenAI, &key);
        }
    }

    /// Content root with `~` expanded
    pub fn content_path(&self) -> PathBuf {
        FileManager::expand_home(&self.content_dir)
    }

    /// Ledger file with `~` expanded
    pub fn history_file(&self) -> Option<PathBuf> {
        self.history_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(FileManager::expand_home)
    }

    pub fn target_rule(&self) -> TargetPathRule {
        TargetPathRule::new(&self.target_path_rule)
    }

    /// Translate the markdown files of one directory. Outputs are written
    /// next to their source so the next walk of that directory sees them.
    pub fn use_single_directory(&mut self, dir: &str) {
        self.content_dir = dir.to_string();
        self.target_path_rule = default_target_path_rule();
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        validate_language_code(&self.source_language)
            .with_context(|| format!("Invalid source language '{}'", self.source_language))?;

        if self.target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for (i, language) in self.target_languages.iter().enumerate() {
            validate_language_code(language)
                .with_context(|| format!("Invalid target language '{}'", language))?;
            if self.target_languages[..i].contains(language) {
                return Err(anyhow!("Target language '{}' is listed twice", language));
            }
        }

        if self.content_dir.trim().is_empty() {
            return Err(anyhow!("content_dir is required"));
        }

        // Without marker and ledger every run would translate its own outputs again
        if !self.use_translated_marker && self.history_file().is_none() {
            return Err(anyhow!(
                "use_translated_marker can only be disabled when history_path is set"
            ));
        }

        self.target_rule().validate()?;
        PromptTemplate::new(&self.translation.common.user_prompt).validate()?;
        IgnoreRules::new(&self.ignore_rules)?;

        let temperature = self.translation.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        self.translation.validate()
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_languages: vec!["fr".to_string()],
            content_dir: "content".to_string(),
            ignore_rules: Vec::new(),
            target_path_rule: default_target_path_rule(),
            history_path: None,
            use_translated_marker: true,
            retranslate: false,
            fail_fast: false,
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Concurrency bound for the languages of one document
    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    fn get_provider_config_mut(&mut self, provider_type: &TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let position = self.available_providers.iter().position(|p| p.provider_type == provider_str);
        let index = match position {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.model.is_empty() => config.model.clone(),
            _ => default_model(&self.provider),
        }
    }

    /// Override the model of the active provider
    pub fn set_model(&mut self, model: &str) {
        let provider = self.provider.clone();
        self.get_provider_config_mut(&provider).model = model.to_string();
    }

    /// Override the API key of the active provider
    pub fn set_api_key(&mut self, key: &str) {
        let provider = self.provider.clone();
        self.get_provider_config_mut(&provider).api_key = key.to_string();
    }

    /// Fill the API key of a provider unless one is already configured
    pub fn set_api_key_if_empty(&mut self, provider: &TranslationProvider, key: &str) {
        let config = self.get_provider_config_mut(provider);
        if config.api_key.is_empty() {
            config.api_key = key.to_string();
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.endpoint.is_empty() => config.endpoint.clone(),
            _ => default_endpoint(&self.provider),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Models accepted by the active provider, empty means any
    pub fn get_allowed_models(&self) -> Vec<String> {
        match self.get_active_provider_config() {
            Some(config) => config.allowed_models.clone(),
            None => default_allowed_models(&self.provider),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.provider == TranslationProvider::OpenAI && self.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for OpenAI provider (set it in the config or {})",
                OPENAI_API_KEY_ENV
            ));
        }

        let concurrency = self.optimal_concurrent_requests();
        if !(MIN_CONCURRENT_REQUESTS..=MAX_CONCURRENT_REQUESTS).contains(&concurrency) {
            return Err(anyhow!(
                "concurrent_requests must be between {} and {}, got {}",
                MIN_CONCURRENT_REQUESTS,
                MAX_CONCURRENT_REQUESTS,
                concurrency
            ));
        }

        parse_endpoint_url(&self.get_endpoint())?;

        let model = self.get_model();
        let allowed = self.get_allowed_models();
        if !allowed.is_empty() && !allowed.contains(&model) {
            return Err(anyhow!(
                "Model '{}' is not allowed for {} (allowed: {})",
                model,
                self.provider.display_name(),
                allowed.join(", ")
            ));
        }

        Ok(())
    }
}

/// Parse an endpoint, assuming `http://` when no scheme is given
pub fn parse_endpoint_url(endpoint: &str) -> Result<Url> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)
    } else {
        Url::parse(&format!("http://{}", endpoint))
    }
    .with_context(|| format!("Invalid endpoint: {}", endpoint))?;

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }
    Ok(url)
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
