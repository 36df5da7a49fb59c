use anyhow::{Result, anyhow};
use isolang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language utilities for target/source language codes
///
/// Codes are kept exactly as configured because they are substituted into
/// output paths (`{language}`) and matched against directory segments.
/// Display names for prompts are resolved through ISO 639.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// English display name of the language, e.g. `ko` -> `Korean`
    pub fn name(&self) -> Result<String> {
        get_language_name(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// Site generators commonly use `cn` for Chinese content directories.
fn canonical_code(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let primary = normalized
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string();
    match primary.as_str() {
        "cn" => "zh".to_string(),
        _ => primary,
    }
}

fn lookup(code: &str) -> Option<Language> {
    let canonical = canonical_code(code);
    match canonical.len() {
        2 => Language::from_639_1(&canonical),
        3 => Language::from_639_3(&canonical),
        _ => None,
    }
}

/// Validate that a code maps to a known ISO 639-1 or ISO 639-3 language
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}
