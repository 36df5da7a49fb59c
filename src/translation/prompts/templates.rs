/*!
 * Prompt templates for markdown translation.
 *
 * The system instruction is sent as-is. The user prompt is a template with
 * three placeholders: `{source_language}` and `{target_language}` receive
 * language display names, `{source}` receives the full document.
 */

use anyhow::{Result, anyhow};

pub const SOURCE_LANGUAGE_PLACEHOLDER: &str = "{source_language}";
pub const TARGET_LANGUAGE_PLACEHOLDER: &str = "{target_language}";
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// User prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Default system instruction
    pub const MARKDOWN_TRANSLATOR: &'static str = r#"You are a professional translator of technical blogs and documentation written in markdown.

- Keep the markdown structure exactly as it is: headings, lists, tables, links, images and HTML tags.
- Never translate code blocks, inline code, URLs, file paths or shortcodes such as {{< ref "..." >}}.
- Keep the frontmatter block between the --- lines. Translate only the value of the title field and leave every other field unchanged.
- Answer with a JSON object whose markdown field holds the complete translated document and nothing else."#;

    /// Default user prompt
    pub const TRANSLATE_DOCUMENT: &'static str = r#"Translate the document below from {source_language} into {target_language}.

Translate:
- the title field of the frontmatter (do not put ":" in the translated title)
- the markdown content

## Source language
{source_language}

## Target language
{target_language}

## Document
"""
{source}
""""#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default document translation template.
    pub fn translate_document() -> Self {
        Self::new(Self::TRANSLATE_DOCUMENT)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// A template without `{source}` would never send the document
    pub fn validate(&self) -> Result<()> {
        if !self.template.contains(SOURCE_PLACEHOLDER) {
            return Err(anyhow!("User prompt must contain the {} placeholder", SOURCE_PLACEHOLDER));
        }
        Ok(())
    }

    /// Render the template with the given variables.
    ///
    /// The document is substituted last so placeholder-like text inside it
    /// is left alone.
    pub fn render(&self, source_language: &str, target_language: &str, source: &str) -> String {
        self.template
            .replace(SOURCE_LANGUAGE_PLACEHOLDER, source_language)
            .replace(TARGET_LANGUAGE_PLACEHOLDER, target_language)
            .replace(SOURCE_PLACEHOLDER, source)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::translate_document()
    }
}
