/*!
 * Target path resolution.
 *
 * A target path rule is a template with three placeholders:
 * - `{origin}`: parent directory of the source document relative to the
 *   content root, with the source-language segment removed
 * - `{language}`: target language code
 * - `{fileName}`: base name of the source document without its extension
 *
 * The same [`TargetPathRule::resolve_for`] call is used when deciding
 * whether a language is pending and when placing the written file.
 */

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

pub const ORIGIN_PLACEHOLDER: &str = "{origin}";
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";
pub const FILE_NAME_PLACEHOLDER: &str = "{fileName}";

/// Default rule: write `post.fr.md` next to `post.md`
pub const DEFAULT_TARGET_PATH_RULE: &str = "{origin}/{fileName}.{language}.md";

/// Path template for translated documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPathRule {
    template: String,
}

impl TargetPathRule {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Reject templates that cannot give each language its own file
    pub fn validate(&self) -> Result<()> {
        if self.template.trim().is_empty() {
            return Err(anyhow!("Target path rule is empty"));
        }
        if !self.template.contains(LANGUAGE_PLACEHOLDER) {
            return Err(anyhow!(
                "Target path rule '{}' must contain {}",
                self.template,
                LANGUAGE_PLACEHOLDER
            ));
        }
        if !self.template.contains(FILE_NAME_PLACEHOLDER) {
            return Err(anyhow!(
                "Target path rule '{}' must contain {}",
                self.template,
                FILE_NAME_PLACEHOLDER
            ));
        }
        Ok(())
    }

    /// Plain textual substitution of the three placeholders, then joined
    /// onto the content root. A leading `./` is stripped and the result is
    /// lexically normalized.
    pub fn resolve(&self, content_dir: &Path, origin: &str, language: &str, file_name: &str) -> PathBuf {
        let substituted = self
            .template
            .replace(ORIGIN_PLACEHOLDER, origin)
            .replace(LANGUAGE_PLACEHOLDER, language)
            .replace(FILE_NAME_PLACEHOLDER, file_name);

        let relative = substituted.trim_start_matches("./").trim_start_matches('/');
        FileManager::normalize(content_dir.join(relative))
    }

    /// Resolve the output path of a source document for one language.
    ///
    /// `relative_path` is the forward-slash path of the document relative
    /// to the content root.
    pub fn resolve_for(
        &self,
        content_dir: &Path,
        relative_path: &str,
        source_language: &str,
        language: &str,
    ) -> Result<PathBuf> {
        let origin = origin_dir(relative_path, source_language);
        let file_name = FileManager::file_name_without_extension(relative_path)?;
        Ok(self.resolve(content_dir, &origin, language, &file_name))
    }
}

impl Default for TargetPathRule {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_PATH_RULE)
    }
}

/// Parent directory of a forward-slash relative path with the first segment
/// equal to the source language removed, e.g. `en/docs/a.md` -> `docs`.
/// Documents at the root yield `.`.
pub fn origin_dir(relative_path: &str, source_language: &str) -> String {
    let parent = match relative_path.rfind('/') {
        Some(pos) => &relative_path[..pos],
        None => "",
    };

    let mut segments: Vec<&str> = parent.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if !source_language.is_empty() {
        if let Some(pos) = segments.iter().position(|s| *s == source_language) {
            segments.remove(pos);
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}
