/*!
 * Translation state tracking.
 *
 * Decides which target languages of each source document are still
 * pending. A language is done when its resolved output path either belongs
 * to a discovered document carrying `translated: true`, or is recorded in
 * the history ledger.
 *
 * Planning runs in two passes. The first pass reads every candidate and
 * collects marker documents, the second builds jobs for the remaining
 * sources, so the result does not depend on traversal order.
 */

use log::{debug, info, warn};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::discovery::Discovery;
use crate::errors::{PipelineError, Stage, StateTrackingError};
use crate::file_utils::FileManager;
use crate::frontmatter::FrontmatterRewriter;
use crate::history::HistoryLedger;
use crate::language_utils::LanguageCode;
use crate::target_path::TargetPathRule;

/// Frontmatter key marking a document as translation output
pub const TRANSLATED_MARKER: &str = "translated";

/// A discovered markdown document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Forward-slash path relative to the content root
    pub relative_path: String,
    /// Raw content, frontmatter included
    pub content: String,
    /// Value of the `translated` frontmatter marker
    pub translated_marker: bool,
}

/// Output of one document in one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub language: LanguageCode,
    /// Resolved output path
    pub output_path: PathBuf,
    /// Absolute form of `output_path`, used as ledger key
    pub ledger_key: PathBuf,
}

/// A source document and its pending languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub document: SourceDocument,
    /// Pending targets in configured language order, never empty
    pub targets: Vec<TargetSpec>,
}

/// Result of planning a run
#[derive(Debug, Default)]
pub struct TranslationPlan {
    pub jobs: Vec<TranslationJob>,
    /// Absolute paths of discovered documents carrying the marker
    pub marked_outputs: Vec<PathBuf>,
    /// Sources with nothing left to translate
    pub up_to_date: Vec<String>,
    /// Documents skipped because their state could not be determined
    pub skipped: Vec<PipelineError>,
}

impl TranslationPlan {
    /// Number of translation calls the plan will make
    pub fn unit_count(&self) -> usize {
        self.jobs.iter().map(|job| job.targets.len()).sum()
    }
}

/// Which existence checks apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Honour the `translated` frontmatter marker
    pub use_translated_marker: bool,
    /// Treat every language as pending
    pub retranslate: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            use_translated_marker: true,
            retranslate: false,
        }
    }
}

/// Computes pending work for a content tree
#[derive(Debug, Clone)]
pub struct StateTracker {
    content_dir: PathBuf,
    source_language: LanguageCode,
    target_languages: Vec<LanguageCode>,
    rule: TargetPathRule,
    options: TrackerOptions,
}

impl StateTracker {
    pub fn new(
        content_dir: impl Into<PathBuf>,
        source_language: LanguageCode,
        target_languages: Vec<LanguageCode>,
        rule: TargetPathRule,
        options: TrackerOptions,
    ) -> Self {
        Self {
            content_dir: content_dir.into(),
            source_language,
            target_languages,
            rule,
            options,
        }
    }

    pub fn options(&self) -> TrackerOptions {
        self.options
    }

    /// Discover documents and plan the jobs of this run.
    ///
    /// Discovery failures abort planning. Failures scoped to one document
    /// are recorded in [`TranslationPlan::skipped`].
    pub fn plan(&self, discovery: &Discovery, ledger: &HistoryLedger) -> Result<TranslationPlan, PipelineError> {
        let mut plan = TranslationPlan::default();
        let mut documents = Vec::new();
        let mut marked: HashSet<PathBuf> = HashSet::new();

        // Pass 1: read candidates and collect marker documents
        for relative_path in discovery.list_markdown_paths()? {
            let content = discovery.read(&relative_path)?;

            let translated_marker = if self.options.use_translated_marker {
                match read_marker(&relative_path, &content) {
                    Ok(marker) => marker,
                    Err(err) => {
                        warn!("Skipping {}: {}", relative_path, err);
                        plan.skipped
                            .push(PipelineError::job(&relative_path, None, Stage::StateTracking, err));
                        continue;
                    }
                }
            } else {
                false
            };

            if translated_marker {
                match self.absolute(&relative_path) {
                    Ok(path) => {
                        debug!("{} is a translation output", relative_path);
                        marked.insert(path.clone());
                        plan.marked_outputs.push(path);
                    }
                    Err(err) => plan
                        .skipped
                        .push(PipelineError::job(&relative_path, None, Stage::StateTracking, err)),
                }
                continue;
            }

            documents.push(SourceDocument {
                relative_path,
                content,
                translated_marker,
            });
        }

        // Pass 2: pending languages per source
        for document in documents {
            match self.is_recorded_output(&document, ledger) {
                Ok(true) => {
                    debug!("{} is recorded as a translation output", document.relative_path);
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    plan.skipped
                        .push(PipelineError::job(&document.relative_path, None, Stage::StateTracking, err));
                    continue;
                }
            }

            match self.pending_targets(&document.relative_path, &marked, ledger) {
                Ok(targets) if targets.is_empty() => {
                    debug!("{} is up to date", document.relative_path);
                    plan.up_to_date.push(document.relative_path);
                }
                Ok(targets) => plan.jobs.push(TranslationJob { document, targets }),
                Err(err) => {
                    warn!("Skipping {}: {}", document.relative_path, err);
                    plan.skipped
                        .push(PipelineError::job(&document.relative_path, None, Stage::StateTracking, err));
                }
            }
        }

        info!(
            "Planned {} job(s) with {} translation(s); {} up to date, {} marked output(s), {} skipped",
            plan.jobs.len(),
            plan.unit_count(),
            plan.up_to_date.len(),
            plan.marked_outputs.len(),
            plan.skipped.len()
        );
        Ok(plan)
    }

    /// Resolve the targets of one document that are not produced yet
    pub fn pending_targets(
        &self,
        relative_path: &str,
        marked: &HashSet<PathBuf>,
        ledger: &HistoryLedger,
    ) -> Result<Vec<TargetSpec>, StateTrackingError> {
        let mut pending = Vec::new();

        for language in &self.target_languages {
            let target = self.resolve_target(relative_path, language)?;

            let done = !self.options.retranslate
                && (marked.contains(&target.ledger_key) || ledger.contains(&target.ledger_key));
            if done {
                debug!("{} [{}] already exists at {:?}", relative_path, language, target.output_path);
                continue;
            }
            pending.push(target);
        }
        Ok(pending)
    }

    /// Output path of a document for one language. Planning and writing
    /// both go through this call.
    pub fn resolve_target(&self, relative_path: &str, language: &LanguageCode) -> Result<TargetSpec, StateTrackingError> {
        let output_path = self
            .rule
            .resolve_for(&self.content_dir, relative_path, self.source_language.as_str(), language.as_str())
            .map_err(|err| target_error(relative_path, err))?;
        let ledger_key = FileManager::absolute(&output_path).map_err(|err| target_error(relative_path, err))?;

        Ok(TargetSpec {
            language: language.clone(),
            output_path,
            ledger_key,
        })
    }

    fn absolute(&self, relative_path: &str) -> Result<PathBuf, StateTrackingError> {
        FileManager::absolute(self.content_dir.join(relative_path)).map_err(|err| target_error(relative_path, err))
    }

    // With the marker disabled, earlier outputs are only known to the ledger
    fn is_recorded_output(&self, document: &SourceDocument, ledger: &HistoryLedger) -> Result<bool, StateTrackingError> {
        if self.options.use_translated_marker {
            return Ok(false);
        }
        Ok(ledger.contains(&self.absolute(&document.relative_path)?))
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }
}

fn target_error(relative_path: &str, err: anyhow::Error) -> StateTrackingError {
    StateTrackingError::TargetPath {
        path: relative_path.to_string(),
        message: err.to_string(),
    }
}

/// Read the `translated` marker of a document. A document without
/// frontmatter, or without the key, is not marked.
pub fn read_marker(relative_path: &str, content: &str) -> Result<bool, StateTrackingError> {
    let metadata = FrontmatterRewriter::read_metadata(content).map_err(|source| StateTrackingError::Frontmatter {
        path: relative_path.to_string(),
        source,
    })?;

    match metadata.as_ref().and_then(|m| m.get(TRANSLATED_MARKER)) {
        None => Ok(false),
        Some(Value::Bool(marker)) => Ok(*marker),
        Some(other) => Err(StateTrackingError::MalformedMarker {
            path: relative_path.to_string(),
            found: describe(other),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "an unsupported value".to_string()),
    }
}
