/*!
 * Error types for the yamtwai application.
 *
 * Each stage of the pipeline has its own error enum so callers can tell a
 * fatal discovery failure apart from a failure scoped to one document or one
 * language. `PipelineError` carries the document, language and stage needed
 * to resume with a re-run.
 */

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised while enumerating source documents
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// An ignore rule is not a valid glob
    #[error("Invalid ignore rule '{pattern}': {message}")]
    InvalidIgnoreRule { pattern: String, message: String },

    /// The content directory could not be walked
    #[error("Failed to walk content directory {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A candidate document could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while computing which languages are still pending.
/// These are scoped to a single document.
#[derive(Error, Debug)]
pub enum StateTrackingError {
    /// The `translated` marker exists but is not a boolean
    #[error("Malformed 'translated' marker in {path}: expected a boolean, found {found}")]
    MalformedMarker { path: String, found: String },

    /// The metadata block could not be parsed
    #[error("Unreadable frontmatter in {path}: {source}")]
    Frontmatter {
        path: String,
        #[source]
        source: RewriteError,
    },

    /// An output path could not be resolved for the document
    #[error("Cannot resolve output path of {path}: {message}")]
    TargetPath { path: String, message: String },
}

/// Errors that can occur during a single translation call
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered without any result
    #[error("Provider returned no result")]
    EmptyResult,

    /// The structured response had an empty `markdown` field
    #[error("Provider returned an empty translation")]
    EmptyTranslation,

    /// The structured response did not match the schema
    #[error("Failed to decode structured response: {0}")]
    MalformedResponse(String),

    /// A language code has no known display name
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),
}

/// Errors raised by the frontmatter rewriter. All of them are detected
/// before anything is written to disk.
#[derive(Error, Debug)]
pub enum RewriteError {
    /// Document opens a metadata block that is never closed
    #[error("Frontmatter block is not terminated by a '---' line")]
    Unterminated,

    /// Metadata block parsed, but not as a key/value mapping
    #[error("Frontmatter must be a mapping, found {0}")]
    NotAMapping(String),

    /// Metadata block is not valid YAML
    #[error("Invalid frontmatter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Flat key/value list with an odd number of elements
    #[error("Key/value list must contain pairs, got {0} elements")]
    OddKeyValues(usize),

    /// Flat key/value list with a non-string key
    #[error("Frontmatter key at position {0} is not a string")]
    NonStringKey(usize),

    /// The rewritten document could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline stage where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovery,
    StateTracking,
    Dispatch,
    Write,
    Ledger,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovery => "discovery",
            Stage::StateTracking => "state tracking",
            Stage::Dispatch => "dispatch",
            Stage::Write => "write",
            Stage::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

/// Cause of a job-scoped failure
#[derive(Error, Debug)]
pub enum JobFailure {
    #[error(transparent)]
    State(#[from] StateTrackingError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// Errors surfaced by the translation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source enumeration failed; the run cannot start
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Two source documents resolve to the same output path
    #[error("Destination {} is produced by both {first} and {second}", .path.display())]
    DestinationCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    /// A document (or one of its languages) failed
    #[error("{stage} failed for {document}{}: {source}", language_suffix(.language))]
    Job {
        document: String,
        language: Option<String>,
        stage: Stage,
        #[source]
        source: JobFailure,
    },

    /// The history ledger could not be read or written
    #[error("History ledger error at {}: {source}", .path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled through its abort handle
    #[error("Translation run aborted")]
    Aborted,
}

impl PipelineError {
    /// Build a job-scoped error
    pub fn job(
        document: impl Into<String>,
        language: Option<&str>,
        stage: Stage,
        source: impl Into<JobFailure>,
    ) -> Self {
        Self::Job {
            document: document.into(),
            language: language.map(str::to_string),
            stage,
            source: source.into(),
        }
    }

    /// Stage of the failure, when it is tied to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Discovery(_) => Some(Stage::Discovery),
            Self::Job { stage, .. } => Some(*stage),
            Self::Ledger { .. } => Some(Stage::Ledger),
            Self::DestinationCollision { .. } | Self::Aborted => None,
        }
    }
}

fn language_suffix(language: &Option<String>) -> String {
    match language {
        Some(lang) => format!(" [{}]", lang),
        None => String::new(),
    }
}
