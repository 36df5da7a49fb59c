/*!
 * # YAMTwAI - Yet Another Markdown Translator with AI
 *
 * A Rust library for incremental translation of markdown content trees using AI.
 *
 * ## Features
 *
 * - Discover markdown documents under a content root, with glob ignore rules
 * - Translate each document into several languages using:
 *   - OpenAI API
 *   - LM Studio (OpenAI-compatible)
 *   - Ollama (local LLM)
 * - Preserve frontmatter key order and scalar style
 * - Never translate the same output twice, using a `translated` marker
 *   and a history ledger
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `discovery`: Source enumeration and ignore rules
 * - `target_path`: Output path templates
 * - `frontmatter`: Metadata block parsing, repair and rewriting
 * - `history`: Ledger of produced output paths
 * - `translation`: AI-powered translation pipeline:
 *   - `translation::core`: One document, one language, one call
 *   - `translation::state`: Pending work planning
 *   - `translation::orchestrator`: Concurrent dispatch and commit
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod discovery;
pub mod errors;
pub mod file_utils;
pub mod frontmatter;
pub mod history;
pub mod language_utils;
pub mod providers;
pub mod target_path;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use discovery::{Discovery, IgnoreRules};
pub use errors::{PipelineError, ProviderError, RewriteError, Stage, TranslationError};
pub use frontmatter::{FrontmatterRewriter, FrontmatterUpdates};
pub use history::{HistoryLedger, LedgerMode};
pub use language_utils::{LanguageCode, get_language_name, language_codes_match};
pub use target_path::TargetPathRule;
pub use translation::{Orchestrator, RunReport, StateTracker, TranslationService};
