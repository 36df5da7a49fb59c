/*!
 * Markdown translation pipeline.
 *
 * The pipeline is split into several submodules:
 *
 * - `core`: Translation service turning one document and one language into one provider call
 * - `state`: Planning of pending (document, language) units
 * - `orchestrator`: Bounded fan-out of units and commit of their results
 * - `prompts`: Prompt templates for translation
 */

// Re-export main types for easier usage
pub use self::core::{TranslationResult, TranslationService};
pub use self::orchestrator::{JobState, Orchestrator, OrchestratorOptions, ProgressHook, RunReport, UnitEvent};
pub use self::prompts::PromptTemplate;
pub use self::state::{SourceDocument, StateTracker, TargetSpec, TrackerOptions, TranslationJob, TranslationPlan};

// Submodules
pub mod core;
pub mod orchestrator;
pub mod prompts;
pub mod state;
