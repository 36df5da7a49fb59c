/*!
 * Prompt construction for document translation.
 *
 * This module provides:
 * - The default system instruction
 * - The user prompt template with language and document placeholders
 */

pub mod templates;

// Re-export main types
pub use templates::PromptTemplate;
