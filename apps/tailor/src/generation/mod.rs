// Generation: prompt definitions, template rendering, the prompt orchestrator
// and per-record content assembly.
// All AI calls go through llm_client::TextGenerator via PromptOrchestrator.

pub mod content;
pub mod generator;
pub mod prompts;
pub mod template;

pub use content::{generate_content, ExperienceBlock, GeneratedContent, GenerationInput};
pub use generator::PromptOrchestrator;
pub use prompts::{PromptSet, PromptTemplate};
pub use template::{render, PromptContext, TemplateError};
