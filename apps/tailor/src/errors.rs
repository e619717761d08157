use thiserror::Error;

use crate::generation::template::TemplateError;
use crate::ledger::LedgerError;
use crate::profile::ProfileError;
use crate::render::process::ProcessError;

/// Pipeline-level error type.
///
/// Everything except `LedgerUnavailable` is record-scoped: the controller logs it,
/// records the outcome and moves on to the next pending record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    #[error("Template project not found at '{0}'")]
    TemplateProjectMissing(String),

    #[error("Could not load {what} from '{path}': {message}")]
    Asset {
        what: &'static str,
        path: String,
        message: String,
    },

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Prompt '{0}' is not defined")]
    PromptNotDefined(String),

    #[error("Prompt template error: {0}")]
    TemplateContextError(#[from] TemplateError),

    #[error("Generation failed for '{prompt}': {message}")]
    GenerationFailure { prompt: String, message: String },

    #[error("Compilation failed: {0}")]
    CompilationFailure(ProcessError),

    #[error("Companion conversion failed: {0}")]
    CompanionConversionFailure(ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable machine-readable code, used in logs and the run summary.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            PipelineError::TemplateProjectMissing(_) => "TEMPLATE_PROJECT_MISSING",
            PipelineError::Asset { .. } => "ASSET_UNREADABLE",
            PipelineError::Profile(_) => "PROFILE_MALFORMED",
            PipelineError::PromptNotDefined(_) => "PROMPT_NOT_DEFINED",
            PipelineError::TemplateContextError(_) => "TEMPLATE_CONTEXT_ERROR",
            PipelineError::GenerationFailure { .. } => "GENERATION_FAILURE",
            PipelineError::CompilationFailure(_) => "COMPILATION_FAILURE",
            PipelineError::CompanionConversionFailure(_) => "COMPANION_CONVERSION_FAILURE",
            PipelineError::Io(_) => "IO_ERROR",
        }
    }

    /// Fatal errors abort the whole run instead of skipping one record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::LedgerUnavailable(_))
    }

    pub fn generation(prompt: impl Into<String>, err: impl std::fmt::Display) -> Self {
        PipelineError::GenerationFailure {
            prompt: prompt.into(),
            message: err.to_string(),
        }
    }
}
