//! Prompt Orchestrator: renders a prompt, calls the generation collaborator
//! under a timeout and cleans what comes back.
//!
//! Every failure here is scoped to one call: the caller decides whether the
//! record can continue without it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::generation::prompts::PromptTemplate;
use crate::generation::template::{render, PromptContext};
use crate::llm_client::{clean_ai_response, TextGenerator};

#[derive(Clone)]
pub struct PromptOrchestrator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl PromptOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Builds `system_instruction + "\n\n" + rendered template`, generates and
    /// cleans. Returns `GenerationFailure` on transport errors, timeouts, and
    /// responses that are empty after cleaning.
    pub async fn generate(
        &self,
        name: &str,
        prompt: &PromptTemplate,
        context: &PromptContext,
    ) -> Result<String, PipelineError> {
        let rendered = render(&prompt.template, context)?;
        let full_prompt = format!("{}\n\n{}", prompt.system_instruction, rendered);
        debug!("Prompt '{name}' rendered to {} chars", full_prompt.len());

        let raw = match tokio::time::timeout(self.timeout, self.generator.generate(&full_prompt))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(PipelineError::generation(name, e)),
            Err(_) => {
                return Err(PipelineError::generation(
                    name,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))
            }
        };

        let cleaned = clean_ai_response(&raw);
        if cleaned.is_empty() {
            return Err(PipelineError::generation(name, "empty response"));
        }
        info!("Generated '{name}' ({} chars)", cleaned.len());
        Ok(cleaned)
    }
}
