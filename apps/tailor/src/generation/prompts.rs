// Prompt definitions, loaded per language from a JSON file of the form
// `{ "<key>": { "system_instruction": "...", "template": "..." } }`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::PipelineError;

/// Prompt for the CV profile summary.
pub const PROFILE_SUMMARY: &str = "profile_summary";

/// Prompt for rewriting one experience block.
pub const EXPERIENCE_BLOCK: &str = "experience_block";

/// Prompt key for an `ai:<kind>` cover-letter paragraph.
pub fn cover_letter_key(kind: &str) -> String {
    format!("cover_letter_{kind}")
}

/// Context key holding the example text of an `ai:<kind>` paragraph.
pub fn example_slot(kind: &str) -> String {
    format!("{kind}_example")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub system_instruction: String,
    pub template: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    prompts: HashMap<String, PromptTemplate>,
}

impl PromptSet {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            prompts: serde_json::from_str(json)?,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let asset = |message: String| PipelineError::Asset {
            what: "prompt definitions",
            path: path.display().to_string(),
            message,
        };
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| asset(e.to_string()))?;
        Self::from_json(&json).map_err(|e| asset(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Result<&PromptTemplate, PipelineError> {
        self.prompts
            .get(key)
            .ok_or_else(|| PipelineError::PromptNotDefined(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }
}
