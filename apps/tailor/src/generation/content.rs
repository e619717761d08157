//! Per-record content generation: the CV summary, the cover-letter body and the
//! rewritten experience blocks. All text returned here is already sanitized for
//! LaTeX.

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::generation::generator::PromptOrchestrator;
use crate::generation::prompts::{
    cover_letter_key, example_slot, PromptSet, EXPERIENCE_BLOCK, PROFILE_SUMMARY,
};
use crate::generation::template::PromptContext;
use crate::models::JobRecord;
use crate::profile::{
    BlockMap, ParagraphKind, ProfileDocument, UnknownTagPolicy, SUMMARY_ALIASES,
};
use crate::render::sanitize_for_latex;

/// A rewritten experience block ready to replace its marker token.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceBlock {
    pub marker: String,
    pub latex: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    pub summary: String,
    pub cover_letter_body: String,
    pub experience_blocks: Vec<ExperienceBlock>,
}

/// Everything the generators need to know about one record.
pub struct GenerationInput<'a> {
    pub record: &'a JobRecord,
    pub profile: &'a ProfileDocument,
    pub blocks: &'a BlockMap,
    pub prompts: &'a PromptSet,
    pub tag_policy: UnknownTagPolicy,
}

fn base_context(input: &GenerationInput<'_>) -> PromptContext {
    let mut context = PromptContext::new();
    context.insert("my_profile".to_string(), input.profile.raw().to_string());
    context.insert(
        "job_description".to_string(),
        input.record.description.clone(),
    );
    context
}

/// Wraps generated bullet lines in a `cvitems` environment.
pub fn to_cvitems(generated: &str) -> String {
    let items: Vec<String> = generated
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("    \\item{{{}}}", sanitize_for_latex(line)))
        .collect();
    format!("\\begin{{cvitems}}\n{}\n\\end{{cvitems}}", items.join("\n"))
}

pub async fn generate_summary(
    orchestrator: &PromptOrchestrator,
    input: &GenerationInput<'_>,
) -> Result<String, PipelineError> {
    let mut context = base_context(input);
    context.insert(
        "summary_example".to_string(),
        input.profile.extract_section(SUMMARY_ALIASES),
    );
    let prompt = input.prompts.get(PROFILE_SUMMARY)?;
    let summary = orchestrator.generate(PROFILE_SUMMARY, prompt, &context).await?;
    Ok(sanitize_for_latex(&summary))
}

/// Assembles the letter body from labeled paragraphs in document order.
/// A letter with no usable paragraph is a generation failure.
pub async fn generate_cover_letter_body(
    orchestrator: &PromptOrchestrator,
    input: &GenerationInput<'_>,
) -> Result<String, PipelineError> {
    let mut parts = Vec::new();
    for paragraph in input.profile.labeled_paragraphs(input.tag_policy) {
        let text = match &paragraph.kind {
            ParagraphKind::Static => paragraph.body.clone(),
            ParagraphKind::Ai { kind } => {
                let key = cover_letter_key(kind);
                let prompt = input.prompts.get(&key)?;
                let mut context = base_context(input);
                context.insert(example_slot(kind), paragraph.body.clone());
                context.insert(
                    "target_company_name".to_string(),
                    input.record.company.clone(),
                );
                orchestrator.generate(&key, prompt, &context).await?
            }
        };
        if !text.trim().is_empty() {
            parts.push(sanitize_for_latex(&text));
        }
    }

    if parts.is_empty() {
        return Err(PipelineError::generation(
            "cover_letter",
            "profile has no usable cover letter paragraphs",
        ));
    }
    Ok(parts.join("\n\n"))
}

pub async fn generate_experience_blocks(
    orchestrator: &PromptOrchestrator,
    input: &GenerationInput<'_>,
) -> Result<Vec<ExperienceBlock>, PipelineError> {
    if input.blocks.iter().all(|b| b.lines.is_empty()) {
        warn!("No experience blocks with content found in profile");
        return Ok(Vec::new());
    }

    let prompt = input.prompts.get(EXPERIENCE_BLOCK)?;
    let mut rewritten = Vec::new();
    for block in input.blocks.iter() {
        if block.lines.is_empty() {
            warn!("Experience block {} is empty, leaving it out", block.marker);
            continue;
        }
        let mut context = base_context(input);
        context.insert(
            "base_experience_description".to_string(),
            block.lines.join("\n"),
        );
        let generated = orchestrator
            .generate(EXPERIENCE_BLOCK, prompt, &context)
            .await?;
        rewritten.push(ExperienceBlock {
            marker: block.marker.clone(),
            latex: to_cvitems(&generated),
        });
    }
    Ok(rewritten)
}

/// Runs every generation step for one record. Any failure skips the record.
pub async fn generate_content(
    orchestrator: &PromptOrchestrator,
    input: &GenerationInput<'_>,
) -> Result<GeneratedContent, PipelineError> {
    let summary = generate_summary(orchestrator, input).await?;
    let cover_letter_body = generate_cover_letter_body(orchestrator, input).await?;
    let experience_blocks = generate_experience_blocks(orchestrator, input).await?;
    info!(
        "Generated summary, cover letter and {} experience blocks",
        experience_blocks.len()
    );
    Ok(GeneratedContent {
        summary,
        cover_letter_body,
        experience_blocks,
    })
}
