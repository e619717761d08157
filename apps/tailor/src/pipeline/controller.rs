//! Pipeline Controller: takes each pending record from the ledger through
//! parse, generate, substitute, compile and finalize, one record at a time.
//!
//! Record-scoped failures end that record (skipped, or retained when the
//! compiler failed) and the loop moves on. Only an unreadable ledger aborts the
//! run. The ledger is written only after a record has fully succeeded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::generation::{generate_content, GeneratedContent, GenerationInput, PromptOrchestrator, PromptSet};
use crate::ledger::{CommitOutcome, Ledger};
use crate::models::{JobRecord, Language};
use crate::pipeline::cover_letter::{
    artifact_names, companion_metadata, letter_body, status_label,
};
use crate::pipeline::scratch::ScratchProject;
use crate::profile::{parse_blocks, BlockMarkers, ProfileDocument};
use crate::render::{compile, convert_companion, substitute};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Parsing,
    Generating,
    Substituting,
    Compiling,
    Finalizing,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Pending => "pending",
            RecordState::Parsing => "parsing",
            RecordState::Generating => "generating",
            RecordState::Substituting => "substituting",
            RecordState::Compiling => "compiling",
            RecordState::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Artifacts written to `output_dir` and the ledger status set.
    Committed { output_dir: PathBuf, status: String },
    /// Artifacts written to `output_dir` but the status could not be set, so
    /// the record is still pending in the ledger.
    Unrecorded { output_dir: PathBuf, reason: String },
    /// Compiling or moving the CV out failed; the scratch project was kept.
    Retained { scratch: PathBuf, reason: String },
    /// Any other record-scoped failure. Nothing was persisted.
    Skipped {
        state: RecordState,
        code: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordReport {
    pub company: String,
    pub title: String,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub records: Vec<RecordReport>,
}

impl RunSummary {
    pub fn committed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Committed { .. }))
    }

    pub fn unrecorded(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Unrecorded { .. }))
    }

    pub fn retained(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Retained { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.records {
            let who = format!("{} / {}", report.company, report.title);
            match &report.outcome {
                RecordOutcome::Committed { output_dir, .. } => {
                    writeln!(f, "COMMITTED  {who} -> {}", output_dir.display())?
                }
                RecordOutcome::Unrecorded { output_dir, reason } => writeln!(
                    f,
                    "UNRECORDED {who} -> {} ({reason})",
                    output_dir.display()
                )?,
                RecordOutcome::Retained { scratch, reason } => writeln!(
                    f,
                    "RETAINED   {who} -> {} ({reason})",
                    scratch.display()
                )?,
                RecordOutcome::Skipped {
                    state,
                    code,
                    reason,
                } => writeln!(f, "SKIPPED    {who} [{code} while {state}] {reason}")?,
            }
        }
        write!(
            f,
            "{} committed, {} unrecorded, {} retained, {} skipped ({} pending)",
            self.committed(),
            self.unrecorded(),
            self.retained(),
            self.skipped(),
            self.records.len()
        )
    }
}

/// Everything loaded for one record before generation starts.
struct RecordInputs {
    language: Language,
    cv_project: PathBuf,
    profile: ProfileDocument,
    prompts: PromptSet,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct Controller {
    config: Config,
    ledger: Arc<dyn Ledger>,
    orchestrator: PromptOrchestrator,
    date: Option<NaiveDate>,
}

impl Controller {
    pub fn new(config: Config, ledger: Arc<dyn Ledger>, orchestrator: PromptOrchestrator) -> Self {
        Self {
            config,
            ledger,
            orchestrator,
            date: None,
        }
    }

    /// Pins the date used for the status label and the letter. Defaults to today.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Processes every pending record in ledger order.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let pending = self.ledger.list_pending().await?;
        if pending.is_empty() {
            info!("No pending job records; everything is up to date");
            return Ok(RunSummary::default());
        }
        info!("Found {} pending job records", pending.len());

        let mut summary = RunSummary::default();
        for (idx, record) in pending.iter().enumerate() {
            let span = info_span!("record", company = %record.company, title = %record.title);
            let outcome = async {
                info!("Processing record {} of {}", idx + 1, pending.len());
                self.process_record(record).await
            }
            .instrument(span)
            .await;
            summary.records.push(RecordReport {
                company: record.company.clone(),
                title: record.title.clone(),
                outcome,
            });
        }
        info!(
            "Run finished: {} committed, {} unrecorded, {} retained, {} skipped",
            summary.committed(),
            summary.unrecorded(),
            summary.retained(),
            summary.skipped()
        );
        Ok(summary)
    }

    pub async fn process_record(&self, record: &JobRecord) -> RecordOutcome {
        let mut state = RecordState::Pending;
        let result = self.try_process(record, &mut state).await;
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(code = e.code(), state = %state, "Skipping record: {e}");
                RecordOutcome::Skipped {
                    state,
                    code: e.code(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_process(
        &self,
        record: &JobRecord,
        state: &mut RecordState,
    ) -> Result<RecordOutcome, PipelineError> {
        enter(state, RecordState::Parsing);
        let inputs = self.load_inputs(record).await?;
        let markers = BlockMarkers::new(&self.config.block_marker_open, &self.config.block_marker_close)?;
        let blocks = parse_blocks(inputs.profile.raw(), &markers, self.config.orphan_lines);

        enter(state, RecordState::Generating);
        let input = GenerationInput {
            record,
            profile: &inputs.profile,
            blocks: &blocks,
            prompts: &inputs.prompts,
            tag_policy: self.config.unknown_tags,
        };
        let content = generate_content(&self.orchestrator, &input).await?;

        enter(state, RecordState::Substituting);
        let folder = record.folder_name();
        let scratch_root = self.config.applications_dir.join(format!("_{folder}_temp"));
        let scratch = ScratchProject::create(&inputs.cv_project, scratch_root).await?;
        if let Err(e) = self.substitute_content(scratch.root(), &content).await {
            scratch.discard().await;
            return Err(e);
        }

        enter(state, RecordState::Compiling);
        let report = match compile(
            &self.config.compiler,
            self.config.max_passes,
            scratch.root(),
            &self.config.main_tex,
        )
        .await
        {
            Ok(report) => report,
            Err(e) => {
                let err = PipelineError::CompilationFailure(e);
                let scratch = scratch.retain();
                error!(
                    code = err.code(),
                    "{err}; scratch project kept at {} (check the .log file there)",
                    scratch.display()
                );
                return Ok(RecordOutcome::Retained {
                    scratch,
                    reason: err.to_string(),
                });
            }
        };

        enter(state, RecordState::Finalizing);
        let output_dir = self.config.applications_dir.join(&folder);
        let names = artifact_names(record, inputs.language, &self.config.author.name);
        let primary = output_dir.join(&names.primary);
        if let Err(e) = place_primary(&report.artifact, &output_dir, &primary).await {
            let scratch = scratch.retain();
            let reason = format!("could not move the CV to {}: {e}", primary.display());
            error!("{reason}; scratch project kept at {}", scratch.display());
            return Ok(RecordOutcome::Retained { scratch, reason });
        }
        info!("CV saved to {}", primary.display());
        scratch.discard().await;

        let companion = output_dir.join(&names.companion);
        self.finalize(record, inputs.language, &content, &primary, &companion, &output_dir)
            .await
    }

    async fn load_inputs(&self, record: &JobRecord) -> Result<RecordInputs, PipelineError> {
        let language = record.language();
        let assets = self.config.assets(language);
        if !tokio::fs::metadata(&assets.cv_project)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(PipelineError::TemplateProjectMissing(
                assets.cv_project.display().to_string(),
            ));
        }

        let raw = tokio::fs::read_to_string(&assets.profile)
            .await
            .map_err(|e| PipelineError::Asset {
                what: "profile",
                path: assets.profile.display().to_string(),
                message: e.to_string(),
            })?;
        let profile = ProfileDocument::parse(raw)?;
        let prompts = PromptSet::load(&assets.prompts).await?;
        info!("Loaded {language} profile and {} prompts", prompts.len());

        Ok(RecordInputs {
            language,
            cv_project: assets.cv_project.clone(),
            profile,
            prompts,
        })
    }

    async fn substitute_content(
        &self,
        root: &Path,
        content: &GeneratedContent,
    ) -> Result<(), PipelineError> {
        let ext = &self.config.template_extension;
        substitute(root, ext, &self.config.summary_placeholder, &content.summary).await?;
        for block in &content.experience_blocks {
            substitute(root, ext, &block.marker, &block.latex).await?;
        }
        Ok(())
    }

    /// Renders the companion next to the already moved primary and commits the
    /// status. A failed companion removes the primary again.
    async fn finalize(
        &self,
        record: &JobRecord,
        language: Language,
        content: &GeneratedContent,
        primary: &Path,
        companion: &Path,
        output_dir: &Path,
    ) -> Result<RecordOutcome, PipelineError> {
        let date = self.today();
        let author = &self.config.author;
        let body = letter_body(language, &content.cover_letter_body, &author.name);
        let metadata = companion_metadata(record, language, author, date);
        if let Err(e) = convert_companion(
            &self.config.converter,
            &self.config.companion,
            &body,
            companion,
            &metadata,
        )
        .await
        {
            if let Err(rm) = tokio::fs::remove_file(primary).await {
                warn!("Could not remove {}: {rm}", primary.display());
            }
            remove_if_empty(output_dir).await;
            return Err(PipelineError::CompanionConversionFailure(e));
        }
        info!("Cover letter saved to {}", companion.display());

        let status = status_label(date);
        let output_dir = output_dir.to_path_buf();
        let outcome = match self
            .ledger
            .commit_status(&record.company, &record.title, &status)
            .await
        {
            CommitOutcome::Updated => {
                info!("Ledger status set to '{status}'");
                RecordOutcome::Committed { output_dir, status }
            }
            CommitOutcome::KeyNotFound => {
                warn!("Record vanished from the ledger; status not written");
                RecordOutcome::Unrecorded {
                    output_dir,
                    reason: "record no longer in the ledger".to_string(),
                }
            }
            CommitOutcome::Unavailable(reason) => {
                warn!("Ledger unavailable for commit: {reason}");
                RecordOutcome::Unrecorded {
                    output_dir,
                    reason: format!("ledger unavailable: {reason}"),
                }
            }
        };
        Ok(outcome)
    }
}

fn enter(state: &mut RecordState, next: RecordState) {
    info!("{state} -> {next}");
    *state = next;
}

/// Creates the output directory and moves the compiled artifact into it. On
/// failure the directory is removed again if nothing else lives there.
async fn place_primary(artifact: &Path, output_dir: &Path, primary: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;
    if let Err(e) = move_file(artifact, primary).await {
        remove_if_empty(output_dir).await;
        return Err(e);
    }
    Ok(())
}

async fn remove_if_empty(dir: &Path) {
    // A non-empty directory is expected to stay.
    if let Err(e) = tokio::fs::remove_dir(dir).await {
        debug!("Keeping {}: {e}", dir.display());
    }
}

/// Renames, falling back to copy + delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    if let Err(e) = tokio::fs::copy(from, to).await {
        if let Err(rm) = tokio::fs::remove_file(to).await {
            debug!("No partial copy to clean up at {}: {rm}", to.display());
        }
        return Err(e);
    }
    tokio::fs::remove_file(from).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    use async_trait::async_trait;

    use crate::generation::generator::tests::ScriptedGenerator;
    use crate::ledger::{CsvLedger, LedgerError};
    use crate::llm_client::LlmError;

    const LEDGER: &str = "\
CompanyName,JobTitle,JobDescription,Language,HRManagerName,HRManagerGender,CompanyStreet,CompanyCity,Status
Acme,Backend Engineer,Build Rust services,EN,Jordan Smith,F,1 Main St,Springfield,
Globex,Data Engineer,Pipelines,EN,,,,,Generated on 2024-01-01
";

    const PROFILE: &str = "\
## Example of Desired Summary
Backend engineer who ships.

## Cover Letter Paragraph (ai:intro)
I am excited to apply.

## Cover Letter Paragraph (static)
I can start in June.

## Experience
---EXPERIENCE-BLOCK-ACME---
Built billing in Rust
";

    const PROMPTS: &str = r#"{
        "profile_summary": {"system_instruction": "SUMMARY", "template": "{summary_example} {job_description}"},
        "experience_block": {"system_instruction": "BLOCK", "template": "{base_experience_description}"},
        "cover_letter_intro": {"system_instruction": "INTRO", "template": "{intro_example} {target_company_name}"}
    }"#;

    const CV_TEX: &str = "\
\\section{Summary}
[---PROFILE-SUMMARY-PLACEHOLDER---]
\\section{Experience}
---EXPERIENCE-BLOCK-ACME---
";

    const LEDGER_DE: &str = "\
CompanyName,JobTitle,JobDescription,Language,HRManagerName,HRManagerGender,CompanyStreet,CompanyCity,Status
Müller GmbH,Entwickler,Rust Dienste,de,Maria Schmidt,F,Hauptstr. 1,Berlin,
";

    const PROFILE_DE: &str = "\
## Beispiel für die gewünschte Zusammenfassung
Entwickler mit Erfahrung.

## Anschreiben Absatz (ai:motivation)
Ich bewerbe mich gern.

## Anschreiben Absatz (static)
Ich kann im Juni beginnen.

## Erfahrung
---EXPERIENCE-BLOCK-MUELLER---
Abrechnung in Rust gebaut
";

    const PROMPTS_DE: &str = r#"{
        "profile_summary": {"system_instruction": "ZUSAMMENFASSUNG", "template": "{summary_example} {job_description}"},
        "experience_block": {"system_instruction": "BAUSTEIN", "template": "{base_experience_description}"},
        "cover_letter_motivation": {"system_instruction": "MOTIVATION", "template": "{motivation_example} {target_company_name}"}
    }"#;

    const CV_TEX_DE: &str = "\
\\section{Zusammenfassung}
[---PROFILE-SUMMARY-PLACEHOLDER---]
\\section{Erfahrung}
---EXPERIENCE-BLOCK-MUELLER---
";

    /// Fails if any placeholder survived substitution, otherwise "compiles" by
    /// copying the source into the pdf.
    const FAKE_LATEX: &str = r#"
if grep -q -- '---' "$1"; then echo "! Undefined placeholder"; exit 1; fi
echo "refs" > "${1%.tex}.aux"
cat "$1" > "${1%.tex}.pdf"
"#;

    const FAKE_PANDOC: &str = r#"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
cat > "$out"
"#;

    const FAILING_TOOL: &str = "cat > /dev/null 2>&1; echo 'fatal error' >&2; exit 1\n";

    struct Workspace {
        dir: TempDir,
        vars: HashMap<String, String>,
    }

    impl Workspace {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let project = root.join("templates/cv_project_en");
            tokio::fs::create_dir_all(&project).await.unwrap();
            tokio::fs::write(project.join("cv.tex"), CV_TEX).await.unwrap();
            tokio::fs::write(root.join("jobs.csv"), LEDGER).await.unwrap();
            tokio::fs::write(root.join("my_profile_en.txt"), PROFILE).await.unwrap();
            tokio::fs::write(root.join("prompts_en.json"), PROMPTS).await.unwrap();
            let project_de = root.join("templates/cv_project_de");
            tokio::fs::create_dir_all(&project_de).await.unwrap();
            tokio::fs::write(project_de.join("cv.tex"), CV_TEX_DE).await.unwrap();
            tokio::fs::write(root.join("my_profile_de.txt"), PROFILE_DE).await.unwrap();
            tokio::fs::write(root.join("prompts_de.json"), PROMPTS_DE).await.unwrap();
            tokio::fs::write(root.join("latex.sh"), FAKE_LATEX).await.unwrap();
            tokio::fs::write(root.join("pandoc.sh"), FAKE_PANDOC).await.unwrap();
            tokio::fs::write(root.join("fail.sh"), FAILING_TOOL).await.unwrap();

            let path = |p: &str| root.join(p).display().to_string();
            let vars = HashMap::from([
                ("TAILOR_JOBS_CSV".to_string(), path("jobs.csv")),
                ("TAILOR_APPLICATIONS_DIR".to_string(), path("applications")),
                ("TAILOR_TEMPLATES_DIR".to_string(), path("templates")),
                ("TAILOR_PROFILE_EN".to_string(), path("my_profile_en.txt")),
                ("TAILOR_PROMPTS_EN".to_string(), path("prompts_en.json")),
                ("TAILOR_PROFILE_DE".to_string(), path("my_profile_de.txt")),
                ("TAILOR_PROMPTS_DE".to_string(), path("prompts_de.json")),
                ("TAILOR_LATEX_COMPILER".to_string(), "sh".to_string()),
                ("TAILOR_COMPILER_ARGS".to_string(), path("latex.sh")),
                ("TAILOR_CONVERTER".to_string(), "sh".to_string()),
                ("TAILOR_CONVERTER_ARGS".to_string(), path("pandoc.sh")),
                ("AUTHOR_NAME".to_string(), "Alex Applicant".to_string()),
            ]);
            Self { dir, vars }
        }

        fn set(&mut self, key: &str, value: String) {
            self.vars.insert(key.to_string(), value);
        }

        fn path(&self, p: &str) -> PathBuf {
            self.dir.path().join(p)
        }

        fn controller(&self, generator: Arc<ScriptedGenerator>) -> Controller {
            let ledger = Arc::new(CsvLedger::new(self.path("jobs.csv")));
            self.controller_with_ledger(generator, ledger)
        }

        fn controller_with_ledger(
            &self,
            generator: Arc<ScriptedGenerator>,
            ledger: Arc<dyn Ledger>,
        ) -> Controller {
            let config = Config::from_lookup(|key| self.vars.get(key).cloned()).unwrap();
            let orchestrator = PromptOrchestrator::new(generator, Duration::from_secs(5));
            Controller::new(config, ledger, orchestrator).with_date(date())
        }

        async fn ledger(&self) -> String {
            tokio::fs::read_to_string(self.path("jobs.csv")).await.unwrap()
        }

        async fn write_ledger(&self, text: &str) {
            tokio::fs::write(self.path("jobs.csv"), text).await.unwrap();
        }

        async fn files_in(&self, dir: &str) -> Vec<String> {
            let mut names = Vec::new();
            let Ok(mut entries) = tokio::fs::read_dir(self.path(dir)).await else {
                return names;
            };
            while let Some(entry) = entries.next_entry().await.unwrap() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
            names.sort();
            names
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    /// Reads from the real ledger but never finds the row when committing.
    struct ForgetfulLedger(CsvLedger);

    #[async_trait]
    impl Ledger for ForgetfulLedger {
        async fn list_pending(&self) -> Result<Vec<JobRecord>, LedgerError> {
            self.0.list_pending().await
        }

        async fn commit_status(&self, _company: &str, _title: &str, _status: &str) -> CommitOutcome {
            CommitOutcome::KeyNotFound
        }
    }

    fn generator() -> Arc<ScriptedGenerator> {
        Arc::new(ScriptedGenerator::new(|prompt: &str| {
            if prompt.starts_with("SUMMARY") {
                Ok("Seasoned Rust engineer.".to_string())
            } else if prompt.starts_with("BLOCK") {
                Ok("Shipped billing\nCut latency".to_string())
            } else {
                Ok("Acme builds what I care about.".to_string())
            }
        }))
    }

    #[tokio::test]
    async fn test_successful_record_is_committed_with_two_artifacts() {
        let ws = Workspace::new().await;
        let summary = ws.controller(generator()).run().await.unwrap();

        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.committed(), 1);
        assert_eq!(
            summary.records[0].outcome,
            RecordOutcome::Committed {
                output_dir: ws.path("applications/Acme_BackendEngineer"),
                status: "Generated on 2024-05-01".to_string(),
            }
        );

        assert_eq!(
            ws.files_in("applications/Acme_BackendEngineer").await,
            vec![
                "CV_AlexApplicant_Acme.pdf".to_string(),
                "CoverLetter_AlexApplicant_Acme.pdf".to_string(),
            ]
        );
        assert!(!ws.path("applications/_Acme_BackendEngineer_temp").exists());

        let expected = LEDGER.replace(
            "1 Main St,Springfield,\n",
            "1 Main St,Springfield,Generated on 2024-05-01\n",
        );
        assert_eq!(ws.ledger().await, expected);

        // The template project itself is never modified.
        let template = tokio::fs::read_to_string(ws.path("templates/cv_project_en/cv.tex"))
            .await
            .unwrap();
        assert_eq!(template, CV_TEX);
    }

    #[tokio::test]
    async fn test_compiler_failure_retains_scratch_and_leaves_ledger() {
        let mut ws = Workspace::new().await;
        ws.set("TAILOR_COMPILER_ARGS", ws.path("fail.sh").display().to_string());
        let summary = ws.controller(generator()).run().await.unwrap();

        let scratch = ws.path("applications/_Acme_BackendEngineer_temp");
        match &summary.records[0].outcome {
            RecordOutcome::Retained { scratch: kept, reason } => {
                assert_eq!(kept, &scratch);
                assert!(reason.contains("Compilation failed"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ws.ledger().await, LEDGER);

        let cv = tokio::fs::read_to_string(scratch.join("cv.tex")).await.unwrap();
        assert!(cv.contains("Seasoned Rust engineer."));
        assert!(cv.contains("\\item{Shipped billing}"));
        assert!(ws.files_in("applications/Acme_BackendEngineer").await.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_skips_without_traces() {
        let ws = Workspace::new().await;
        let failing = Arc::new(ScriptedGenerator::new(|prompt: &str| {
            if prompt.starts_with("INTRO") {
                Err(LlmError::EmptyContent)
            } else {
                Ok("fine".to_string())
            }
        }));
        let summary = ws.controller(failing).run().await.unwrap();

        match &summary.records[0].outcome {
            RecordOutcome::Skipped { state, code, .. } => {
                assert_eq!(*state, RecordState::Generating);
                assert_eq!(*code, "GENERATION_FAILURE");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ws.ledger().await, LEDGER);
        assert!(ws.files_in("applications").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_project_skips_record() {
        let mut ws = Workspace::new().await;
        ws.set("TAILOR_CV_PROJECT_EN", ws.path("nowhere").display().to_string());
        let generator = generator();
        let summary = ws.controller(generator.clone()).run().await.unwrap();

        match &summary.records[0].outcome {
            RecordOutcome::Skipped { state, code, .. } => {
                assert_eq!(*state, RecordState::Parsing);
                assert_eq!(*code, "TEMPLATE_PROJECT_MISSING");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(generator.prompts().is_empty());
        assert_eq!(ws.ledger().await, LEDGER);
    }

    #[tokio::test]
    async fn test_companion_failure_removes_primary_and_skips() {
        let mut ws = Workspace::new().await;
        ws.set("TAILOR_CONVERTER_ARGS", ws.path("fail.sh").display().to_string());
        let summary = ws.controller(generator()).run().await.unwrap();

        match &summary.records[0].outcome {
            RecordOutcome::Skipped { state, code, .. } => {
                assert_eq!(*state, RecordState::Finalizing);
                assert_eq!(*code, "COMPANION_CONVERSION_FAILURE");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ws.ledger().await, LEDGER);
        assert!(ws.files_in("applications").await.is_empty());
    }

    #[tokio::test]
    async fn test_company_with_path_separators_stays_inside_applications() {
        let ws = Workspace::new().await;
        ws.write_ledger(&LEDGER.replace("Acme,Backend Engineer", "Acme/Sons,Backend Engineer"))
            .await;
        let summary = ws.controller(generator()).run().await.unwrap();

        assert_eq!(summary.committed(), 1);
        assert_eq!(
            ws.files_in("applications").await,
            vec!["AcmeSons_BackendEngineer".to_string()]
        );
        assert_eq!(
            ws.files_in("applications/AcmeSons_BackendEngineer").await,
            vec![
                "CV_AlexApplicant_AcmeSons.pdf".to_string(),
                "CoverLetter_AlexApplicant_AcmeSons.pdf".to_string(),
            ]
        );
        assert!(ws.ledger().await.contains("Acme/Sons,Backend Engineer"));
        assert!(!ws.ledger().await.contains("Springfield,\n"));
    }

    #[tokio::test]
    async fn test_failed_move_keeps_the_compiled_scratch_project() {
        let ws = Workspace::new().await;
        // A directory where the CV should land makes the move fail.
        let blocker = ws.path("applications/Acme_BackendEngineer/CV_AlexApplicant_Acme.pdf");
        tokio::fs::create_dir_all(&blocker).await.unwrap();
        tokio::fs::write(blocker.join("keep"), "x").await.unwrap();

        let summary = ws.controller(generator()).run().await.unwrap();

        let scratch = ws.path("applications/_Acme_BackendEngineer_temp");
        match &summary.records[0].outcome {
            RecordOutcome::Retained { scratch: kept, reason } => {
                assert_eq!(kept, &scratch);
                assert!(reason.contains("could not move the CV"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(scratch.join("cv.pdf").exists());
        assert_eq!(ws.ledger().await, LEDGER);
    }

    #[tokio::test]
    async fn test_unwritten_status_is_reported_as_unrecorded() {
        let ws = Workspace::new().await;
        let ledger = Arc::new(ForgetfulLedger(CsvLedger::new(ws.path("jobs.csv"))));
        let summary = ws
            .controller_with_ledger(generator(), ledger)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.committed(), 0);
        assert_eq!(summary.unrecorded(), 1);
        assert_eq!(
            summary.records[0].outcome,
            RecordOutcome::Unrecorded {
                output_dir: ws.path("applications/Acme_BackendEngineer"),
                reason: "record no longer in the ledger".to_string(),
            }
        );
        assert!(summary.to_string().contains("UNRECORDED Acme / Backend Engineer"));
        assert_eq!(ws.ledger().await, LEDGER);
    }

    #[tokio::test]
    async fn test_german_record_uses_german_assets_and_names() {
        let ws = Workspace::new().await;
        ws.write_ledger(LEDGER_DE).await;
        let generator = Arc::new(ScriptedGenerator::new(|prompt: &str| {
            if prompt.starts_with("ZUSAMMENFASSUNG") {
                Ok("Erfahrener Rust-Entwickler.".to_string())
            } else if prompt.starts_with("BAUSTEIN") {
                Ok("Abrechnung ausgeliefert".to_string())
            } else {
                Ok("Müller passt zu mir.".to_string())
            }
        }));
        let summary = ws.controller(generator.clone()).run().await.unwrap();

        assert_eq!(summary.committed(), 1);
        let folder = "applications/Müller_GmbH_Entwickler";
        assert_eq!(
            ws.files_in(folder).await,
            vec![
                "Anschreiben_AlexApplicant_Müller_GmbH.pdf".to_string(),
                "Lebenslauf_AlexApplicant_Müller_GmbH.pdf".to_string(),
            ]
        );

        let prompts = generator.prompts();
        assert!(prompts.iter().all(|p| !p.starts_with("SUMMARY")));
        assert!(prompts
            .iter()
            .any(|p| p.starts_with("MOTIVATION") && p.contains("Ich bewerbe mich gern. Müller GmbH")));

        let cv = tokio::fs::read_to_string(
            ws.path(folder).join("Lebenslauf_AlexApplicant_Müller_GmbH.pdf"),
        )
        .await
        .unwrap();
        assert!(cv.contains("\\section{Zusammenfassung}"));
        assert!(cv.contains("Erfahrener Rust-Entwickler."));
        assert!(cv.contains("\\item{Abrechnung ausgeliefert}"));

        let letter = tokio::fs::read_to_string(
            ws.path(folder).join("Anschreiben_AlexApplicant_Müller_GmbH.pdf"),
        )
        .await
        .unwrap();
        assert!(letter.contains("Müller passt zu mir.\n\nIch kann im Juni beginnen."));
        assert!(letter.contains("Mit freundlichen Grüßen,"));

        assert!(ws
            .ledger()
            .await
            .contains("Berlin,Generated on 2024-05-01\n"));
    }

    #[tokio::test]
    async fn test_missing_ledger_is_fatal() {
        let mut ws = Workspace::new().await;
        ws.set("TAILOR_JOBS_CSV", ws.path("missing.csv").display().to_string());
        let err = ws.controller(generator()).run().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code(), "LEDGER_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing_pending() {
        let ws = Workspace::new().await;
        ws.controller(generator()).run().await.unwrap();
        let summary = ws.controller(generator()).run().await.unwrap();
        assert!(summary.records.is_empty());
    }

    #[test]
    fn test_summary_lists_each_outcome_and_totals() {
        let summary = RunSummary {
            records: vec![
                RecordReport {
                    company: "Acme".to_string(),
                    title: "Backend Engineer".to_string(),
                    outcome: RecordOutcome::Committed {
                        output_dir: PathBuf::from("applications/Acme_BackendEngineer"),
                        status: "Generated on 2024-05-01".to_string(),
                    },
                },
                RecordReport {
                    company: "Globex".to_string(),
                    title: "SRE".to_string(),
                    outcome: RecordOutcome::Skipped {
                        state: RecordState::Generating,
                        code: "GENERATION_FAILURE",
                        reason: "timed out".to_string(),
                    },
                },
            ],
        };
        let text = summary.to_string();
        assert!(text.contains("COMMITTED  Acme / Backend Engineer"));
        assert!(text.contains("SKIPPED    Globex / SRE [GENERATION_FAILURE while generating]"));
        assert!(text.ends_with("1 committed, 0 unrecorded, 0 retained, 1 skipped (2 pending)"));
    }
}
