//! Document Compiler: drives the LaTeX compiler over a project and the
//! converter that renders the companion cover letter.
//!
//! The compiler reruns until its auxiliary files stop changing (cross-references
//! settle) or the configured maximum pass count is reached. Any failing pass
//! aborts the sequence.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::render::process::{run, ExternalTool, ProcessError};

/// Files whose contents decide whether another pass is needed.
const AUX_EXTENSIONS: &[&str] = &["aux", "toc", "out"];

#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    pub passes: u32,
    pub stable: bool,
    pub artifact: PathBuf,
}

/// Fixed settings for the companion converter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionSettings {
    pub template: PathBuf,
    pub pdf_engine: String,
    pub font: String,
}

fn stem(main_file: &str) -> &str {
    Path::new(main_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(main_file)
}

async fn aux_fingerprint(project_root: &Path, stem: &str) -> Vec<Option<Vec<u8>>> {
    let mut fingerprint = Vec::with_capacity(AUX_EXTENSIONS.len());
    for ext in AUX_EXTENSIONS {
        let path = project_root.join(format!("{stem}.{ext}"));
        fingerprint.push(tokio::fs::read(&path).await.ok());
    }
    fingerprint
}

/// Compiles `main_file` inside `project_root` and returns the primary artifact.
pub async fn compile(
    tool: &ExternalTool,
    max_passes: u32,
    project_root: &Path,
    main_file: &str,
) -> Result<CompileReport, ProcessError> {
    let main_path = project_root.join(main_file);
    if !tokio::fs::try_exists(&main_path).await.unwrap_or(false) {
        return Err(ProcessError::MissingInput(main_path));
    }

    let stem = stem(main_file);
    let max_passes = max_passes.max(1);
    let args = vec![main_file.to_string()];
    let mut previous: Option<Vec<Option<Vec<u8>>>> = None;
    let mut passes = 0;
    let mut stable = false;

    info!("Compiling {main_file} with {}", tool.program);
    while passes < max_passes {
        passes += 1;
        let output = run(tool, &args, Some(project_root), None).await.map_err(|e| {
            warn!(
                "Pass {passes} failed; see {} for details",
                project_root.join(format!("{stem}.log")).display()
            );
            e
        })?;
        debug!("Pass {passes} took {}ms", output.duration.as_millis());

        let fingerprint = aux_fingerprint(project_root, stem).await;
        if previous.as_ref() == Some(&fingerprint) {
            stable = true;
            break;
        }
        previous = Some(fingerprint);
    }

    if !stable && max_passes > 1 {
        warn!("Auxiliary files still changing after {passes} passes; using last output");
    }

    let artifact = project_root.join(format!("{stem}.pdf"));
    if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
        return Err(ProcessError::MissingOutput(artifact));
    }
    info!("Compilation finished after {passes} passes");
    Ok(CompileReport {
        passes,
        stable,
        artifact,
    })
}

/// Renders the companion document: `body_text` goes to the converter on stdin,
/// `metadata` is exposed to the converter's template as `-V key=value`.
pub async fn convert_companion(
    tool: &ExternalTool,
    settings: &CompanionSettings,
    body_text: &str,
    output_path: &Path,
    metadata: &[(String, String)],
) -> Result<(), ProcessError> {
    let mut args = vec![
        "-f".to_string(),
        "markdown".to_string(),
        "-o".to_string(),
        output_path.display().to_string(),
        "--template".to_string(),
        settings.template.display().to_string(),
        format!("--pdf-engine={}", settings.pdf_engine),
        "-V".to_string(),
        format!("mainfont={}", settings.font),
    ];
    for (key, value) in metadata {
        args.push("-V".to_string());
        args.push(format!("{key}={value}"));
    }

    info!("Converting companion document to {}", output_path.display());
    run(tool, &args, None, Some(body_text)).await?;

    if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
        return Err(ProcessError::MissingOutput(output_path.to_path_buf()));
    }
    Ok(())
}
