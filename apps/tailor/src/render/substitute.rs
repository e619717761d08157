//! Template Substitution Engine: literal placeholder replacement across a
//! template project. Replacement text is expected to be sanitized already.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionReport {
    pub files_changed: Vec<PathBuf>,
    pub occurrences: usize,
}

impl SubstitutionReport {
    pub fn found(&self) -> bool {
        !self.files_changed.is_empty()
    }
}

/// Collects every file under `dir` with the given extension, depth-first.
async fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            Box::pin(collect_files(&path, extension, out)).await?;
        } else if path.extension().is_some_and(|ext| ext == extension) {
            out.push(path);
        }
    }
    Ok(())
}

/// Replaces every occurrence of `placeholder` with `replacement` in each
/// `*.<extension>` file under `project_root`. Files without the placeholder are
/// not rewritten. A placeholder found nowhere is a warning, not an error.
pub async fn substitute(
    project_root: &Path,
    extension: &str,
    placeholder: &str,
    replacement: &str,
) -> std::io::Result<SubstitutionReport> {
    let mut files = Vec::new();
    collect_files(project_root, extension, &mut files).await?;
    files.sort();

    let mut report = SubstitutionReport::default();
    for path in files {
        let content = tokio::fs::read_to_string(&path).await?;
        let count = content.matches(placeholder).count();
        if count == 0 {
            continue;
        }
        // `str::replace` scans left to right over the original text only, so a
        // replacement containing the token is never expanded again.
        tokio::fs::write(&path, content.replace(placeholder, replacement)).await?;
        debug!("Replaced {count}x '{placeholder}' in {}", path.display());
        report.occurrences += count;
        report.files_changed.push(path);
    }

    if !report.found() {
        warn!(
            "Placeholder '{placeholder}' not found in any .{extension} file under {}",
            project_root.display()
        );
    }
    Ok(report)
}
