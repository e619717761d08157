use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::MODEL;
use crate::models::Language;
use crate::profile::{OrphanPolicy, UnknownTagPolicy};
use crate::render::{CompanionSettings, ExternalTool};

/// Applicant identity printed on the cover letter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorInfo {
    pub name: String,
    pub street: String,
    pub city: String,
    pub phone: String,
    pub email: String,
}

/// Inputs that depend on the posting's language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageAssets {
    pub profile: PathBuf,
    pub prompts: PathBuf,
    pub cv_project: PathBuf,
}

/// Application configuration loaded from environment variables.
/// Built once at startup and passed by reference to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub jobs_csv: PathBuf,
    pub applications_dir: PathBuf,
    pub assets_en: LanguageAssets,
    pub assets_de: LanguageAssets,
    pub main_tex: String,
    pub template_extension: String,
    pub compiler: ExternalTool,
    pub max_passes: u32,
    pub converter: ExternalTool,
    pub companion: CompanionSettings,
    pub generation_timeout: Duration,
    pub model: String,
    pub anthropic_api_key: Option<String>,
    pub summary_placeholder: String,
    pub block_marker_open: String,
    pub block_marker_close: String,
    pub unknown_tags: UnknownTagPolicy,
    pub orphan_lines: OrphanPolicy,
    pub author: AuthorInfo,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let templates_dir = PathBuf::from(var("TAILOR_TEMPLATES_DIR", "templates"));
        let assets = |lang: &str| LanguageAssets {
            profile: PathBuf::from(var(
                &format!("TAILOR_PROFILE_{}", lang.to_uppercase()),
                &format!("my_profile_{lang}.txt"),
            )),
            prompts: PathBuf::from(var(
                &format!("TAILOR_PROMPTS_{}", lang.to_uppercase()),
                &format!("prompts_{lang}.json"),
            )),
            cv_project: lookup(&format!("TAILOR_CV_PROJECT_{}", lang.to_uppercase()))
                .map(PathBuf::from)
                .unwrap_or_else(|| templates_dir.join(format!("cv_project_{lang}"))),
        };

        let max_passes = match lookup("TAILOR_MAX_PASSES") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .context("TAILOR_MAX_PASSES must be a positive number")?,
            None => 3,
        };
        if max_passes == 0 {
            anyhow::bail!("TAILOR_MAX_PASSES must be at least 1");
        }

        Ok(Config {
            jobs_csv: PathBuf::from(var("TAILOR_JOBS_CSV", "jobs.csv")),
            applications_dir: PathBuf::from(var("TAILOR_APPLICATIONS_DIR", "applications")),
            assets_en: assets("en"),
            assets_de: assets("de"),
            main_tex: var("TAILOR_MAIN_TEX", "cv.tex"),
            template_extension: var("TAILOR_TEMPLATE_EXTENSION", "tex"),
            compiler: ExternalTool {
                program: var("TAILOR_LATEX_COMPILER", "xelatex"),
                leading_args: split_args(&var("TAILOR_COMPILER_ARGS", "-interaction=nonstopmode")),
                timeout: secs("TAILOR_COMPILER_TIMEOUT_SECS", 300)?,
            },
            max_passes,
            converter: ExternalTool {
                program: var("TAILOR_CONVERTER", "pandoc"),
                leading_args: split_args(&var("TAILOR_CONVERTER_ARGS", "")),
                timeout: secs("TAILOR_CONVERTER_TIMEOUT_SECS", 120)?,
            },
            companion: CompanionSettings {
                template: PathBuf::from(var(
                    "TAILOR_COVER_LETTER_TEMPLATE",
                    "cover_letter_latex_template.tex",
                )),
                pdf_engine: var("TAILOR_PDF_ENGINE", "xelatex"),
                font: var("TAILOR_COVER_LETTER_FONT", "Garamond"),
            },
            generation_timeout: secs("TAILOR_GENERATION_TIMEOUT_SECS", 120)?,
            model: var("TAILOR_MODEL", MODEL),
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            summary_placeholder: var(
                "TAILOR_SUMMARY_PLACEHOLDER",
                "[---PROFILE-SUMMARY-PLACEHOLDER---]",
            ),
            block_marker_open: var("TAILOR_BLOCK_MARKER_OPEN", "---EXPERIENCE-BLOCK-"),
            block_marker_close: var("TAILOR_BLOCK_MARKER_CLOSE", "---"),
            unknown_tags: UnknownTagPolicy::from_setting(&var("TAILOR_UNKNOWN_TAGS", "warn")),
            orphan_lines: OrphanPolicy::from_setting(&var("TAILOR_ORPHAN_LINES", "warn")),
            author: AuthorInfo {
                name: var("AUTHOR_NAME", ""),
                street: var("AUTHOR_STREET", ""),
                city: var("AUTHOR_CITY", ""),
                phone: var("AUTHOR_PHONE", ""),
                email: var("AUTHOR_EMAIL", ""),
            },
            log_level: var("TAILOR_LOG", "info"),
        })
    }

    pub fn assets(&self, language: Language) -> &LanguageAssets {
        match language {
            Language::En => &self.assets_en,
            Language::De => &self.assets_de,
        }
    }

    /// The API key is only needed when generating, so it is checked on demand.
    pub fn require_api_key(&self) -> Result<&str> {
        self.anthropic_api_key
            .as_deref()
            .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")
    }
}

fn split_args(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.jobs_csv, PathBuf::from("jobs.csv"));
        assert_eq!(config.compiler.program, "xelatex");
        assert_eq!(config.compiler.leading_args, vec!["-interaction=nonstopmode"]);
        assert_eq!(config.compiler.timeout, Duration::from_secs(300));
        assert_eq!(config.converter.program, "pandoc");
        assert!(config.converter.leading_args.is_empty());
        assert_eq!(config.converter.timeout, Duration::from_secs(120));
        assert_eq!(config.max_passes, 3);
        assert_eq!(config.companion.font, "Garamond");
        assert_eq!(config.model, MODEL);
        assert_eq!(config.summary_placeholder, "[---PROFILE-SUMMARY-PLACEHOLDER---]");
        assert_eq!(
            config.assets(Language::De).cv_project,
            PathBuf::from("templates").join("cv_project_de")
        );
        assert_eq!(
            config.assets(Language::En).profile,
            PathBuf::from("my_profile_en.txt")
        );
        assert_eq!(config.unknown_tags, UnknownTagPolicy::WarnAndSkip);
        assert_eq!(config.orphan_lines, OrphanPolicy::WarnAndSkip);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TAILOR_TEMPLATES_DIR", "/srv/templates"),
            ("TAILOR_PROMPTS_EN", "/srv/prompts.json"),
            ("TAILOR_LATEX_COMPILER", "lualatex"),
            ("TAILOR_COMPILER_ARGS", "-halt-on-error  -interaction=batchmode"),
            ("TAILOR_MAX_PASSES", "5"),
            ("TAILOR_UNKNOWN_TAGS", "static"),
            ("TAILOR_ORPHAN_LINES", "bucket"),
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("AUTHOR_NAME", "Alex Applicant"),
        ])
        .unwrap();
        assert_eq!(
            config.assets(Language::En).cv_project,
            PathBuf::from("/srv/templates/cv_project_en")
        );
        assert_eq!(
            config.assets(Language::En).prompts,
            PathBuf::from("/srv/prompts.json")
        );
        assert_eq!(config.compiler.program, "lualatex");
        assert_eq!(
            config.compiler.leading_args,
            vec!["-halt-on-error", "-interaction=batchmode"]
        );
        assert_eq!(config.max_passes, 5);
        assert_eq!(config.unknown_tags, UnknownTagPolicy::TreatAsStatic);
        assert_eq!(config.orphan_lines, OrphanPolicy::DefaultBucket);
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.author.name, "Alex Applicant");
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(config(&[("TAILOR_COMPILER_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("TAILOR_MAX_PASSES", "0")]).is_err());
    }
}
