use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Language variant of a job posting. Selects the profile, prompts and CV project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    /// Parses the ledger's `Language` column. Empty means English; unknown tags
    /// fall back to English with a warning.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "" | "EN" => Language::En,
            "DE" => Language::De,
            other => {
                warn!("Unknown language tag '{other}', falling back to EN");
                Language::En
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::De => "DE",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One row of the job ledger. Natural key = (company, title).
///
/// `status` is empty until the record is processed, then holds the
/// `Generated on <date>` label. It is never reset by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "CompanyName")]
    pub company: String,
    #[serde(rename = "JobTitle")]
    pub title: String,
    #[serde(rename = "JobDescription")]
    pub description: String,
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "HRManagerName", default)]
    pub hr_name: String,
    #[serde(rename = "HRManagerGender", default)]
    pub hr_gender: String,
    #[serde(rename = "CompanyStreet", default)]
    pub company_street: String,
    #[serde(rename = "CompanyCity", default)]
    pub company_city: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl JobRecord {
    pub fn is_pending(&self) -> bool {
        self.status.trim().is_empty()
    }

    pub fn language(&self) -> Language {
        Language::from_tag(&self.language)
    }

    /// Company name as a single path component, see [`path_component`].
    pub fn company_slug(&self) -> String {
        path_component(&self.company)
    }

    /// Deterministic per-job folder name: the company slug, then the title with
    /// everything but alphanumerics dropped.
    pub fn folder_name(&self) -> String {
        let title: String = self.title.chars().filter(|c| c.is_alphanumeric()).collect();
        format!("{}_{}", self.company_slug(), title)
    }
}

/// Spaces become `_`; only alphanumerics, `_` and `-` survive. The result can
/// never contain a separator or a `.`, so it cannot leave its parent directory.
pub fn path_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect()
}
