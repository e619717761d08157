use tracing::{debug, warn};

use crate::profile::{ProfileError, PARAGRAPH_HEADINGS};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A `## ` heading and everything up to the next heading, trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub body: String,
    /// 1-based line number of the heading.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphKind {
    /// `ai:<kind>`: generated with the `cover_letter_<kind>` prompt; the body is
    /// fed back to the prompt as `<kind>_example`.
    Ai { kind: String },
    /// `static`: used verbatim (after sanitization).
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledParagraph {
    pub kind: ParagraphKind,
    pub body: String,
}

/// What to do with a labeled paragraph whose tag is neither `ai:*` nor `static`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownTagPolicy {
    /// Log a warning and leave the paragraph out of the letter.
    #[default]
    WarnAndSkip,
    /// Keep the paragraph as literal text.
    TreatAsStatic,
}

impl UnknownTagPolicy {
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "static" => UnknownTagPolicy::TreatAsStatic,
            _ => UnknownTagPolicy::WarnAndSkip,
        }
    }
}

/// A parsed profile: the raw text plus its heading-delimited sections.
#[derive(Debug, Clone)]
pub struct ProfileDocument {
    raw: String,
    sections: Vec<Section>,
}

enum HeadingLine<'a> {
    Heading(&'a str),
    NotHeading,
}

/// Classifies one line. `## Title` is a heading, `###…` is body text,
/// any other `##` form is malformed.
fn classify(line: &str, line_no: usize) -> Result<HeadingLine<'_>, ProfileError> {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix("##") else {
        return Ok(HeadingLine::NotHeading);
    };
    if rest.starts_with('#') {
        return Ok(HeadingLine::NotHeading);
    }
    let malformed = |reason| ProfileError::MalformedHeading {
        line: line_no,
        text: line.trim().to_string(),
        reason,
    };
    let Some(title) = rest.strip_prefix(' ') else {
        return Err(malformed("expected a space after '##'"));
    };
    let title = title.trim();
    if title.is_empty() {
        return Err(malformed("heading has no title"));
    }
    Ok(HeadingLine::Heading(title))
}

/// Splits a labeled-paragraph heading into its tag, if the heading is one.
fn paragraph_tag(title: &str) -> Option<Result<&str, &'static str>> {
    let rest = PARAGRAPH_HEADINGS
        .iter()
        .find_map(|prefix| title.strip_prefix(prefix))
        .filter(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))?;
    let tag = rest
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or("labeled paragraph heading needs a '(tag)'");
    Some(tag)
}

impl ProfileDocument {
    /// Scans the document line by line, collecting sections and validating
    /// heading syntax.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ProfileError> {
        let raw = raw.into();
        let mut sections: Vec<Section> = Vec::new();
        let mut body: Vec<&str> = Vec::new();

        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            match classify(line, line_no)? {
                HeadingLine::Heading(title) => {
                    if let Some(Err(reason)) = paragraph_tag(title) {
                        return Err(ProfileError::MalformedHeading {
                            line: line_no,
                            text: line.trim().to_string(),
                            reason,
                        });
                    }
                    if let Some(section) = sections.last_mut() {
                        section.body = body.join("\n").trim().to_string();
                    }
                    body.clear();
                    sections.push(Section {
                        heading: title.to_string(),
                        body: String::new(),
                        line: line_no,
                    });
                }
                HeadingLine::NotHeading => {
                    if !sections.is_empty() {
                        body.push(line);
                    }
                }
            }
        }
        if let Some(section) = sections.last_mut() {
            section.body = body.join("\n").trim().to_string();
        }

        debug!("Parsed profile with {} sections", sections.len());
        Ok(Self { raw, sections })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Body of the first section whose heading equals one of `aliases`, tried in
    /// order. Returns an empty string (with a warning) when no alias is present.
    pub fn extract_section(&self, aliases: &[&str]) -> String {
        for alias in aliases {
            if let Some(section) = self.sections.iter().find(|s| s.heading == *alias) {
                return section.body.clone();
            }
        }
        warn!("Could not find any of the sections {:?} in the profile", aliases);
        String::new()
    }

    /// Labeled cover-letter paragraphs in document order.
    pub fn labeled_paragraphs(&self, policy: UnknownTagPolicy) -> Vec<LabeledParagraph> {
        let mut paragraphs = Vec::new();
        for section in &self.sections {
            let Some(Ok(tag)) = paragraph_tag(&section.heading) else {
                continue;
            };
            let tag = tag.trim().to_lowercase();

            let kind = if let Some(rest) = tag.strip_prefix("ai:") {
                // `ai:<kind>:<anything>` still selects `<kind>`.
                let kind = rest.split(':').next().unwrap_or("");
                ParagraphKind::Ai {
                    kind: kind.trim().to_string(),
                }
            } else if tag == "static" {
                ParagraphKind::Static
            } else {
                match policy {
                    UnknownTagPolicy::WarnAndSkip => {
                        warn!(
                            "Ignoring paragraph with unknown tag '{tag}' (line {})",
                            section.line
                        );
                        continue;
                    }
                    UnknownTagPolicy::TreatAsStatic => {
                        debug!("Treating paragraph tag '{tag}' as static");
                        ParagraphKind::Static
                    }
                }
            };

            paragraphs.push(LabeledParagraph {
                kind,
                body: section.body.clone(),
            });
        }
        if paragraphs.is_empty() {
            warn!("No labeled cover letter paragraphs found in profile");
        }
        paragraphs
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
