//! Profile Parser: turns the applicant's semi-structured profile document into
//! typed sections, labeled cover-letter paragraphs and experience blocks.
//!
//! Headings are lines starting with `## `. Deeper headings (`###`) are body text.
//! Anything else that starts with `##` is a structural error, so a typo in a
//! heading never silently yields an empty section.

use thiserror::Error;

pub mod blocks;
pub mod parser;

pub use blocks::{parse_blocks, Block, BlockMap, BlockMarkers, OrphanPolicy, ORPHAN_BLOCK_KEY};
pub use parser::{LabeledParagraph, ParagraphKind, ProfileDocument, Section, UnknownTagPolicy};

/// Heading aliases for the summary example, one per supported language.
pub const SUMMARY_ALIASES: &[&str] = &[
    "Example of Desired Summary",
    "Beispiel für die gewünschte Zusammenfassung",
];

/// Heading prefixes that introduce a labeled cover-letter paragraph: `## <prefix> (<tag>)`.
pub const PARAGRAPH_HEADINGS: &[&str] = &["Cover Letter Paragraph", "Anschreiben Absatz"];

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("malformed heading on line {line}: {reason} ('{text}')")]
    MalformedHeading {
        line: usize,
        text: String,
        reason: &'static str,
    },

    #[error("invalid block marker pattern: {0}")]
    InvalidMarkerPattern(#[from] regex::Error),
}
