//! Experience blocks: groups of bullet lines introduced by a marker token such as
//! `---EXPERIENCE-BLOCK-JUNIOR-DEV---`. The same token is the placeholder in the
//! CV template project.

use regex::Regex;
use tracing::{debug, warn};

use crate::profile::ProfileError;

/// Key used for lines before the first marker under `OrphanPolicy::DefaultBucket`.
pub const ORPHAN_BLOCK_KEY: &str = "---ORPHAN-BLOCK---";

/// What to do with content that appears before the first block marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Drop the lines, logging how many were dropped.
    #[default]
    WarnAndSkip,
    /// Collect them under `ORPHAN_BLOCK_KEY`.
    DefaultBucket,
}

impl OrphanPolicy {
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "bucket" => OrphanPolicy::DefaultBucket,
            _ => OrphanPolicy::WarnAndSkip,
        }
    }
}

/// Marker syntax: `<open>NAME<close>`, matched anywhere in a line.
#[derive(Debug, Clone)]
pub struct BlockMarkers {
    pattern: Regex,
}

impl BlockMarkers {
    pub fn new(open: &str, close: &str) -> Result<Self, ProfileError> {
        let pattern = Regex::new(&format!(
            "{}.*?{}",
            regex::escape(open),
            regex::escape(close)
        ))?;
        Ok(Self { pattern })
    }

    pub fn find<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern.find(line).map(|m| m.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub marker: String,
    pub lines: Vec<String>,
}

/// Blocks keyed by marker token, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMap {
    blocks: Vec<Block>,
}

impl BlockMap {
    pub fn get(&self, marker: &str) -> Option<&[String]> {
        self.blocks
            .iter()
            .find(|b| b.marker == marker)
            .map(|b| b.lines.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Opens (or re-opens) the block for `marker`, returning its index.
    fn open(&mut self, marker: &str) -> usize {
        if let Some(idx) = self.blocks.iter().position(|b| b.marker == marker) {
            return idx;
        }
        self.blocks.push(Block {
            marker: marker.to_string(),
            lines: Vec::new(),
        });
        self.blocks.len() - 1
    }
}

/// Scans `raw` line by line. A marker line switches the active block and is
/// discarded; blank lines and `## ` headings are skipped without closing the
/// block; every other line is appended, trimmed, to the active block.
pub fn parse_blocks(raw: &str, markers: &BlockMarkers, orphans: OrphanPolicy) -> BlockMap {
    let mut map = BlockMap::default();
    let mut active: Option<usize> = None;
    let mut orphan_lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        if let Some(marker) = markers.find(line) {
            active = Some(map.open(marker));
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("## ") {
            continue;
        }
        match active {
            Some(idx) => map.blocks[idx].lines.push(trimmed.to_string()),
            None => orphan_lines.push(trimmed.to_string()),
        }
    }

    if !orphan_lines.is_empty() {
        match orphans {
            OrphanPolicy::WarnAndSkip => {
                warn!(
                    "Dropped {} profile lines that precede the first block marker",
                    orphan_lines.len()
                );
            }
            OrphanPolicy::DefaultBucket => {
                map.blocks.insert(
                    0,
                    Block {
                        marker: ORPHAN_BLOCK_KEY.to_string(),
                        lines: orphan_lines,
                    },
                );
            }
        }
    }

    debug!("Parsed {} experience blocks", map.len());
    map
}
