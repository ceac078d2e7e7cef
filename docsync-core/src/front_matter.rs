//! Front matter detection and splitting.
//!
//! Documents carry their metadata in a YAML header delimited by `---` lines at
//! the very top of the file. Everything after the closing marker is the body.

use anyhow::{bail, Context, Result};
use ropey::Rope;
use serde_yaml::{Mapping, Value};

/// Marker line that opens and closes the metadata header.
pub const FRONT_MATTER_MARKER: &str = "---";

/// Line span of a detected front matter block (0-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter {
    pub start_line: usize,
    pub end_line: usize,
}

impl FrontMatter {
    /// Number of lines consumed by the block, markers included.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// A document split into its raw header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatterSplit<'a> {
    /// YAML between the markers, markers excluded. `None` when there is no header.
    pub header: Option<&'a str>,
    /// Everything after the closing marker line.
    pub body: &'a str,
    /// Number of lines preceding `body` in the original text.
    pub body_line_offset: usize,
}

/// Detects front matter at the top of a document and returns its span.
pub fn detect_front_matter(rope: &Rope) -> Option<FrontMatter> {
    if rope.len_lines() == 0 {
        return None;
    }

    if normalize_line(&rope.line(0)) != FRONT_MATTER_MARKER {
        return None;
    }

    for idx in 1..rope.len_lines() {
        if normalize_line(&rope.line(idx)) == FRONT_MATTER_MARKER {
            return Some(FrontMatter {
                start_line: 0,
                end_line: idx,
            });
        }
    }

    None
}

/// Splits `content` into header and body.
pub fn split_front_matter(content: &str) -> FrontMatterSplit<'_> {
    let rope = Rope::from_str(content);

    let Some(fm) = detect_front_matter(&rope) else {
        return FrontMatterSplit {
            header: None,
            body: content,
            body_line_offset: 0,
        };
    };

    let header_start = rope.line_to_byte(fm.start_line + 1);
    let header_end = rope.line_to_byte(fm.end_line);
    let body_start = if fm.end_line + 1 < rope.len_lines() {
        rope.line_to_byte(fm.end_line + 1)
    } else {
        content.len()
    };

    FrontMatterSplit {
        header: Some(&content[header_start..header_end]),
        body: &content[body_start..],
        body_line_offset: fm.line_count(),
    }
}

/// Parse a raw header into its top-level key/value mapping.
///
/// An empty header parses to an empty mapping; a header that is valid YAML
/// but not a mapping is an error.
pub fn parse_metadata(header: &str) -> Result<Mapping> {
    let value: Value =
        serde_yaml::from_str(header).context("Failed to parse metadata header as YAML")?;

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => bail!("Metadata header is not a key/value mapping"),
    }
}

fn normalize_line(line: &ropey::RopeSlice<'_>) -> String {
    let content: String = line.chunks().collect();
    content.trim().trim_start_matches('\u{feff}').to_string()
}
