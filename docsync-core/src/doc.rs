//! Document model: one snapshot of a file, parsed into blocks and sections

use anyhow::{Context, Result};
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};

use crate::block::{self, Block};
use crate::heading_map::{self, HeadingMap};
use crate::section::{build_sections, SectionTree};

/// A parsed document snapshot
#[derive(Clone)]
pub struct Document {
    pub path: PathBuf,
    pub rope: Rope,
    pub blocks: Vec<Block>,
    pub tree: SectionTree,
}

impl Document {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(Self::from_text(path, &content))
    }

    /// Build a document from text already in memory
    pub fn from_text(path: impl Into<PathBuf>, content: &str) -> Self {
        let parsed = block::parse(content);
        let tree = build_sections(&parsed.blocks);

        Self {
            path: path.into(),
            rope: Rope::from_str(content),
            blocks: parsed.blocks,
            tree,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Heading map stored in the document header
    pub fn heading_map(&self) -> HeadingMap {
        heading_map::extract(&self.text())
    }

    /// Get the number of lines in the document
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}

/// Read a file, treating a missing file as an empty document.
///
/// A file that does not exist on one side of a diff means the document was
/// created or deleted.
pub fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} does not exist, treating as empty", path.display());
            Ok(String::new())
        }
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read file: {}", path.display()))
        }
    }
}
