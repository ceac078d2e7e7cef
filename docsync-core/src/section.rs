//! Section tree built from a block list.
//!
//! A section is a heading block, the blocks that follow it up to the next
//! heading, and the deeper-level sections nested under it. A section ends
//! where the next same-or-shallower heading begins.

use crate::block::{self, reconstruct, Block};
use crate::heading::clean_heading;

/// A heading plus its owned blocks and nested subsections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Raw heading text including the marker, e.g. `## Introduction`.
    pub heading: String,
    pub level: u8,
    pub body_blocks: Vec<Block>,
    pub subsections: Vec<Section>,
}

/// Sections of a document plus the blocks that precede the first heading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTree {
    pub preamble: Vec<Block>,
    pub sections: Vec<Section>,
}

impl Section {
    fn open(heading: &Block) -> Self {
        Self {
            heading: heading.text.clone(),
            level: heading.heading_level.unwrap_or(1),
            body_blocks: Vec::new(),
            subsections: Vec::new(),
        }
    }

    /// Heading text with markers stripped.
    pub fn title(&self) -> String {
        clean_heading(&self.heading)
    }

    /// Everything the section owns except its heading line.
    pub fn body_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.body_blocks.is_empty() {
            parts.push(reconstruct(&self.body_blocks));
        }
        for sub in &self.subsections {
            parts.push(sub.full_text());
        }
        parts.join("\n\n")
    }

    /// Heading, body and subsections.
    pub fn full_text(&self) -> String {
        let body = self.body_text();
        if body.is_empty() {
            self.heading.clone()
        } else {
            format!("{}\n\n{}", self.heading, body)
        }
    }

    /// Pre-order walk: this section first, then its subsections.
    pub fn flatten(&self) -> Vec<&Section> {
        let mut out = vec![self];
        for sub in &self.subsections {
            out.extend(sub.flatten());
        }
        out
    }
}

impl SectionTree {
    /// Pre-order walk over every section in the tree.
    pub fn flatten(&self) -> Vec<&Section> {
        self.sections.iter().flat_map(Section::flatten).collect()
    }

    pub fn preamble_text(&self) -> String {
        reconstruct(&self.preamble)
    }
}

/// Group a block list into a section tree.
pub fn build_sections(blocks: &[Block]) -> SectionTree {
    let mut tree = SectionTree::default();
    let mut stack: Vec<Section> = Vec::new();

    for block in blocks {
        match block.heading_level {
            Some(level) if block.is_heading() => {
                while stack.last().is_some_and(|open| open.level >= level) {
                    close_top(&mut stack, &mut tree.sections);
                }
                stack.push(Section::open(block));
            }
            _ => match stack.last_mut() {
                Some(open) => open.body_blocks.push(block.clone()),
                None => tree.preamble.push(block.clone()),
            },
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut tree.sections);
    }

    tree
}

/// Parse `content` and group it into sections.
pub fn parse_sections(content: &str) -> SectionTree {
    build_sections(&block::parse(content).blocks)
}

fn close_top(stack: &mut Vec<Section>, roots: &mut Vec<Section>) {
    let Some(done) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(parent) => parent.subsections.push(done),
        None => roots.push(done),
    }
}
