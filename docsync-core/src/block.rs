//! Block-level document structure.
//!
//! A document snapshot is turned into a flat, ordered list of [`Block`]s: one
//! per top-level markdown element. Headings carry a level and an anchor id, and
//! every other block is stamped with the id of its enclosing level-1/2 heading.
//! Level-3+ headings deliberately do not open a new grouping context.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use ropey::Rope;
use serde_yaml::Mapping;
use std::fmt;
use std::ops::Range;

use crate::front_matter::{parse_metadata, split_front_matter};
use crate::heading::heading_id;

/// Headings at or above this level reset the grouping context.
const GROUPING_LEVEL: u8 = 2;

/// Kind of a parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Heading,
    Paragraph,
    Code,
    List,
    Blockquote,
    Table,
    ThematicBreak,
    RawMarkup,
    Math,
    Directive,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Code => "code",
            BlockKind::List => "list",
            BlockKind::Blockquote => "blockquote",
            BlockKind::Table => "table",
            BlockKind::ThematicBreak => "thematic-break",
            BlockKind::RawMarkup => "raw-markup",
            BlockKind::Math => "math",
            BlockKind::Directive => "directive",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed unit of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Verbatim source slice, trailing whitespace removed.
    pub text: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub heading_level: Option<u8>,
    pub heading_id: Option<String>,
    pub parent_heading_id: Option<String>,
}

impl Block {
    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }
}

/// Result of parsing one document snapshot
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    /// Parsed metadata header; `None` when absent or unparseable.
    pub metadata: Option<Mapping>,
}

/// Parse raw document text into blocks and metadata.
///
/// Never fails: anything the markdown parser does not account for becomes a
/// raw-markup block, and an unparseable header yields `metadata: None`.
pub fn parse(content: &str) -> ParsedDocument {
    let split = split_front_matter(content);

    let metadata = split.header.and_then(|header| match parse_metadata(header) {
        Ok(mapping) => Some(mapping),
        Err(err) => {
            log::warn!("Ignoring unparseable metadata header: {err:#}");
            None
        }
    });

    let body = split.body;
    let rope = Rope::from_str(body);
    let line_of = |byte: usize| rope.byte_to_line(byte) + 1 + split.body_line_offset;

    let mut blocks = Vec::new();
    let mut context: Option<String> = None;
    let mut push = |kind: BlockKind, range: Range<usize>, level: Option<u8>| {
        let text = body[range.clone()].trim_end();
        if text.trim().is_empty() {
            return;
        }
        let end_byte = range.start + text.len() - 1;

        let (heading_id, parent_heading_id) = match level {
            Some(level) => {
                let id = heading_id(text);
                if level <= GROUPING_LEVEL {
                    context = Some(id.clone());
                    (Some(id), None)
                } else {
                    (Some(id), context.clone())
                }
            }
            None => (None, context.clone()),
        };

        blocks.push(Block {
            kind,
            text: text.to_string(),
            start_line: line_of(range.start),
            end_line: line_of(end_byte),
            heading_level: level,
            heading_id,
            parent_heading_id,
        });
    };

    let mut depth = 0usize;
    let mut covered = 0usize;

    for (event, range) in Parser::new_ext(body, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    if range.start > covered {
                        push_gap(&mut push, body, covered..range.start);
                    }
                    let (kind, level) = classify(&tag, &body[range.clone()]);
                    push(kind, range.clone(), level);
                    covered = covered.max(range.end);
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            _ if depth == 0 => {
                if range.start > covered {
                    push_gap(&mut push, body, covered..range.start);
                }
                let kind = match event {
                    Event::Rule => BlockKind::ThematicBreak,
                    Event::DisplayMath(_) => BlockKind::Math,
                    _ => BlockKind::RawMarkup,
                };
                push(kind, range.clone(), None);
                covered = covered.max(range.end);
            }
            _ => {}
        }
    }

    if covered < body.len() {
        push_gap(&mut push, body, covered..body.len());
    }

    ParsedDocument { blocks, metadata }
}

/// Join block texts with a blank line between them.
///
/// Best-effort inverse of [`parse`]: the original inter-block whitespace is
/// not preserved.
pub fn reconstruct(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Source text the parser emitted no event for, e.g. link reference definitions.
fn push_gap(
    push: &mut impl FnMut(BlockKind, Range<usize>, Option<u8>),
    body: &str,
    range: Range<usize>,
) {
    let gap = &body[range.clone()];
    let Some(offset) = gap.find(|c: char| !c.is_whitespace()) else {
        return;
    };
    push(BlockKind::RawMarkup, range.start + offset..range.end, None);
}

fn classify(tag: &Tag<'_>, text: &str) -> (BlockKind, Option<u8>) {
    match tag {
        Tag::Heading { level, .. } => (BlockKind::Heading, Some(heading_level_number(*level))),
        Tag::Paragraph => (classify_paragraph(text), None),
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) if info.trim_start().starts_with('{') => {
            (BlockKind::Directive, None)
        }
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) if info.trim() == "math" => {
            (BlockKind::Math, None)
        }
        Tag::CodeBlock(_) => (BlockKind::Code, None),
        Tag::List(_) => (BlockKind::List, None),
        Tag::BlockQuote(_) => (BlockKind::Blockquote, None),
        Tag::Table(_) => (BlockKind::Table, None),
        _ => (BlockKind::RawMarkup, None),
    }
}

fn classify_paragraph(text: &str) -> BlockKind {
    let trimmed = text.trim();
    if trimmed.starts_with(":::") {
        BlockKind::Directive
    } else if trimmed.len() >= 4 && trimmed.starts_with("$$") && trimmed.ends_with("$$") {
        BlockKind::Math
    } else {
        BlockKind::Paragraph
    }
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
