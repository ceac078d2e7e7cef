//! Section-level change detection
//!
//! Compares two versions of a source document, and two versions of its
//! translation, heading by heading. Headings are matched across versions by
//! exact cleaned text, so a rename shows up as a deletion plus an addition.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::front_matter::split_front_matter;
use crate::heading_map;
use crate::section::parse_sections;

/// Heading reported for changes before the first heading.
pub const PREAMBLE_HEADING: &str = "(preamble/frontmatter)";

/// How a section changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Deleted => "deleted",
            ChangeType::Modified => "modified",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Added/removed line counts between two versions of a section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    pub added: usize,
    pub removed: usize,
}

/// One section flagged for translation work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedSection {
    /// Raw heading, or [`PREAMBLE_HEADING`].
    pub heading: String,
    pub change_type: ChangeType,
    /// Heading level; 0 for the preamble.
    pub level: u8,
    pub lines: LineStats,
}

impl ChangedSection {
    pub fn is_preamble(&self) -> bool {
        self.level == 0 && self.heading == PREAMBLE_HEADING
    }
}

/// Cleaned heading text plus its occurrence ordinal within the document.
type EntryKey = (String, usize);

/// A heading and everything it owns up to the next same-or-shallower heading.
#[derive(Debug, Clone)]
struct HeadingEntry {
    key: EntryKey,
    heading: String,
    level: u8,
    body: String,
    full_text: String,
}

/// Everything the diff looks at in one document version.
struct Snapshot {
    header: Option<String>,
    preamble: String,
    entries: Vec<HeadingEntry>,
}

impl Snapshot {
    fn new(content: &str) -> Self {
        let header = split_front_matter(content).header.map(str::to_string);
        let tree = parse_sections(content);

        let mut seen: HashMap<String, usize> = HashMap::new();
        let entries = tree
            .flatten()
            .into_iter()
            .map(|section| {
                let title = section.title();
                let ordinal = seen.entry(title.clone()).or_insert(0);
                *ordinal += 1;
                HeadingEntry {
                    key: (title, *ordinal),
                    heading: section.heading.clone(),
                    level: section.level,
                    body: section.body_text(),
                    full_text: section.full_text(),
                }
            })
            .collect();

        Self {
            header,
            preamble: tree.preamble_text(),
            entries,
        }
    }

    fn preamble_text(&self) -> String {
        match &self.header {
            Some(header) => format!("{header}\n{}", self.preamble),
            None => self.preamble.clone(),
        }
    }

    fn same_preamble(&self, other: &Snapshot) -> bool {
        self.header == other.header && self.preamble == other.preamble
    }

    fn index(&self) -> HashMap<&EntryKey, &HeadingEntry> {
        self.entries.iter().map(|entry| (&entry.key, entry)).collect()
    }
}

/// Compute which sections need translation work.
///
/// A section is reported when the source added, deleted or modified it, or
/// when its translation changed independently of the source. Identical
/// before/after pairs report nothing.
pub fn identify_changed_sections(
    source_before: &str,
    source_after: &str,
    target_before: &str,
    target_after: &str,
) -> Vec<ChangedSection> {
    let sb = Snapshot::new(source_before);
    let sa = Snapshot::new(source_after);
    let tb = Snapshot::new(target_before);
    let ta = Snapshot::new(target_after);

    let mut changes = Vec::new();

    if !sb.same_preamble(&sa) || !tb.same_preamble(&ta) {
        let lines = if sb.same_preamble(&sa) {
            line_stats(&tb.preamble_text(), &ta.preamble_text())
        } else {
            line_stats(&sb.preamble_text(), &sa.preamble_text())
        };
        changes.push(ChangedSection {
            heading: PREAMBLE_HEADING.to_string(),
            change_type: ChangeType::Modified,
            level: 0,
            lines,
        });
    }

    let before = sb.index();
    let after = sa.index();
    let mut flagged: HashSet<String> = HashSet::new();

    for entry in &sa.entries {
        let change = match before.get(&entry.key) {
            None => Some((ChangeType::Added, line_stats("", &entry.full_text))),
            Some(old) if old.body != entry.body => Some((
                ChangeType::Modified,
                line_stats(&old.full_text, &entry.full_text),
            )),
            Some(_) => None,
        };
        if let Some((change_type, lines)) = change {
            flagged.insert(entry.key.0.clone());
            changes.push(changed(entry, change_type, lines));
        }
    }

    for entry in &sb.entries {
        if !after.contains_key(&entry.key) {
            flagged.insert(entry.key.0.clone());
            changes.push(changed(
                entry,
                ChangeType::Deleted,
                line_stats(&entry.full_text, ""),
            ));
        }
    }

    // Translations of flagged source headings are already covered.
    for map in [
        heading_map::extract(target_before),
        heading_map::extract(target_after),
    ] {
        let translated: Vec<String> = flagged
            .iter()
            .filter_map(|source| map.get(source))
            .map(str::to_string)
            .collect();
        flagged.extend(translated);
    }

    let target_before_index = tb.index();
    for entry in &ta.entries {
        let Some(old) = target_before_index.get(&entry.key) else {
            continue;
        };
        if old.body != entry.body && !flagged.contains(&entry.key.0) {
            flagged.insert(entry.key.0.clone());
            changes.push(changed(
                entry,
                ChangeType::Modified,
                line_stats(&old.full_text, &entry.full_text),
            ));
        }
    }

    log::debug!("Identified {} changed sections", changes.len());
    changes
}

fn changed(entry: &HeadingEntry, change_type: ChangeType, lines: LineStats) -> ChangedSection {
    ChangedSection {
        heading: entry.heading.clone(),
        change_type,
        level: entry.level,
        lines,
    }
}

/// Count inserted and deleted lines between two texts.
pub fn line_stats(before: &str, after: &str) -> LineStats {
    let diff = TextDiff::from_lines(before, after);

    let mut stats = LineStats::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.added += 1,
            ChangeTag::Delete => stats.removed += 1,
            ChangeTag::Equal => {}
        }
    }
    stats
}
