//! Section-scoped synchronisation of one translated document.
//!
//! Given two versions of a source document and the current translation, only
//! the top-level sections that changed in the source are retranslated; every
//! other target section is carried over verbatim, so manual corrections in
//! the translation survive. The heading map in the target header is then
//! reconciled against the new trees.

use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::config::LanguageConfig;
use crate::diff::{identify_changed_sections, ChangeType, ChangedSection, PREAMBLE_HEADING};
use crate::front_matter::{split_front_matter, FRONT_MATTER_MARKER};
use crate::heading::clean_heading;
use crate::heading_map::{self, HeadingMap};
use crate::locate::locate_section;
use crate::reconcile::update_heading_map;
use crate::section::{parse_sections, Section, SectionTree};

/// Surrounding information handed to the translator with each section.
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext<'a> {
    pub source_language: &'a str,
    pub target_language: &'a str,
    /// Heading of the section being translated; empty for the preamble or a
    /// whole document.
    pub heading: &'a str,
    /// Full text of the current source document.
    pub document: &'a str,
}

/// Produces translated markdown for a section of the source document.
pub trait SectionTranslator {
    /// Translate `source`, using `existing` (the current translation of the
    /// same section, if any) as a reference for terminology and style.
    fn translate_section(
        &self,
        source: &str,
        existing: Option<&str>,
        context: &TranslationContext<'_>,
    ) -> Result<String>;
}

/// Result of synchronising one document
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// New target document text, heading map included.
    pub text: String,
    /// Changes that were detected in the source.
    pub changes: Vec<ChangedSection>,
    /// Sections sent to the translator, by source heading.
    pub translated: Vec<String>,
    /// The whole body was retranslated because a changed section could not
    /// be located in the target.
    pub full_document: bool,
}

/// Bring `target` up to date with the edit from `source_before` to `source_after`.
pub fn sync_document(
    source_before: &str,
    source_after: &str,
    target: &str,
    translator: &dyn SectionTranslator,
    languages: &LanguageConfig,
) -> Result<SyncOutcome> {
    let changes = identify_changed_sections(source_before, source_after, target, target);
    if changes.is_empty() {
        return Ok(SyncOutcome {
            text: target.to_string(),
            changes,
            translated: Vec::new(),
            full_document: false,
        });
    }

    let old_source = parse_sections(source_before);
    let new_source = parse_sections(source_after);
    let old_target = parse_sections(target);
    let map = heading_map::extract(target);

    let context = TranslationContext {
        source_language: &languages.source,
        target_language: &languages.target,
        heading: "",
        document: source_after,
    };

    let retranslate: HashSet<String> = changes
        .iter()
        .filter(|change| change.change_type != ChangeType::Deleted)
        .map(|change| clean_heading(&change.heading))
        .collect();

    let mut translated = Vec::new();
    let mut parts = Vec::new();

    // A header-only edit also flags the preamble, but leaves its blocks alone.
    let source_preamble = new_source.preamble_text();
    let preamble_changed = changes.iter().any(ChangedSection::is_preamble)
        && old_source.preamble_text() != source_preamble;
    let old_preamble = old_target.preamble_text();
    if preamble_changed {
        if !source_preamble.is_empty() {
            let existing = (!old_preamble.is_empty()).then_some(old_preamble.as_str());
            let text = translator
                .translate_section(&source_preamble, existing, &context)
                .context("Failed to translate document preamble")?;
            translated.push(PREAMBLE_HEADING.to_string());
            parts.push(text.trim().to_string());
        }
    } else if !old_preamble.is_empty() {
        parts.push(old_preamble);
    }

    for source in &new_source.sections {
        let title = source.title();
        let existing = find_target(source, &map, &old_source, &old_target);

        if !retranslate.contains(&title) {
            if let Some(existing) = existing {
                parts.push(existing.full_text());
                continue;
            }
        }

        let is_new = !old_source.sections.iter().any(|s| s.title() == title);
        if existing.is_none() && !is_new {
            log::info!("Section '{title}' not found in translation, retranslating whole document");
            return full_document_sync(
                source_after,
                target,
                translator,
                languages,
                changes,
                &map,
                &new_source,
            );
        }

        let source_text = source.full_text();
        let existing_text = existing.map(Section::full_text);
        let heading = source.heading.as_str();
        let text = translator
            .translate_section(
                &source_text,
                existing_text.as_deref(),
                &TranslationContext { heading, ..context },
            )
            .with_context(|| format!("Failed to translate section '{title}'"))?;
        log::debug!("Translated section '{title}'");
        translated.push(title);
        parts.push(text.trim().to_string());
    }

    let body = parts.join("\n\n");
    let text = assemble(split_front_matter(target).header, &body);
    let text = refresh_heading_map(&text, &map, &new_source);

    Ok(SyncOutcome {
        text,
        changes,
        translated,
        full_document: false,
    })
}

/// Target counterpart of a source section: through the heading map first,
/// then by its position in the previous source version.
fn find_target<'a>(
    source: &Section,
    map: &HeadingMap,
    old_source: &SectionTree,
    old_target: &'a SectionTree,
) -> Option<&'a Section> {
    if let Some(found) = locate_section(&source.heading, map, &old_target.sections) {
        return Some(found);
    }

    let title = source.title();
    let position = old_source
        .sections
        .iter()
        .position(|s| s.title() == title)?;
    old_target.sections.get(position)
}

fn full_document_sync(
    source_after: &str,
    target: &str,
    translator: &dyn SectionTranslator,
    languages: &LanguageConfig,
    changes: Vec<ChangedSection>,
    map: &HeadingMap,
    new_source: &SectionTree,
) -> Result<SyncOutcome> {
    let source_body = split_front_matter(source_after).body.trim();
    let target_split = split_front_matter(target);
    let target_body = target_split.body.trim();

    let context = TranslationContext {
        source_language: &languages.source,
        target_language: &languages.target,
        heading: "",
        document: source_after,
    };
    let body = translator
        .translate_section(
            source_body,
            (!target_body.is_empty()).then_some(target_body),
            &context,
        )
        .context("Failed to translate whole document")?;

    let text = assemble(target_split.header, body.trim());
    let text = refresh_heading_map(&text, map, new_source);

    Ok(SyncOutcome {
        text,
        changes,
        translated: new_source.sections.iter().map(Section::title).collect(),
        full_document: true,
    })
}

fn assemble(header: Option<&str>, body: &str) -> String {
    let mut text = String::new();
    if let Some(header) = header {
        text.push_str(FRONT_MATTER_MARKER);
        text.push('\n');
        text.push_str(header);
        text.push_str(FRONT_MATTER_MARKER);
        text.push_str("\n\n");
    }
    text.push_str(body);
    text.push('\n');
    text
}

fn refresh_heading_map(text: &str, old_map: &HeadingMap, source: &SectionTree) -> String {
    let target = parse_sections(text);
    let map = update_heading_map(old_map, &source.sections, &target.sections);
    heading_map::inject(text, &map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Prefixes every line with a language tag and records what it was asked to translate.
    #[derive(Default)]
    struct TaggingTranslator {
        calls: RefCell<Vec<String>>,
    }

    impl SectionTranslator for TaggingTranslator {
        fn translate_section(
            &self,
            source: &str,
            _existing: Option<&str>,
            context: &TranslationContext<'_>,
        ) -> Result<String> {
            self.calls.borrow_mut().push(source.to_string());
            let tag = context.target_language;
            Ok(source
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        String::new()
                    } else if line.starts_with('#') {
                        let marks = line.chars().take_while(|&c| c == '#').count();
                        format!("{} [{tag}] {}", &line[..marks], line[marks..].trim())
                    } else {
                        format!("[{tag}] {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }

    struct FailingTranslator;

    impl SectionTranslator for FailingTranslator {
        fn translate_section(
            &self,
            _source: &str,
            _existing: Option<&str>,
            _context: &TranslationContext<'_>,
        ) -> Result<String> {
            anyhow::bail!("service unavailable")
        }
    }

    fn languages() -> LanguageConfig {
        LanguageConfig {
            source: "en".to_string(),
            target: "zh".to_string(),
        }
    }

    const SOURCE: &str = "## Intro\n\nHello.\n\n## Usage\n\nRun it.\n";
    const TARGET: &str = "---\nheading-map:\n  Intro: 介绍\n  Usage: 用法\n---\n\n## 介绍\n\n你好。\n\n## 用法\n\n运行它。\n";

    #[test]
    fn test_no_changes_returns_target_unchanged() -> Result<()> {
        let translator = TaggingTranslator::default();
        let outcome = sync_document(SOURCE, SOURCE, TARGET, &translator, &languages())?;
        assert_eq!(outcome.text, TARGET);
        assert!(outcome.changes.is_empty());
        assert!(translator.calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_modified_section_is_retranslated_in_place() -> Result<()> {
        let after = "## Intro\n\nHello.\n\n## Usage\n\nRun it twice.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, TARGET, &translator, &languages())?;
        assert_eq!(outcome.translated, vec!["Usage".to_string()]);
        assert!(!outcome.full_document);
        assert!(outcome.text.contains("## 介绍\n\n你好。"));
        assert!(outcome.text.contains("## [zh] Usage\n\n[zh] Run it twice."));
        assert!(!outcome.text.contains("运行它。"));

        let map = heading_map::extract(&outcome.text);
        assert_eq!(map.get("Intro"), Some("介绍"));
        assert_eq!(map.get("Usage"), Some("[zh] Usage"));
        Ok(())
    }

    #[test]
    fn test_added_section_is_inserted_at_source_position() -> Result<()> {
        let after = "## Intro\n\nHello.\n\n## Setup\n\nInstall.\n\n## Usage\n\nRun it.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, TARGET, &translator, &languages())?;
        let tree = parse_sections(&outcome.text);
        let headings: Vec<&str> = tree.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["## 介绍", "## [zh] Setup", "## 用法"]);

        let map = heading_map::extract(&outcome.text);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("Setup"), Some("[zh] Setup"));
        Ok(())
    }

    #[test]
    fn test_deleted_section_is_removed_and_pruned() -> Result<()> {
        let after = "## Intro\n\nHello.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, TARGET, &translator, &languages())?;
        assert!(translator.calls.borrow().is_empty());
        assert!(!outcome.text.contains("用法"));

        let map = heading_map::extract(&outcome.text);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Intro"), Some("介绍"));
        Ok(())
    }

    #[test]
    fn test_positional_fallback_without_heading_map() -> Result<()> {
        let target = "## 介绍\n\n你好。\n\n## 用法\n\n运行它。\n";
        let after = "## Intro\n\nHello there.\n\n## Usage\n\nRun it.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, target, &translator, &languages())?;
        assert!(!outcome.full_document);
        assert!(outcome.text.contains("[zh] Hello there."));
        assert!(outcome.text.contains("## 用法\n\n运行它。"));

        let map = heading_map::extract(&outcome.text);
        assert_eq!(map.get("Usage"), Some("用法"));
        Ok(())
    }

    #[test]
    fn test_unlocatable_section_falls_back_to_full_document() -> Result<()> {
        let target = "## 介绍\n\n你好。\n";
        let after = "## Intro\n\nHello.\n\n## Usage\n\nRun it now.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, target, &translator, &languages())?;
        assert!(outcome.full_document);
        assert_eq!(translator.calls.borrow().len(), 1);
        assert!(outcome.text.contains("## [zh] Intro"));
        assert!(outcome.text.contains("## [zh] Usage"));
        Ok(())
    }

    #[test]
    fn test_header_only_edit_keeps_target_preamble() -> Result<()> {
        let before = "---\ntitle: Guide\n---\n\n## Intro\n\nHello.\n\n## Usage\n\nRun it.\n";
        let after = before.replace("title: Guide", "title: User Guide");
        let target = "---\nheading-map:\n  Intro: 介绍\n  Usage: 用法\n---\n\n(intro-label)=\n\n## 介绍\n\n你好。\n\n## 用法\n\n运行它。\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(before, &after, target, &translator, &languages())?;
        assert_eq!(outcome.changes.len(), 1);
        assert!(outcome.changes[0].is_preamble());
        assert!(outcome.translated.is_empty());
        assert!(translator.calls.borrow().is_empty());
        assert_eq!(outcome.text, target);
        Ok(())
    }

    #[test]
    fn test_edited_preamble_is_retranslated() -> Result<()> {
        let before = "Read this first.\n\n## Intro\n\nHello.\n";
        let after = "Read this first, please.\n\n## Intro\n\nHello.\n";
        let target = "---\nheading-map:\n  Intro: 介绍\n---\n\n请先阅读。\n\n## 介绍\n\n你好。\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(before, after, target, &translator, &languages())?;
        assert_eq!(outcome.translated, vec![PREAMBLE_HEADING.to_string()]);
        assert_eq!(
            *translator.calls.borrow(),
            vec!["Read this first, please.".to_string()]
        );
        assert!(outcome.text.contains("[zh] Read this first, please.\n\n## 介绍\n\n你好。"));
        assert!(!outcome.text.contains("请先阅读。"));
        Ok(())
    }

    #[test]
    fn test_translator_error_is_propagated() {
        let after = "## Intro\n\nHello.\n\n## Usage\n\nRun it twice.\n";
        let result = sync_document(SOURCE, after, TARGET, &FailingTranslator, &languages());
        let err = result.expect_err("translator failure should surface");
        assert!(format!("{err:#}").contains("service unavailable"));
    }

    #[test]
    fn test_other_header_fields_survive() -> Result<()> {
        let target = "---\ntitle: Guide\nheading-map:\n  Intro: 介绍\n  Usage: 用法\n---\n\n## 介绍\n\n你好。\n\n## 用法\n\n运行它。\n";
        let after = "## Intro\n\nHello.\n\n## Usage\n\nRun it twice.\n";
        let translator = TaggingTranslator::default();

        let outcome = sync_document(SOURCE, after, target, &translator, &languages())?;
        assert!(outcome.text.starts_with("---\ntitle: Guide\n"));
        assert_eq!(heading_map::extract(&outcome.text).len(), 2);
        Ok(())
    }
}
