//! Heading map reconciliation.
//!
//! Source and target sections are paired by position: the i-th source section
//! is taken to be the translation of the i-th target section at every nesting
//! level. Each pairing overwrites the map entry for the source heading, and
//! entries for headings no longer in the source are pruned.

use std::collections::HashSet;

use crate::heading_map::HeadingMap;
use crate::section::Section;

/// Bring `existing` up to date with the current source and target trees.
pub fn update_heading_map(
    existing: &HeadingMap,
    source_sections: &[Section],
    target_sections: &[Section],
) -> HeadingMap {
    let mut map = existing.clone();
    let mut present = HashSet::new();

    pair_sections(&mut map, &mut present, source_sections, target_sections);

    let before = map.len();
    map.retain(|source, _| present.contains(source));
    log::debug!(
        "Reconciled heading map: {} entries, {} pruned",
        map.len(),
        before - map.len()
    );

    map
}

fn pair_sections(
    map: &mut HeadingMap,
    present: &mut HashSet<String>,
    source: &[Section],
    target: &[Section],
) {
    for (idx, src) in source.iter().enumerate() {
        let src_title = src.title();

        let Some(tgt) = target.get(idx) else {
            // Unpaired: keep tracking it and everything below it.
            mark_present(present, src);
            continue;
        };

        map.insert(src_title.clone(), tgt.title());
        present.insert(src_title);

        if !src.subsections.is_empty() && !tgt.subsections.is_empty() {
            pair_sections(map, present, &src.subsections, &tgt.subsections);
        } else {
            for sub in &src.subsections {
                mark_present(present, sub);
            }
        }
    }
}

fn mark_present(present: &mut HashSet<String>, section: &Section) {
    for s in section.flatten() {
        present.insert(s.title());
    }
}
