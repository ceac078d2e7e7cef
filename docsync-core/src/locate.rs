//! Target section lookup through the heading map

use crate::heading::clean_heading;
use crate::heading_map::HeadingMap;
use crate::section::Section;

/// Translated heading text for `source_heading`, if one is mapped.
pub fn locate<'a>(source_heading: &str, map: &'a HeadingMap) -> Option<&'a str> {
    map.get(&clean_heading(source_heading))
}

/// Find a section anywhere in the tree by cleaned heading text.
pub fn find_section<'a>(sections: &'a [Section], title: &str) -> Option<&'a Section> {
    let title = clean_heading(title);
    sections
        .iter()
        .flat_map(Section::flatten)
        .find(|section| section.title() == title)
}

/// Resolve a source heading to its section in the target tree.
pub fn locate_section<'a>(
    source_heading: &str,
    map: &HeadingMap,
    target_sections: &'a [Section],
) -> Option<&'a Section> {
    let target_title = locate(source_heading, map)?;
    find_section(target_sections, target_title)
}
