//! Heading map persistence.
//!
//! A target document records which translated heading corresponds to each
//! source heading under the `heading-map` key of its YAML header:
//!
//! ```yaml
//! ---
//! title: 介绍
//! heading-map:
//!   Introduction: 介绍
//!   Getting Started: 入门
//! ---
//! ```
//!
//! Reading and writing are fail-safe: a header that cannot be parsed yields an
//! empty map on read and leaves the document untouched on write.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::front_matter::{parse_metadata, split_front_matter, FRONT_MATTER_MARKER};

/// Header key holding the map.
pub const HEADING_MAP_KEY: &str = "heading-map";

/// Cleaned source heading text to cleaned target heading text.
///
/// Insertion order is kept so rewritten headers stay diff-friendly; equality
/// ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingMap(IndexMap<String, String>);

impl HeadingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    /// Insert or overwrite a mapping. Existing keys keep their position.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.0.insert(source.into(), target.into());
    }

    pub fn contains(&self, source: &str) -> bool {
        self.0.contains_key(source)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|source, target| keep(source, target));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn to_yaml(&self) -> Value {
        let mut table = Mapping::new();
        for (source, target) in self.iter() {
            table.insert(Value::from(source), Value::from(target));
        }
        Value::Mapping(table)
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for HeadingMap {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(source, target)| (source.into(), target.into()))
                .collect(),
        )
    }
}

/// Read the heading map from a document's header.
///
/// A missing header, a missing key or an unparseable header all give an empty
/// map. Entries whose key or value is not a string are skipped.
pub fn extract(document: &str) -> HeadingMap {
    let Some(header) = split_front_matter(document).header else {
        return HeadingMap::new();
    };

    let metadata = match parse_metadata(header) {
        Ok(metadata) => metadata,
        Err(err) => {
            log::warn!("Cannot read heading map: {err:#}");
            return HeadingMap::new();
        }
    };

    let Some(Value::Mapping(table)) = metadata.get(HEADING_MAP_KEY) else {
        return HeadingMap::new();
    };

    table
        .iter()
        .filter_map(|(source, target)| Some((source.as_str()?, target.as_str()?)))
        .collect()
}

/// Render the map as a YAML fragment with a `heading-map` table.
///
/// Returns an empty string for an empty map.
pub fn serialize(map: &HeadingMap) -> String {
    if map.is_empty() {
        return String::new();
    }

    let mut fragment = Mapping::new();
    fragment.insert(Value::from(HEADING_MAP_KEY), map.to_yaml());

    match serde_yaml::to_string(&fragment) {
        Ok(yaml) => yaml,
        Err(err) => {
            log::warn!("Cannot serialize heading map: {err}");
            String::new()
        }
    }
}

/// Write the heading map into a document's header.
///
/// Other header fields are preserved. An empty map removes the key, and a
/// header left with no fields is dropped. The header is only rewritten when
/// the stored map actually changes, and on any header parse failure the
/// document is returned unchanged.
pub fn inject(document: &str, map: &HeadingMap) -> String {
    let split = split_front_matter(document);

    let Some(header) = split.header else {
        if map.is_empty() {
            return document.to_string();
        }
        let mut metadata = Mapping::new();
        metadata.insert(Value::from(HEADING_MAP_KEY), map.to_yaml());
        return match render_header(&metadata) {
            Some(header) => format!("{header}\n{document}"),
            None => document.to_string(),
        };
    };

    let mut metadata = match parse_metadata(header) {
        Ok(metadata) => metadata,
        Err(err) => {
            log::warn!("Leaving document unchanged, cannot update heading map: {err:#}");
            return document.to_string();
        }
    };

    let stored = metadata.get(HEADING_MAP_KEY);
    if map.is_empty() && stored.is_none() {
        return document.to_string();
    }
    if stored.is_some() && extract(document) == *map {
        return document.to_string();
    }

    if map.is_empty() {
        metadata.remove(HEADING_MAP_KEY);
    } else {
        metadata.insert(Value::from(HEADING_MAP_KEY), map.to_yaml());
    }

    if metadata.is_empty() {
        return split.body.trim_start_matches(['\n', '\r']).to_string();
    }

    match render_header(&metadata) {
        Some(header) => format!("{header}{}", split.body),
        None => document.to_string(),
    }
}

/// `---\n<yaml>---\n`, or `None` if serialization fails.
fn render_header(metadata: &Mapping) -> Option<String> {
    match serde_yaml::to_string(metadata) {
        Ok(yaml) => Some(format!(
            "{FRONT_MATTER_MARKER}\n{yaml}{FRONT_MATTER_MARKER}\n"
        )),
        Err(err) => {
            log::warn!("Cannot serialize metadata header: {err}");
            None
        }
    }
}
