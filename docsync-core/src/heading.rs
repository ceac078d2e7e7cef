//! Heading text helpers

/// Strip the `#` markers and surrounding whitespace from a heading.
///
/// A closing `#` run is only dropped when whitespace separates it from the
/// text, so `C#` keeps its hash. Only the first line is considered, so a
/// setext heading (`Title\n=====`) cleans to `Title`.
pub fn clean_heading(heading: &str) -> String {
    let first_line = heading.trim().lines().next().unwrap_or("");
    let text = first_line.trim_start_matches('#').trim();

    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end().to_string()
    } else {
        text.to_string()
    }
}

/// Create an intra-document anchor id from heading text.
///
/// Lowercases, drops everything but word characters, whitespace and hyphens,
/// then joins words with single hyphens.
pub fn heading_id(heading: &str) -> String {
    let text = clean_heading(heading).to_lowercase();

    let kept: String = text
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace())
        .collect();

    let mut id = String::with_capacity(kept.len());
    for c in kept.chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' && id.ends_with('-') {
            continue;
        }
        id.push(c);
    }

    id.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_heading() {
        assert_eq!(clean_heading("## Introduction"), "Introduction");
        assert_eq!(clean_heading("  ###   Spaced out  "), "Spaced out");
        assert_eq!(clean_heading("Plain"), "Plain");
        assert_eq!(clean_heading("Setext\n======"), "Setext");
        assert_eq!(clean_heading(""), "");
    }

    #[test]
    fn test_clean_heading_drops_closing_sequence() {
        assert_eq!(clean_heading("## Intro ##"), "Intro");
        assert_eq!(clean_heading("### Setup #####   "), "Setup");
        assert_eq!(clean_heading("# C#"), "C#");
        assert_eq!(clean_heading("## Issue #42"), "Issue #42");
        assert_eq!(clean_heading("## ##"), "");
    }

    #[test]
    fn test_heading_id_generation() {
        assert_eq!(heading_id("## Hello World"), "hello-world");
        assert_eq!(heading_id("Test & Demo"), "test-demo");
        assert_eq!(heading_id("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(heading_id("--Edge-- case--"), "edge-case");
        assert_eq!(heading_id("snake_case stays"), "snake_case-stays");
        assert_eq!(heading_id("## Closed ##"), "closed");
    }

    #[test]
    fn test_heading_id_keeps_unicode_words() {
        assert_eq!(heading_id("## 简介 Overview"), "简介-overview");
    }
}
