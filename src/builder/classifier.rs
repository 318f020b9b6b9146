//! Style-name classification.
//!
//! Word processors name their paragraph styles freely ("heading 1",
//! "Heading 1 Char", "Überschrift 1", "Chapter Title"). The classifier maps
//! such a name onto a semantic role using configured pattern lists.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Default heading level for section headings without digits in the style name.
pub const DEFAULT_SECTION_LEVEL: u8 = 2;

/// Style-name pattern lists, one per semantic role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleMapping {
    pub chapter_heading_styles: Vec<String>,
    pub section_heading_styles: Vec<String>,
    pub body_styles: Vec<String>,
    pub blockquote_styles: Vec<String>,
}

impl Default for StyleMapping {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            chapter_heading_styles: list(&["Heading 1", "Title", "Chapter"]),
            section_heading_styles: list(&["Heading 2", "Heading 3", "Heading 4"]),
            body_styles: list(&["Normal", "Body Text", "Body"]),
            blockquote_styles: list(&["Quote", "Block Text"]),
        }
    }
}

/// Semantic role of a paragraph style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRole {
    ChapterHeading { level: u8 },
    SectionHeading { level: u8 },
    Blockquote,
    Body,
}

impl StyleRole {
    /// Returns true for chapter and section headings.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            StyleRole::ChapterHeading { .. } | StyleRole::SectionHeading { .. }
        )
    }
}

/// Classifies style names against a [`StyleMapping`].
///
/// Never fails: anything unmatched is body text.
#[derive(Debug, Clone)]
pub struct StyleClassifier {
    chapter: Vec<String>,
    section: Vec<String>,
    blockquote: Vec<String>,
}

impl Default for StyleClassifier {
    fn default() -> Self {
        Self::new(&StyleMapping::default())
    }
}

impl StyleClassifier {
    /// Creates a classifier, lower-casing the patterns once.
    pub fn new(mapping: &StyleMapping) -> Self {
        fn lower(patterns: &[String]) -> Vec<String> {
            patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        }

        Self {
            chapter: lower(&mapping.chapter_heading_styles),
            section: lower(&mapping.section_heading_styles),
            blockquote: lower(&mapping.blockquote_styles),
        }
    }

    /// Classifies a style name.
    ///
    /// Priority is chapter heading, then section heading, then blockquote.
    /// Blank style names are body text.
    pub fn classify(&self, style_name: &str) -> StyleRole {
        let style = style_name.trim().to_lowercase();
        if style.is_empty() {
            return StyleRole::Body;
        }

        if matches_any(&style, &self.chapter) {
            StyleRole::ChapterHeading {
                level: heading_level(style_name).unwrap_or(1),
            }
        } else if matches_any(&style, &self.section) {
            StyleRole::SectionHeading {
                level: heading_level(style_name).unwrap_or(DEFAULT_SECTION_LEVEL),
            }
        } else if matches_any(&style, &self.blockquote) {
            StyleRole::Blockquote
        } else {
            StyleRole::Body
        }
    }

    /// Returns true if the style name matches a blockquote pattern.
    pub fn is_blockquote(&self, style_name: &str) -> bool {
        let style = style_name.trim().to_lowercase();
        !style.is_empty() && matches_any(&style, &self.blockquote)
    }
}

/// Bidirectional containment: either string contains the other.
fn matches_any(style: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| style.contains(pattern.as_str()) || pattern.contains(style))
}

/// Extracts the first run of digits in a style name, clamped to 1-6.
pub fn heading_level(style_name: &str) -> Option<u8> {
    let digits = RE_DIGITS.find(style_name)?.as_str();
    // overly long digit runs still clamp to the deepest level
    let level = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(level.clamp(1, 6) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(style: &str) -> StyleRole {
        StyleClassifier::default().classify(style)
    }

    #[test]
    fn test_default_mapping() {
        assert_eq!(classify("Heading 1"), StyleRole::ChapterHeading { level: 1 });
        assert_eq!(classify("heading 2"), StyleRole::SectionHeading { level: 2 });
        assert_eq!(classify("Quote"), StyleRole::Blockquote);
        assert_eq!(classify("Normal"), StyleRole::Body);
    }

    #[test]
    fn test_bidirectional_containment() {
        // style contains pattern
        assert_eq!(
            classify("Heading 1 (custom)"),
            StyleRole::ChapterHeading { level: 1 }
        );
        // pattern contains style
        assert_eq!(classify("Chap"), StyleRole::ChapterHeading { level: 1 });
        assert_eq!(classify("Intense Quote"), StyleRole::Blockquote);
    }

    #[test]
    fn test_chapter_wins_over_section() {
        let mapping = StyleMapping {
            chapter_heading_styles: vec!["Heading".into()],
            section_heading_styles: vec!["Heading 2".into()],
            ..Default::default()
        };
        let classifier = StyleClassifier::new(&mapping);
        assert_eq!(
            classifier.classify("Heading 2"),
            StyleRole::ChapterHeading { level: 2 }
        );
    }

    #[test]
    fn test_level_extraction_and_clamping() {
        assert_eq!(heading_level("Heading 3"), Some(3));
        assert_eq!(heading_level("Level 12 Title"), Some(6));
        assert_eq!(heading_level("H0"), Some(1));
        assert_eq!(heading_level("Title"), None);
        assert_eq!(heading_level("x99999999999999999999999"), Some(6));
    }

    #[test]
    fn test_default_levels_without_digits() {
        assert_eq!(classify("Title"), StyleRole::ChapterHeading { level: 1 });
        let mapping = StyleMapping {
            section_heading_styles: vec!["Subhead".into()],
            ..Default::default()
        };
        assert_eq!(
            StyleClassifier::new(&mapping).classify("Subhead"),
            StyleRole::SectionHeading { level: DEFAULT_SECTION_LEVEL }
        );
    }

    #[test]
    fn test_blank_style_is_body() {
        // a blank name is contained in every pattern, which must not count
        assert_eq!(classify(""), StyleRole::Body);
        assert_eq!(classify("   "), StyleRole::Body);
        assert!(!StyleClassifier::default().is_blockquote(""));
    }

    #[test]
    fn test_unmatched_is_body() {
        assert_eq!(classify("Caption"), StyleRole::Body);
        assert!(!classify("Caption").is_heading());
    }

    #[test]
    fn test_mapping_deserializes_partially() {
        let mapping: StyleMapping =
            serde_yaml::from_str("blockquote_styles: [\"Epigraph\"]").unwrap();
        assert_eq!(mapping.blockquote_styles, vec!["Epigraph"]);
        assert_eq!(mapping.chapter_heading_styles, StyleMapping::default().chapter_heading_styles);
    }
}
