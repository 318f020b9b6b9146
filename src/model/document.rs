//! Document, chapter and metadata structures.

use super::Node;
use bytes::Bytes;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());

/// Converts free text into an identifier-safe token.
///
/// Lower-cases, strips everything that is not a word character, whitespace
/// or hyphen, collapses whitespace/underscore runs into one hyphen and trims
/// hyphens from both ends. May return an empty string.
pub fn slugify(text: &str) -> String {
    let normalized: String = text.nfc().collect::<String>().to_lowercase();
    let stripped = RE_NON_WORD.replace_all(&normalized, "");
    let hyphenated = RE_SEPARATORS.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// A complete document in the intermediate representation.
///
/// Built once by the document builder and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    /// Document metadata
    pub metadata: Metadata,
    /// Title page, dedication and similar material
    pub front_matter: Vec<Node>,
    /// Chapters in reading order (never empty once built)
    pub chapters: Vec<Chapter>,
    /// Appendices and similar material
    pub back_matter: Vec<Node>,
    /// Footnote bodies keyed by reference id
    pub footnotes: BTreeMap<String, Node>,
    /// Raw image payloads keyed by image filename
    #[serde(skip)]
    pub images: BTreeMap<String, Bytes>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all content nodes in reading order.
    pub fn all_content(&self) -> impl Iterator<Item = &Node> {
        self.front_matter
            .iter()
            .chain(self.chapters.iter().flat_map(|c| c.content.iter()))
            .chain(self.back_matter.iter())
    }

    /// Estimates the word count of all chapters.
    pub fn word_count(&self) -> usize {
        self.chapters.iter().map(Chapter::word_count).sum()
    }

    /// Returns the number of chapters with a non-empty title.
    pub fn titled_chapter_count(&self) -> usize {
        self.chapters.iter().filter(|c| !c.is_untitled()).count()
    }

    /// Looks up a footnote body by reference id.
    pub fn footnote(&self, id: &str) -> Option<&Node> {
        self.footnotes.get(id)
    }

    /// Returns the plain text of the whole document, one top-level node per line.
    pub fn plain_text(&self) -> String {
        self.all_content()
            .map(Node::extract_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the document structure as pretty-printed JSON.
    ///
    /// Image payloads are omitted; image nodes keep their filename and MIME type.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A titled top-level grouping of content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    /// Title (empty for implicit chapters)
    pub title: String,
    /// Heading level (1-6)
    pub level: u8,
    /// Ordered content nodes
    pub content: Vec<Node>,
    /// Stable identifier used for navigation and linking
    pub id: String,
}

impl Chapter {
    /// Creates a chapter whose id is derived from the title.
    ///
    /// `ordinal` is the 1-based chapter number, used as `chapter-{ordinal}`
    /// when the title slugifies to nothing.
    pub fn new(title: impl Into<String>, level: u8, ordinal: usize) -> Self {
        let title = title.into();
        let id = Self::slug_id(&title, ordinal);
        Self {
            title,
            level: level.clamp(1, 6),
            content: Vec::new(),
            id,
        }
    }

    /// Creates a chapter with an explicit id.
    pub fn with_id(title: impl Into<String>, level: u8, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level: level.clamp(1, 6),
            content: Vec::new(),
            id: id.into(),
        }
    }

    /// Derives an id from a title, falling back to the chapter ordinal.
    pub fn slug_id(title: &str, ordinal: usize) -> String {
        let slug = slugify(title);
        if slug.is_empty() {
            format!("chapter-{}", ordinal)
        } else {
            slug
        }
    }

    /// Returns true if the chapter has no title.
    pub fn is_untitled(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Returns true if the chapter has no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Counts words per top-level content node.
    ///
    /// Each node's extracted text is split on whitespace separately, so a word
    /// spanning two adjacent nodes counts twice.
    pub fn word_count(&self) -> usize {
        self.content
            .iter()
            .map(|node| node.extract_text().split_whitespace().count())
            .sum()
    }
}

/// Publication metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// Book title
    pub title: String,
    /// Optional subtitle
    pub subtitle: Option<String>,
    /// Authors in display order
    pub authors: Vec<String>,
    /// BCP 47 language tag
    pub language: String,
    /// Publisher name
    pub publisher: Option<String>,
    /// Publication date (ISO 8601)
    pub publication_date: Option<String>,
    /// Last modification date (ISO 8601)
    pub modified_date: Option<String>,
    /// Format-independent ISBN
    pub isbn: Option<String>,
    /// ISBN of the print edition
    pub isbn_print: Option<String>,
    /// ISBN of the digital edition
    pub isbn_epub: Option<String>,
    /// Short description or blurb
    pub description: Option<String>,
    /// Subject keywords
    pub keywords: Vec<String>,
    /// Copyright line
    pub copyright: Option<String>,
    /// Cover image payload
    #[serde(skip)]
    pub cover_image: Option<Bytes>,
    /// MIME type of the cover image
    pub cover_mime_type: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            subtitle: None,
            authors: Vec::new(),
            language: "en".to_string(),
            publisher: None,
            publication_date: None,
            modified_date: None,
            isbn: None,
            isbn_print: None,
            isbn_epub: None,
            description: None,
            keywords: Vec::new(),
            copyright: None,
            cover_image: None,
            cover_mime_type: "image/jpeg".to_string(),
        }
    }
}

impl Metadata {
    /// Returns the authors joined for display.
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }

    /// Returns the ISBN for print, falling back to the generic ISBN.
    pub fn print_isbn(&self) -> Option<&str> {
        self.isbn_print.as_deref().or(self.isbn.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("snake_case  and\ttabs"), "snake-case-and-tabs");
        assert_eq!(slugify("--Prologue--"), "prologue");
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let title = "The Long Way Home: Part II";
        assert_eq!(slugify(title), slugify(title));
    }

    #[test]
    fn test_slugify_keeps_unicode_word_chars() {
        assert_eq!(slugify("Café Noir"), "café-noir");
        // decomposed input normalizes to the same slug
        assert_eq!(slugify("Cafe\u{301} Noir"), "café-noir");
    }

    #[test]
    fn test_slugify_punctuation_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn test_chapter_id_fallback() {
        assert_eq!(Chapter::new("", 1, 3).id, "chapter-3");
        assert_eq!(Chapter::new("   ", 1, 1).id, "chapter-1");
        assert_eq!(Chapter::new("* * *", 1, 2).id, "chapter-2");
        assert_eq!(Chapter::new("Chapter One", 1, 1).id, "chapter-one");
    }

    #[test]
    fn test_chapter_level_clamped() {
        assert_eq!(Chapter::new("A", 0, 1).level, 1);
        assert_eq!(Chapter::new("A", 12, 1).level, 6);
    }

    #[test]
    fn test_word_count_per_top_level_node() {
        let mut chapter = Chapter::new("Count", 1, 1);
        chapter.content.push(Node::paragraph(vec![
            Node::text("one two "),
            Node::strong(vec![Node::text("three")]),
        ]));
        chapter.content.push(Node::paragraph(vec![Node::text("four")]));
        assert_eq!(chapter.word_count(), 4);

        // adjacent leaves without a space join into one token within a node
        let mut joined = Chapter::new("Joined", 1, 2);
        joined.content.push(Node::paragraph(vec![
            Node::text("half"),
            Node::text("word"),
        ]));
        assert_eq!(joined.word_count(), 1);
    }

    #[test]
    fn test_document_word_count_and_plain_text() {
        let mut doc = Document::new();
        let mut chapter = Chapter::new("One", 1, 1);
        chapter.content.push(Node::paragraph(vec![Node::text("Hello world.")]));
        doc.chapters.push(chapter);
        doc.back_matter.push(Node::paragraph(vec![Node::text("The end")]));

        assert_eq!(doc.word_count(), 2);
        assert_eq!(doc.plain_text(), "Hello world.\nThe end");
    }

    #[test]
    fn test_metadata_defaults() {
        let metadata = Metadata::default();
        assert_eq!(metadata.title, "Untitled");
        assert_eq!(metadata.language, "en");
        assert_eq!(metadata.cover_mime_type, "image/jpeg");
        assert!(metadata.authors.is_empty());
    }

    #[test]
    fn test_print_isbn_fallback() {
        let metadata = Metadata {
            isbn: Some("978-0-00-000000-0".into()),
            ..Default::default()
        };
        assert_eq!(metadata.print_isbn(), Some("978-0-00-000000-0"));
    }

    #[test]
    fn test_to_json_skips_payloads() {
        let mut doc = Document::new();
        doc.images
            .insert("image_1.png".into(), Bytes::from_static(b"\x89PNG"));
        let json = doc.to_json();
        assert!(json.contains("\"chapters\""));
        assert!(!json.contains("image_1.png"));
    }
}
