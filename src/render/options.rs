//! Per-format rendering configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for the paginated (print) renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// CSS page size, e.g. "6in 9in" or "A5".
    pub page_size: String,

    /// Page margins, mirrored on facing pages.
    pub margins: Margins,

    /// Bleed area beyond the trim size. `None` disables bleed.
    pub bleed: Option<String>,

    /// Whether to print crop and registration marks in the bleed area.
    pub crop_marks: bool,

    pub font_family: String,
    pub font_size: String,
    pub line_height: f32,

    /// Whether to show page numbers in the footer.
    pub show_page_numbers: bool,

    /// Where page numbers go.
    pub page_number_position: PageNumberPosition,

    /// Whether to show the book and chapter titles in running headers.
    pub show_running_headers: bool,

    pub include_title_page: bool,
    pub include_copyright_page: bool,
    pub include_toc: bool,

    /// Replaces the document language in the `lang` attribute.
    pub language_override: Option<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "6in 9in".to_string(),
            margins: Margins::default(),
            bleed: Some("0.125in".to_string()),
            crop_marks: true,
            font_family: "Georgia, serif".to_string(),
            font_size: "11pt".to_string(),
            line_height: 1.5,
            show_page_numbers: true,
            page_number_position: PageNumberPosition::BottomOutside,
            show_running_headers: true,
            include_title_page: true,
            include_copyright_page: true,
            include_toc: true,
            language_override: None,
        }
    }
}

impl PdfConfig {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: impl Into<String>) -> Self {
        self.page_size = size.into();
        self
    }

    /// Sets the margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Sets or clears the bleed.
    pub fn with_bleed(mut self, bleed: Option<String>) -> Self {
        self.bleed = bleed;
        self
    }

    /// Enables or disables crop marks.
    pub fn with_crop_marks(mut self, enabled: bool) -> Self {
        self.crop_marks = enabled;
        self
    }

    /// Sets the body font.
    pub fn with_font(mut self, family: impl Into<String>, size: impl Into<String>) -> Self {
        self.font_family = family.into();
        self.font_size = size.into();
        self
    }

    /// Sets the line height.
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    /// Sets the page number position.
    pub fn with_page_numbers(mut self, position: PageNumberPosition) -> Self {
        self.show_page_numbers = true;
        self.page_number_position = position;
        self
    }

    /// Hides page numbers.
    pub fn without_page_numbers(mut self) -> Self {
        self.show_page_numbers = false;
        self
    }

    /// Enables or disables running headers.
    pub fn with_running_headers(mut self, enabled: bool) -> Self {
        self.show_running_headers = enabled;
        self
    }

    /// Drops the title page, copyright page and table of contents.
    pub fn without_front_matter_pages(mut self) -> Self {
        self.include_title_page = false;
        self.include_copyright_page = false;
        self.include_toc = false;
        self
    }

    /// Overrides the document language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_override = Some(language.into());
        self
    }
}

/// Page margins for a two-sided layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: String,
    pub bottom: String,
    /// Gutter side
    pub inside: String,
    pub outside: String,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: "0.75in".to_string(),
            bottom: "0.75in".to_string(),
            inside: "0.875in".to_string(),
            outside: "0.625in".to_string(),
        }
    }
}

/// Where page numbers are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageNumberPosition {
    BottomCenter,
    /// Bottom left on verso pages, bottom right on recto pages.
    #[default]
    BottomOutside,
}

/// Options for the reflowable (EPUB) renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpubConfig {
    pub version: EpubVersion,

    /// Package language when the document carries none.
    pub language: String,

    /// Replaces the document language unconditionally.
    pub language_override: Option<String>,

    /// One content document per chapter. When off, all chapters share one unit.
    pub split_chapters: bool,

    /// Whether to add the table of contents to the reading order.
    pub include_toc: bool,

    /// External stylesheet appended after the generated one.
    pub css_file: Option<PathBuf>,

    /// Base font size of the generated stylesheet.
    pub font_size: String,

    /// Cover image file, used when the document has no cover of its own.
    pub cover_image: Option<PathBuf>,

    /// Explicit package identifier. Takes precedence over any ISBN.
    pub identifier: Option<String>,

    /// How to identify a package that has neither an identifier nor an ISBN.
    pub identifier_fallback: IdentifierFallback,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            version: EpubVersion::V3,
            language: "en".to_string(),
            language_override: None,
            split_chapters: true,
            include_toc: true,
            css_file: None,
            font_size: "1em".to_string(),
            cover_image: None,
            identifier: None,
            identifier_fallback: IdentifierFallback::Random,
        }
    }
}

impl EpubConfig {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the EPUB version.
    pub fn with_version(mut self, version: EpubVersion) -> Self {
        self.version = version;
        self
    }

    /// Overrides the document language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_override = Some(language.into());
        self
    }

    /// Puts all chapters into a single content document.
    pub fn single_unit(mut self) -> Self {
        self.split_chapters = false;
        self
    }

    /// Sets the base font size.
    pub fn with_font_size(mut self, size: impl Into<String>) -> Self {
        self.font_size = size.into();
        self
    }

    /// Sets an external stylesheet.
    pub fn with_css_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.css_file = Some(path.into());
        self
    }

    /// Sets the cover image file.
    pub fn with_cover_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.cover_image = Some(path.into());
        self
    }

    /// Sets an explicit package identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Derives the fallback identifier from title and authors.
    pub fn deterministic(mut self) -> Self {
        self.identifier_fallback = IdentifierFallback::Derived;
        self
    }
}

/// EPUB specification version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EpubVersion {
    #[serde(rename = "2.0")]
    V2,
    #[default]
    #[serde(rename = "3.0")]
    V3,
}

impl EpubVersion {
    /// Value of the package `version` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            EpubVersion::V2 => "2.0",
            EpubVersion::V3 => "3.0",
        }
    }
}

/// Identifier used when no explicit identifier or ISBN is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierFallback {
    /// Fresh random UUID per render.
    #[default]
    Random,
    /// Name-based UUID from title and authors; stable across renders.
    Derived,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_defaults() {
        let config = PdfConfig::default();
        assert_eq!(config.page_size, "6in 9in");
        assert_eq!(config.margins.inside, "0.875in");
        assert_eq!(config.bleed.as_deref(), Some("0.125in"));
        assert_eq!(config.page_number_position, PageNumberPosition::BottomOutside);
        assert!(config.include_toc);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: PdfConfig = serde_yaml::from_str(
            "page_size: A5\nmargins:\n  top: 1in\npage_number_position: bottom-center\n",
        )
        .unwrap();
        assert_eq!(config.page_size, "A5");
        assert_eq!(config.margins.top, "1in");
        assert_eq!(config.margins.bottom, "0.75in");
        assert_eq!(config.page_number_position, PageNumberPosition::BottomCenter);
    }

    #[test]
    fn test_epub_version_strings() {
        let config: EpubConfig =
            serde_yaml::from_str("version: \"2.0\"\nidentifier_fallback: derived\n").unwrap();
        assert_eq!(config.version, EpubVersion::V2);
        assert_eq!(config.version.as_str(), "2.0");
        assert_eq!(config.identifier_fallback, IdentifierFallback::Derived);
        assert!(config.split_chapters);
    }

    #[test]
    fn test_builder_methods() {
        let config = EpubConfig::new()
            .with_identifier("urn:isbn:9780000000001")
            .with_language("fr")
            .deterministic();
        assert_eq!(config.identifier.as_deref(), Some("urn:isbn:9780000000001"));
        assert_eq!(config.language_override.as_deref(), Some("fr"));

        let pdf = PdfConfig::new().without_front_matter_pages().without_page_numbers();
        assert!(!pdf.include_title_page && !pdf.include_toc && !pdf.show_page_numbers);
    }
}
