//! # typeset
//!
//! Turns word-processor manuscripts into publications: a reflowable EPUB
//! package and a print-ready paginated layout.
//!
//! The pipeline has three stages. A source adapter reads the manuscript into
//! a [`SourceDocument`], the [`DocumentBuilder`] classifies its styles and
//! groups blocks into chapters, and the renderers turn the resulting
//! immutable [`Document`] into format-specific output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use typeset::{OutputFormat, Typeset};
//!
//! fn main() -> typeset::Result<()> {
//!     let report = Typeset::new()
//!         .build("manuscript.docx")?
//!         .publish(&OutputFormat::ALL, "./output")?;
//!
//!     for outcome in report.successes() {
//!         println!("{}: {}", outcome.format, outcome.output.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `docx` (default): Office Open XML source adapter
//! - `async`: Async wrappers with Tokio

pub mod builder;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod render;
pub mod source;

#[cfg(feature = "docx")]
pub mod docx;

#[cfg(feature = "async")]
pub mod async_api;

// Re-exports
pub use builder::{BuildOptions, DocumentBuilder, StyleClassifier, StyleMapping, StyleRole};
pub use config::{find_config_file, load_config, MetadataConfig, TypesetConfig};
pub use detect::{detect_format, detect_format_from_bytes, detect_format_from_path, SourceFormat};
pub use error::{Error, Result};
pub use model::{Chapter, Document, Metadata, Node};
pub use render::{
    convert_all, ConversionReport, EpubConfig, LayoutBackend, OutputFormat, PdfConfig, Publisher,
    Renderer,
};
pub use source::{SourceAdapter, SourceDocument};

use std::path::{Path, PathBuf};

/// Reads a source file into a [`SourceDocument`].
///
/// The format is detected from the file contents.
pub fn read_source(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref();
    let format = detect_format_from_path(path)?;
    log::debug!("Detected {} source: {}", format, path.display());

    match format {
        #[cfg(feature = "docx")]
        SourceFormat::Docx => docx::DocxAdapter::open(path)?.read_source(),
        #[cfg(not(feature = "docx"))]
        SourceFormat::Docx => Err(Error::UnsupportedFormat(
            "DOCX support requires the 'docx' feature".into(),
        )),
    }
}

/// Reads a source from bytes.
pub fn read_source_bytes(data: &[u8]) -> Result<SourceDocument> {
    match detect_format_from_bytes(data)? {
        #[cfg(feature = "docx")]
        SourceFormat::Docx => docx::DocxAdapter::from_bytes(data.to_vec())?.read_source(),
        #[cfg(not(feature = "docx"))]
        SourceFormat::Docx => Err(Error::UnsupportedFormat(
            "DOCX support requires the 'docx' feature".into(),
        )),
    }
}

/// Builds a [`Document`] from a source, applying the configured style
/// mapping, build options and metadata overrides.
pub fn build_source(source: &SourceDocument, config: &TypesetConfig) -> Document {
    document_builder(config).build(source)
}

/// Reads and builds a source file.
///
/// # Example
///
/// ```no_run
/// use typeset::{build_file, TypesetConfig};
///
/// let document = build_file("manuscript.docx", &TypesetConfig::default())?;
/// println!("Chapters: {}", document.chapters.len());
/// # Ok::<(), typeset::Error>(())
/// ```
pub fn build_file(path: impl AsRef<Path>, config: &TypesetConfig) -> Result<Document> {
    let source = read_source(path)?;
    Ok(build_source(&source, config))
}

/// Reads and builds a source held in memory.
pub fn build_bytes(data: &[u8], config: &TypesetConfig) -> Result<Document> {
    let source = read_source_bytes(data)?;
    Ok(build_source(&source, config))
}

fn document_builder(config: &TypesetConfig) -> DocumentBuilder {
    DocumentBuilder::new(&config.style_mapping)
        .with_options(config.build.clone())
        .with_metadata(config.metadata.clone())
}

/// Derives an output file stem from a book title.
///
/// Keeps alphanumerics, spaces, hyphens and underscores. Falls back to the
/// input file stem when nothing usable remains or the title is `Untitled`.
pub fn output_stem(title: &str, input: &Path) -> String {
    let fallback = || {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "book".to_string())
    };

    if title.trim() == "Untitled" {
        return fallback();
    }

    let sanitized: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let sanitized = sanitized.trim();

    if sanitized.is_empty() {
        fallback()
    } else {
        sanitized.to_string()
    }
}

/// Builder for converting documents.
///
/// Provides a fluent API over configuration, build and publishing.
///
/// # Example
///
/// ```no_run
/// use typeset::{OutputFormat, Typeset};
/// use typeset::render::HtmlLayout;
///
/// let built = Typeset::new()
///     .with_title("My Novel")
///     .with_layout(HtmlLayout)
///     .build("novel.docx")?;
/// println!("{} words", built.document().word_count());
/// built.publish(&[OutputFormat::Pdf], "./dist")?;
/// # Ok::<(), typeset::Error>(())
/// ```
pub struct Typeset {
    config: TypesetConfig,
    layout: Option<Box<dyn LayoutBackend>>,
    parallel: bool,
}

impl Default for Typeset {
    fn default() -> Self {
        Self::new()
    }
}

impl Typeset {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::with_config(TypesetConfig::default())
    }

    /// Creates a builder from a loaded configuration.
    pub fn with_config(config: TypesetConfig) -> Self {
        Self {
            config,
            layout: None,
            parallel: true,
        }
    }

    /// Overrides the book title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.metadata.title = Some(title.into());
        self
    }

    /// Overrides the author list with a single author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.config.metadata.authors = vec![author.into()];
        self
    }

    /// Sets the print layout back-end.
    pub fn with_layout(mut self, layout: impl LayoutBackend + 'static) -> Self {
        self.layout = Some(Box::new(layout));
        self
    }

    /// Uses a reproducible EPUB identifier when no ISBN is configured.
    pub fn deterministic(mut self) -> Self {
        self.config.epub = self.config.epub.deterministic();
        self
    }

    /// Renders formats one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TypesetConfig {
        &self.config
    }

    /// Reads and builds a source file.
    pub fn build(self, path: impl AsRef<Path>) -> Result<BuiltDocument> {
        let path = path.as_ref();
        let document = build_file(path, &self.config)?;
        Ok(self.finish(document, path))
    }

    /// Builds an already-read source.
    pub fn build_source(self, source: &SourceDocument) -> BuiltDocument {
        let document = build_source(source, &self.config);
        let input = PathBuf::from(source.name.as_deref().unwrap_or("book"));
        self.finish(document, &input)
    }

    fn finish(self, document: Document, input: &Path) -> BuiltDocument {
        let stem = output_stem(&document.metadata.title, input);

        let mut publisher = Publisher::new(self.config.epub, self.config.pdf);
        if let Some(layout) = self.layout {
            publisher = publisher.with_boxed_layout(layout);
        }
        if !self.parallel {
            publisher = publisher.sequential();
        }

        BuiltDocument {
            document,
            publisher,
            stem,
        }
    }
}

/// A built document ready for publishing.
pub struct BuiltDocument {
    document: Document,
    publisher: Publisher,
    stem: String,
}

impl BuiltDocument {
    /// Returns a reference to the underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the output file stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Returns the publisher used for rendering.
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Renders the EPUB package without writing it.
    pub fn to_epub(&self) -> Result<render::EpubPackage> {
        self.publisher.epub_renderer().render(&self.document)
    }

    /// Renders the print document without laying it out.
    pub fn to_print(&self) -> Result<render::PrintDocument> {
        self.publisher.print_renderer().render(&self.document)
    }

    /// Writes every requested format into `output_dir`.
    ///
    /// Fails only if the output directory cannot be created; per-format
    /// failures are reported in the returned [`ConversionReport`].
    pub fn publish(
        &self,
        formats: &[OutputFormat],
        output_dir: impl AsRef<Path>,
    ) -> Result<ConversionReport> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        Ok(convert_all(
            &self.publisher,
            &self.document,
            formats,
            output_dir,
            &self.stem,
        ))
    }

    /// Returns the plain text content.
    pub fn to_text(&self) -> String {
        self.document.plain_text()
    }

    /// Consumes self and returns the underlying document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::sample_docx;
    use crate::render::HtmlLayout;

    #[test]
    fn test_output_stem_sanitizes_title() {
        let input = Path::new("drafts/manuscript.docx");
        assert_eq!(output_stem("My Book: Part 1!", input), "My Book Part 1");
        assert_eq!(output_stem("  Über-Title_2  ", input), "Über-Title_2");
    }

    #[test]
    fn test_output_stem_falls_back_to_input() {
        let input = Path::new("drafts/manuscript.docx");
        assert_eq!(output_stem("Untitled", input), "manuscript");
        assert_eq!(output_stem("?!*", input), "manuscript");
        assert_eq!(output_stem("", input), "manuscript");
    }

    #[test]
    fn test_build_bytes_applies_config() {
        let mut config = TypesetConfig::default();
        config.metadata.publisher = Some("Small Press".into());
        let document = build_bytes(&sample_docx(), &config).unwrap();

        assert_eq!(document.metadata.title, "Sample Book");
        assert_eq!(document.metadata.publisher.as_deref(), Some("Small Press"));
        let titles: Vec<_> = document.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter One", "Chapter Two"]);
    }

    #[test]
    fn test_build_file_missing_is_not_found() {
        let err = build_file("/nowhere/manuscript.docx", &TypesetConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_unknown_bytes_rejected() {
        let err = read_source_bytes(b"plain text, not a package").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn test_typeset_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("manuscript.docx");
        std::fs::write(&input, sample_docx()).unwrap();

        let built = Typeset::new()
            .with_title("Renamed Book")
            .with_layout(HtmlLayout)
            .deterministic()
            .build(&input)
            .unwrap();
        assert_eq!(built.stem(), "Renamed Book");
        assert_eq!(built.document().metadata.title, "Renamed Book");

        let out = dir.path().join("out");
        let report = built.publish(&OutputFormat::ALL, &out).unwrap();
        assert!(report.all_succeeded());
        assert!(out.join("Renamed Book.epub").exists());
        assert!(out.join("Renamed Book.html").exists());
    }

    #[test]
    fn test_deterministic_packages_match() {
        let first = Typeset::new()
            .deterministic()
            .build_source(&read_source_bytes(&sample_docx()).unwrap());
        let second = Typeset::new()
            .deterministic()
            .build_source(&read_source_bytes(&sample_docx()).unwrap());
        assert_eq!(first.to_epub().unwrap(), second.to_epub().unwrap());
        assert_eq!(first.to_print().unwrap(), second.to_print().unwrap());
    }
}
