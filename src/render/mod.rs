//! Rendering of documents into publications.
//!
//! Two renderers share one tree walk ([`MarkupWriter`]): the reflowable
//! renderer produces an [`EpubPackage`], the paginated renderer a
//! [`PrintDocument`]. Back-ends turn those into final files.

mod backend;
mod epub;
mod options;
mod pdf;
mod resources;
mod stylesheet;
mod walker;

pub use backend::{CommandLayout, EpubBackend, EpubZipWriter, HtmlLayout, LayoutBackend};
pub use epub::{ContentUnit, EpubPackage, PackagedImage, ReflowableRenderer, STYLESHEET_HREF};
pub use options::{
    EpubConfig, EpubVersion, IdentifierFallback, Margins, PageNumberPosition, PdfConfig,
};
pub use pdf::{PaginatedRenderer, PrintDocument};
pub use resources::{resolve_images, ImageNaming, NodePath, ResolvedImage, ResourceMap, Scope};
pub use stylesheet::{epub_stylesheet, print_stylesheet};
pub use walker::{escape_xml, FootnoteMode, FormatHooks, MarkupDialect, MarkupWriter};

use crate::error::{Error, Result};
use crate::model::Document;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Publication formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Reflowable EPUB package
    Epub,
    /// Paginated print layout
    Pdf,
}

impl OutputFormat {
    /// All formats, in the order they are reported.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Epub, OutputFormat::Pdf];

    /// Default file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Epub => "epub",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Epub => write!(f, "EPUB"),
            OutputFormat::Pdf => write!(f, "PDF"),
        }
    }
}

/// Turns an immutable document into format-specific markup.
///
/// Implementations never modify the document, so one document may be
/// rendered by several renderers, in any order or concurrently.
pub trait Renderer {
    type Output;

    fn format(&self) -> OutputFormat;

    fn render(&self, document: &Document) -> Result<Self::Output>;
}

/// Renderers plus the back-ends that write their output.
pub struct Publisher {
    epub: ReflowableRenderer,
    pdf: PaginatedRenderer,
    epub_backend: Box<dyn EpubBackend>,
    layout: Box<dyn LayoutBackend>,
    parallel: bool,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(EpubConfig::default(), PdfConfig::default())
    }
}

impl Publisher {
    /// Creates a publisher writing ZIP containers and laying out with WeasyPrint.
    pub fn new(epub: EpubConfig, pdf: PdfConfig) -> Self {
        Self {
            epub: ReflowableRenderer::new(epub),
            pdf: PaginatedRenderer::new(pdf),
            epub_backend: Box::new(EpubZipWriter::new()),
            layout: Box::new(CommandLayout::weasyprint()),
            parallel: true,
        }
    }

    /// Replaces the EPUB back-end.
    pub fn with_epub_backend(mut self, backend: impl EpubBackend + 'static) -> Self {
        self.epub_backend = Box::new(backend);
        self
    }

    /// Replaces the print layout back-end.
    pub fn with_layout(self, layout: impl LayoutBackend + 'static) -> Self {
        self.with_boxed_layout(Box::new(layout))
    }

    /// Replaces the print layout back-end with one chosen at run time.
    pub fn with_boxed_layout(mut self, layout: Box<dyn LayoutBackend>) -> Self {
        self.layout = layout;
        self
    }

    /// Renders formats one after another instead of in parallel.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn epub_renderer(&self) -> &ReflowableRenderer {
        &self.epub
    }

    pub fn print_renderer(&self) -> &PaginatedRenderer {
        &self.pdf
    }

    /// Output path for a format: `{dir}/{stem}.{ext}`.
    ///
    /// The print extension follows the layout back-end.
    pub fn output_path(&self, format: OutputFormat, dir: &Path, stem: &str) -> PathBuf {
        let extension = match format {
            OutputFormat::Epub => format.extension(),
            OutputFormat::Pdf => self.layout.extension(),
        };
        dir.join(format!("{}.{}", stem, extension))
    }

    /// Renders one format and writes it to `output`.
    pub fn publish(&self, document: &Document, format: OutputFormat, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::render(format, e))?;
        }

        match format {
            OutputFormat::Epub => {
                let package = self.epub.render(document)?;
                self.epub_backend.write_package(&package, output)
            }
            OutputFormat::Pdf => {
                let print = self.pdf.render(document)?;
                log::debug!("Laying out print document with {}", self.layout.name());
                self.layout.layout(&print, output)
            }
        }
    }
}

/// Result of one format in a multi-format conversion.
#[derive(Debug)]
pub struct FormatOutcome {
    pub format: OutputFormat,
    pub output: PathBuf,
    pub result: Result<()>,
}

impl FormatOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-format results of [`convert_all`], in request order.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub outcomes: Vec<FormatOutcome>,
}

impl ConversionReport {
    /// Returns true if every requested format was written.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(FormatOutcome::is_success)
    }

    /// Iterates the formats that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FormatOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Iterates the formats that were written.
    pub fn successes(&self) -> impl Iterator<Item = &FormatOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }
}

/// Renders every requested format into `output_dir`.
///
/// A failing format never stops the others; each outcome is reported on
/// its own. Duplicate formats are rendered once.
pub fn convert_all(
    publisher: &Publisher,
    document: &Document,
    formats: &[OutputFormat],
    output_dir: &Path,
    stem: &str,
) -> ConversionReport {
    let mut requested: Vec<OutputFormat> = Vec::new();
    for format in formats {
        if !requested.contains(format) {
            requested.push(*format);
        }
    }

    let run = |format: &OutputFormat| {
        let output = publisher.output_path(*format, output_dir, stem);
        let result = publisher.publish(document, *format, &output);
        if let Err(e) = &result {
            log::warn!("{}", e);
        }
        FormatOutcome {
            format: *format,
            output,
            result,
        }
    };

    let outcomes = if publisher.parallel {
        requested.par_iter().map(run).collect()
    } else {
        requested.iter().map(run).collect()
    };

    ConversionReport { outcomes }
}
