//! Output back-ends: EPUB container writing and print layout hand-off.

use super::epub::{EpubPackage, STYLESHEET_HREF};
use super::options::EpubVersion;
use super::pdf::PrintDocument;
use super::OutputFormat;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes an [`EpubPackage`] as a final container.
pub trait EpubBackend: Send + Sync {
    fn write_package(&self, package: &EpubPackage, output: &Path) -> Result<()>;
}

/// Lays out a [`PrintDocument`] into a final file.
pub trait LayoutBackend: Send + Sync {
    /// Short name for messages.
    fn name(&self) -> &str;

    /// Extension of the produced file, without the dot.
    fn extension(&self) -> &'static str;

    fn layout(&self, document: &PrintDocument, output: &Path) -> Result<()>;
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Writes EPUB packages as ZIP containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubZipWriter;

impl EpubZipWriter {
    pub fn new() -> Self {
        Self
    }

    /// Writes the container to any seekable writer.
    pub fn write_to<W: Write + Seek>(&self, package: &EpubPackage, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // mimetype must be first and uncompressed
        zip.start_file("mimetype", stored).map_err(epub_error)?;
        zip.write_all(b"application/epub+zip").map_err(epub_error)?;

        let mut entries: Vec<(String, &[u8])> = vec![
            ("META-INF/container.xml".to_string(), CONTAINER_XML),
            (
                "OEBPS/content.opf".to_string(),
                package.package_document.as_bytes(),
            ),
            ("OEBPS/toc.ncx".to_string(), package.ncx.as_bytes()),
        ];
        if let (EpubVersion::V3, Some(nav)) = (package.version, &package.nav) {
            entries.push(("OEBPS/nav.xhtml".to_string(), nav.as_bytes()));
        }
        entries.push((
            format!("OEBPS/{}", STYLESHEET_HREF),
            package.stylesheet.as_bytes(),
        ));
        for unit in &package.units {
            entries.push((format!("OEBPS/{}", unit.href), unit.xhtml.as_bytes()));
        }
        for image in package.images.iter().chain(package.cover.iter()) {
            entries.push((format!("OEBPS/{}", image.href), &image.data[..]));
        }

        for (name, data) in entries {
            zip.start_file(name, deflated).map_err(epub_error)?;
            zip.write_all(data).map_err(epub_error)?;
        }

        zip.finish().map_err(epub_error)?;
        Ok(())
    }
}

impl EpubBackend for EpubZipWriter {
    fn write_package(&self, package: &EpubPackage, output: &Path) -> Result<()> {
        let file = File::create(output).map_err(epub_error)?;
        self.write_to(package, BufWriter::new(file))?;
        log::info!("Wrote {}", output.display());
        Ok(())
    }
}

fn epub_error(err: impl std::fmt::Display) -> Error {
    Error::render(OutputFormat::Epub, err)
}

fn print_error(err: impl std::fmt::Display) -> Error {
    Error::render(OutputFormat::Pdf, err)
}

/// Writes the print document as self-contained HTML for an external engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLayout;

impl LayoutBackend for HtmlLayout {
    fn name(&self) -> &str {
        "html"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn layout(&self, document: &PrintDocument, output: &Path) -> Result<()> {
        std::fs::write(output, document.to_html()).map_err(print_error)?;
        log::info!("Wrote {}", output.display());
        Ok(())
    }
}

/// Runs an external HTML-to-PDF program.
///
/// The program is invoked as `program [args...] <input.html> <output.pdf>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLayout {
    program: String,
    args: Vec<String>,
}

impl Default for CommandLayout {
    fn default() -> Self {
        Self::weasyprint()
    }
}

impl CommandLayout {
    /// Creates a layout back-end running `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// WeasyPrint, which understands the paged-media rules of the print stylesheet.
    pub fn weasyprint() -> Self {
        Self::new("weasyprint")
    }

    /// Adds an argument placed before the input and output paths.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn intermediate_path(output: &Path) -> PathBuf {
        output.with_extension("print.html")
    }
}

impl LayoutBackend for CommandLayout {
    fn name(&self) -> &str {
        &self.program
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn layout(&self, document: &PrintDocument, output: &Path) -> Result<()> {
        let input = Self::intermediate_path(output);
        std::fs::write(&input, document.to_html()).map_err(print_error)?;

        log::debug!("Running {} on {}", self.program, input.display());
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(&input)
            .arg(output)
            .output()
            .map_err(|e| print_error(format!("cannot run {}: {}", self.program, e)))?;

        if !result.status.success() {
            let mut message = match result.status.code() {
                Some(code) => format!("engine exited with status {}", code),
                None => "engine was terminated by a signal".to_string(),
            };
            let stderr = String::from_utf8_lossy(&result.stderr);
            if !stderr.trim().is_empty() {
                message.push_str(&format!(": {}", stderr.trim()));
            }
            // keep the intermediate HTML around for inspection
            return Err(print_error(message));
        }

        if let Err(e) = std::fs::remove_file(&input) {
            log::debug!("Could not remove {}: {}", input.display(), e);
        }
        log::info!("Wrote {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, Document, Image, Node};
    use crate::render::{EpubConfig, PaginatedRenderer, ReflowableRenderer, Renderer};
    use bytes::Bytes;
    use std::io::{Cursor, Read};

    fn document() -> Document {
        let mut document = Document::new();
        let mut chapter = Chapter::new("One", 1, 1);
        chapter.content = vec![Node::Image(Image::new(
            Bytes::from_static(b"\x89PNG\r\n"),
            "image/png",
            "image_1.png",
        ))];
        document.chapters.push(chapter);
        document
    }

    fn package() -> EpubPackage {
        ReflowableRenderer::new(EpubConfig::new().deterministic())
            .render(&document())
            .unwrap()
    }

    #[test]
    fn test_zip_layout() {
        let mut buffer = Cursor::new(Vec::new());
        EpubZipWriter::new().write_to(&package(), &mut buffer).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        for name in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/toc.ncx",
            "OEBPS/nav.xhtml",
            "OEBPS/style/default.css",
            "OEBPS/chap_000.xhtml",
            "OEBPS/images/image_1.png",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }

        let mut image = Vec::new();
        archive
            .by_name("OEBPS/images/image_1.png")
            .unwrap()
            .read_to_end(&mut image)
            .unwrap();
        assert_eq!(image, b"\x89PNG\r\n");
    }

    #[test]
    fn test_write_package_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        EpubZipWriter::new().write_package(&package(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_package_to_missing_dir_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("book.epub");
        let err = EpubZipWriter::new().write_package(&package(), &path).unwrap_err();
        assert!(matches!(err, Error::Render { format: OutputFormat::Epub, .. }));
    }

    #[test]
    fn test_html_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.html");
        let print = PaginatedRenderer::default().render(&document()).unwrap();
        HtmlLayout.layout(&print, &path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("@page"));
        assert!(html.contains("<h1 class=\"chapter-title\">One</h1>"));
    }

    #[test]
    fn test_missing_engine_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        let print = PaginatedRenderer::default().render(&document()).unwrap();
        let err = CommandLayout::new("typeset-no-such-engine")
            .layout(&print, &path)
            .unwrap_err();
        assert!(matches!(err, Error::Render { format: OutputFormat::Pdf, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_failure_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        let print = PaginatedRenderer::default().render(&document()).unwrap();
        let err = CommandLayout::new("false").layout(&print, &path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PDF rendering failed: engine exited with status 1"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_success_removes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        let print = PaginatedRenderer::default().render(&document()).unwrap();
        CommandLayout::new("true").layout(&print, &path).unwrap();
        assert!(!dir.path().join("book.print.html").exists());
    }
}
