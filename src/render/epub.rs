//! Reflowable (EPUB) renderer.
//!
//! Produces one XHTML content document per chapter plus the package
//! document, NCX and navigation document. Writing the ZIP container is left
//! to an [`EpubBackend`](super::EpubBackend).

use super::options::{EpubConfig, EpubVersion, IdentifierFallback};
use super::resources::{resolve_images, ImageNaming, NodePath, ResourceMap, Scope};
use super::stylesheet::epub_stylesheet;
use super::walker::{escape_xml, FootnoteMode, FormatHooks, MarkupDialect, MarkupWriter};
use super::{OutputFormat, Renderer};
use crate::detect::detect_image_format;
use crate::error::{Error, Result};
use crate::model::{Chapter, Document, Image, Metadata, Node};
use bytes::Bytes;
use uuid::Uuid;

/// Stylesheet location inside the package, relative to the package document.
pub const STYLESHEET_HREF: &str = "style/default.css";

/// `dcterms:modified` value when the document carries no modified date.
const FALLBACK_MODIFIED: &str = "2024-01-01T00:00:00Z";

/// A content document of the package.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    /// Manifest id
    pub id: String,
    /// Path relative to the package document
    pub href: String,
    pub xhtml: String,
}

/// A binary resource of the package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackagedImage {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub data: Bytes,
}

/// Everything an EPUB container holds, as markup and shared payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct EpubPackage {
    pub version: EpubVersion,
    pub identifier: String,
    /// `content.opf`
    pub package_document: String,
    /// `toc.ncx`
    pub ncx: String,
    /// `nav.xhtml` (EPUB 3 only)
    pub nav: Option<String>,
    pub stylesheet: String,
    /// Content documents in reading order.
    pub units: Vec<ContentUnit>,
    pub images: Vec<PackagedImage>,
    pub cover: Option<PackagedImage>,
}

/// Renders documents into EPUB packages.
#[derive(Debug, Clone, Default)]
pub struct ReflowableRenderer {
    config: EpubConfig,
}

struct EpubHooks<'a> {
    resources: &'a ResourceMap,
    dialect: MarkupDialect,
}

impl FormatHooks for EpubHooks<'_> {
    fn image_src(&self, path: &NodePath, _image: &Image) -> Option<String> {
        self.resources.get(path).map(|image| image.href.clone())
    }

    fn footnote_mode(&self) -> FootnoteMode {
        FootnoteMode::Linked
    }

    fn dialect(&self) -> MarkupDialect {
        self.dialect
    }
}

/// A navigation entry: label and target.
struct TocEntry {
    title: String,
    href: String,
}

impl ReflowableRenderer {
    /// Creates a renderer with the given options.
    pub fn new(config: EpubConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EpubConfig {
        &self.config
    }

    /// Chooses the package identifier.
    ///
    /// Explicit identifier, then the EPUB ISBN, then the print ISBN, then the
    /// configured fallback.
    pub fn identifier(&self, metadata: &Metadata) -> String {
        let explicit = [
            self.config.identifier.as_deref(),
            metadata.isbn_epub.as_deref(),
            metadata.print_isbn(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty());
        if let Some(id) = explicit {
            return id.to_string();
        }

        match self.config.identifier_fallback {
            IdentifierFallback::Random => {
                log::warn!("No identifier or ISBN configured; generating a random package identifier");
                format!("urn:uuid:{}", Uuid::new_v4())
            }
            IdentifierFallback::Derived => {
                let name = format!("{}\n{}", metadata.title, metadata.authors.join("\n"));
                format!(
                    "urn:uuid:{}",
                    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
                )
            }
        }
    }

    /// Package language: override, then document language, then configured default.
    pub fn language(&self, metadata: &Metadata) -> String {
        [
            self.config.language_override.as_deref(),
            Some(metadata.language.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|lang| !lang.is_empty())
        .unwrap_or(self.config.language.as_str())
        .to_string()
    }

    fn dialect(&self) -> MarkupDialect {
        match self.config.version {
            EpubVersion::V3 => MarkupDialect::Epub3,
            EpubVersion::V2 => MarkupDialect::Xhtml11,
        }
    }

    fn stylesheet(&self) -> Result<String> {
        let mut css = epub_stylesheet(&self.config);
        if let Some(path) = &self.config.css_file {
            let extra = std::fs::read_to_string(path).map_err(|e| {
                Error::render(
                    OutputFormat::Epub,
                    format!("cannot read stylesheet {}: {}", path.display(), e),
                )
            })?;
            css.push('\n');
            css.push_str(&extra);
        }
        Ok(css)
    }

    fn cover(&self, metadata: &Metadata) -> Result<Option<PackagedImage>> {
        let (data, media_type) = if let Some(data) = &metadata.cover_image {
            (data.clone(), metadata.cover_mime_type.clone())
        } else if let Some(path) = &self.config.cover_image {
            let data = std::fs::read(path).map_err(|e| {
                Error::render(
                    OutputFormat::Epub,
                    format!("cannot read cover image {}: {}", path.display(), e),
                )
            })?;
            let format = detect_image_format(&data);
            (Bytes::from(data), format.mime_type().to_string())
        } else {
            return Ok(None);
        };

        let extension = crate::detect::extension_for_mime(&media_type).to_string();
        Ok(Some(PackagedImage {
            id: "cover-image".to_string(),
            href: format!("images/cover.{}", extension),
            media_type,
            data,
        }))
    }

    fn unit(&self, id: &str, href: String, title: &str, language: &str, body: &str) -> ContentUnit {
        ContentUnit {
            id: id.to_string(),
            href,
            xhtml: self.xhtml_document(title, language, body),
        }
    }

    fn xhtml_document(&self, title: &str, language: &str, body: &str) -> String {
        let lang = escape_xml(language);
        let head = match self.config.version {
            EpubVersion::V3 => format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n\
                 <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"{}\" lang=\"{}\">\n",
                lang, lang
            ),
            EpubVersion::V2 => format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                 <!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">\n\
                 <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{}\">\n",
                lang
            ),
        };

        format!(
            "{}<head>\n<title>{}</title>\n<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            head,
            escape_xml(title),
            STYLESHEET_HREF,
            body
        )
    }

    /// Opening tag of a section with an EPUB structural type.
    fn section_open(&self, epub_type: &str, id: &str, untitled: bool) -> String {
        let class = if untitled {
            format!("{} untitled", epub_type)
        } else {
            epub_type.to_string()
        };
        match self.config.version {
            EpubVersion::V3 => format!(
                "<section class=\"{}\" epub:type=\"{}\" id=\"{}\">",
                class,
                epub_type,
                escape_xml(id)
            ),
            EpubVersion::V2 => format!("<div class=\"{}\" id=\"{}\">", class, escape_xml(id)),
        }
    }

    fn section_close(&self) -> &'static str {
        match self.config.version {
            EpubVersion::V3 => "</section>",
            EpubVersion::V2 => "</div>",
        }
    }

    /// Writes one chapter section, followed by the bodies of footnotes first
    /// referenced in it.
    ///
    /// The writer is shared by every chapter of one content document, so a
    /// footnote referenced again later links back to its first body.
    fn chapter_body(
        &self,
        writer: &mut MarkupWriter<'_, EpubHooks<'_>>,
        index: usize,
        chapter: &Chapter,
    ) -> String {
        let mut body = self.section_open("chapter", &chapter.id, chapter.is_untitled());
        body.push('\n');
        if !chapter.is_untitled() {
            body.push_str(&format!("<h1>{}</h1>\n", escape_xml(&chapter.title)));
        }

        writer.write_nodes(Scope::Chapter(index), &chapter.content, &mut body);
        writer.write_notes(&mut body);
        body.push('\n');
        body.push_str(self.section_close());
        body
    }

    fn matter_body(
        &self,
        hooks: &EpubHooks<'_>,
        document: &Document,
        scope: Scope,
        epub_type: &str,
        nodes: &[Node],
    ) -> String {
        let mut body = self.section_open(epub_type, epub_type, false);
        body.push('\n');
        let mut writer = MarkupWriter::new(hooks, &document.footnotes);
        writer.write_nodes(scope, nodes, &mut body);
        writer.write_notes(&mut body);
        body.push('\n');
        body.push_str(self.section_close());
        body
    }

    fn content_units(
        &self,
        document: &Document,
        resources: &ResourceMap,
        language: &str,
    ) -> (Vec<ContentUnit>, Vec<TocEntry>) {
        let hooks = EpubHooks {
            resources,
            dialect: self.dialect(),
        };
        let title = &document.metadata.title;
        let mut units = Vec::new();
        let mut toc = Vec::new();

        if !document.front_matter.is_empty() {
            let body = self.matter_body(
                &hooks,
                document,
                Scope::FrontMatter,
                "frontmatter",
                &document.front_matter,
            );
            units.push(self.unit("front", "front.xhtml".into(), title, language, &body));
        }

        if self.config.split_chapters {
            for (index, chapter) in document.chapters.iter().enumerate() {
                let href = format!("chap_{:03}.xhtml", index);
                let mut writer = MarkupWriter::new(&hooks, &document.footnotes);
                let body = self.chapter_body(&mut writer, index, chapter);
                let unit_title = if chapter.is_untitled() {
                    title
                } else {
                    &chapter.title
                };
                if !chapter.is_untitled() {
                    toc.push(TocEntry {
                        title: chapter.title.clone(),
                        href: href.clone(),
                    });
                }
                units.push(self.unit(
                    &format!("chap_{:03}", index),
                    href,
                    unit_title,
                    language,
                    &body,
                ));
            }
        } else {
            let href = "content.xhtml".to_string();
            let mut body = String::new();
            let mut writer = MarkupWriter::new(&hooks, &document.footnotes);
            for (index, chapter) in document.chapters.iter().enumerate() {
                if index > 0 {
                    body.push('\n');
                }
                body.push_str(&self.chapter_body(&mut writer, index, chapter));
                if !chapter.is_untitled() {
                    toc.push(TocEntry {
                        title: chapter.title.clone(),
                        href: format!("{}#{}", href, chapter.id),
                    });
                }
            }
            units.push(self.unit("content", href, title, language, &body));
        }

        if !document.back_matter.is_empty() {
            let body = self.matter_body(
                &hooks,
                document,
                Scope::BackMatter,
                "backmatter",
                &document.back_matter,
            );
            units.push(self.unit("back", "back.xhtml".into(), title, language, &body));
        }

        // navigation documents need at least one entry
        if toc.is_empty() {
            if let Some(first) = units.iter().find(|u| u.id != "front").or(units.first()) {
                toc.push(TocEntry {
                    title: title.clone(),
                    href: first.href.clone(),
                });
            }
        }

        (units, toc)
    }

    fn package_document(
        &self,
        metadata: &Metadata,
        identifier: &str,
        language: &str,
        units: &[ContentUnit],
        images: &[PackagedImage],
        cover: Option<&PackagedImage>,
    ) -> String {
        let v3 = self.config.version == EpubVersion::V3;
        let mut opf = String::new();

        opf.push_str(&format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"{}\" unique-identifier=\"BookId\">\n\
             \x20 <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">\n",
            self.config.version.as_str()
        ));
        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape_xml(identifier)
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_xml(&metadata.title)
        ));
        for author in &metadata.authors {
            opf.push_str(&format!(
                "    <dc:creator>{}</dc:creator>\n",
                escape_xml(author)
            ));
        }
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_xml(language)
        ));
        if v3 {
            opf.push_str(&format!(
                "    <meta property=\"dcterms:modified\">{}</meta>\n",
                escape_xml(metadata.modified_date.as_deref().unwrap_or(FALLBACK_MODIFIED))
            ));
        }
        if let Some(publisher) = &metadata.publisher {
            opf.push_str(&format!(
                "    <dc:publisher>{}</dc:publisher>\n",
                escape_xml(publisher)
            ));
        }
        if let Some(description) = &metadata.description {
            opf.push_str(&format!(
                "    <dc:description>{}</dc:description>\n",
                escape_xml(description)
            ));
        }
        for keyword in &metadata.keywords {
            opf.push_str(&format!(
                "    <dc:subject>{}</dc:subject>\n",
                escape_xml(keyword)
            ));
        }
        if let Some(date) = &metadata.publication_date {
            opf.push_str(&format!("    <dc:date>{}</dc:date>\n", escape_xml(date)));
        }
        if let Some(rights) = &metadata.copyright {
            opf.push_str(&format!(
                "    <dc:rights>{}</dc:rights>\n",
                escape_xml(rights)
            ));
        }
        if let Some(cover) = cover {
            opf.push_str(&format!(
                "    <meta name=\"cover\" content=\"{}\"/>\n",
                cover.id
            ));
        }
        opf.push_str("  </metadata>\n");

        opf.push_str("  <manifest>\n");
        opf.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
        if v3 {
            opf.push_str("    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n");
        }
        opf.push_str(&format!(
            "    <item id=\"style\" href=\"{}\" media-type=\"text/css\"/>\n",
            STYLESHEET_HREF
        ));
        for unit in units {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                escape_xml(&unit.id),
                escape_xml(&unit.href)
            ));
        }
        for image in images {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
                escape_xml(&image.id),
                escape_xml(&image.href),
                escape_xml(&image.media_type)
            ));
        }
        if let Some(cover) = cover {
            let properties = if v3 { " properties=\"cover-image\"" } else { "" };
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
                cover.id,
                escape_xml(&cover.href),
                escape_xml(&cover.media_type),
                properties
            ));
        }
        opf.push_str("  </manifest>\n");

        opf.push_str("  <spine toc=\"ncx\">\n");
        if v3 && self.config.include_toc {
            opf.push_str("    <itemref idref=\"nav\"/>\n");
        }
        for unit in units {
            opf.push_str(&format!(
                "    <itemref idref=\"{}\"/>\n",
                escape_xml(&unit.id)
            ));
        }
        opf.push_str("  </spine>\n");
        opf.push_str("</package>\n");
        opf
    }

    fn ncx(&self, metadata: &Metadata, identifier: &str, toc: &[TocEntry]) -> String {
        let mut ncx = String::new();
        ncx.push_str(&format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">\n\
             <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n\
             \x20 <head>\n\
             \x20   <meta name=\"dtb:uid\" content=\"{}\"/>\n\
             \x20   <meta name=\"dtb:depth\" content=\"1\"/>\n\
             \x20   <meta name=\"dtb:totalPageCount\" content=\"0\"/>\n\
             \x20   <meta name=\"dtb:maxPageNumber\" content=\"0\"/>\n\
             \x20 </head>\n\
             \x20 <docTitle>\n\
             \x20   <text>{}</text>\n\
             \x20 </docTitle>\n\
             \x20 <navMap>\n",
            escape_xml(identifier),
            escape_xml(&metadata.title)
        ));

        for (index, entry) in toc.iter().enumerate() {
            let order = index + 1;
            ncx.push_str(&format!(
                "    <navPoint id=\"navPoint-{}\" playOrder=\"{}\">\n\
                 \x20     <navLabel><text>{}</text></navLabel>\n\
                 \x20     <content src=\"{}\"/>\n\
                 \x20   </navPoint>\n",
                order,
                order,
                escape_xml(&entry.title),
                escape_xml(&entry.href)
            ));
        }

        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    fn nav(&self, language: &str, toc: &[TocEntry]) -> String {
        let mut items = String::new();
        for entry in toc {
            items.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape_xml(&entry.href),
                escape_xml(&entry.title)
            ));
        }
        let body = format!(
            "<nav epub:type=\"toc\" id=\"toc\">\n<h1>Contents</h1>\n<ol>\n{}</ol>\n</nav>",
            items
        );
        self.xhtml_document("Contents", language, &body)
    }
}

impl Renderer for ReflowableRenderer {
    type Output = EpubPackage;

    fn format(&self) -> OutputFormat {
        OutputFormat::Epub
    }

    fn render(&self, document: &Document) -> Result<EpubPackage> {
        let metadata = &document.metadata;
        let identifier = self.identifier(metadata);
        let language = self.language(metadata);

        let resources = resolve_images(document, &ImageNaming::packaged());
        let images: Vec<PackagedImage> = resources
            .iter()
            .enumerate()
            .map(|(index, (_, image))| PackagedImage {
                id: format!("image_{}", index + 1),
                href: image.href.clone(),
                media_type: image.media_type.clone(),
                data: image.data.clone(),
            })
            .collect();
        let cover = self.cover(metadata)?;

        let (units, toc) = self.content_units(document, &resources, &language);
        let package_document = self.package_document(
            metadata,
            &identifier,
            &language,
            &units,
            &images,
            cover.as_ref(),
        );
        let ncx = self.ncx(metadata, &identifier, &toc);
        let nav = match self.config.version {
            EpubVersion::V3 => Some(self.nav(&language, &toc)),
            EpubVersion::V2 => None,
        };

        log::debug!(
            "EPUB package: {} content document(s), {} image(s)",
            units.len(),
            images.len()
        );

        Ok(EpubPackage {
            version: self.config.version,
            identifier,
            package_document,
            ncx,
            nav,
            stylesheet: self.stylesheet()?,
            units,
            images,
            cover,
        })
    }
}
