//! Paginated (print) renderer.
//!
//! All chapters go into one continuous HTML flow. Running headers, page
//! numbers and footnote placement are left to the layout engine through the
//! print stylesheet (`string-set`, `@page` margin boxes, `float: footnote`).

use super::options::PdfConfig;
use super::resources::{resolve_images, ImageNaming, NodePath, ResourceMap, Scope};
use super::stylesheet::print_stylesheet;
use super::walker::{escape_xml, FootnoteMode, FormatHooks, MarkupDialect, MarkupWriter};
use super::{OutputFormat, Renderer};
use crate::error::Result;
use crate::model::{Document, Image, Metadata};

/// Print markup and stylesheet, ready for a layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintDocument {
    pub language: String,
    pub title: String,
    /// Contents of `<body>`.
    pub body: String,
    pub stylesheet: String,
}

impl PrintDocument {
    /// Returns a self-contained HTML document with the stylesheet inlined.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\"/>\n\
             <title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_xml(&self.language),
            escape_xml(&self.title),
            self.stylesheet,
            self.body
        )
    }
}

/// Renders documents into print layout documents.
#[derive(Debug, Clone, Default)]
pub struct PaginatedRenderer {
    config: PdfConfig,
}

struct PrintHooks<'a> {
    resources: &'a ResourceMap,
}

impl FormatHooks for PrintHooks<'_> {
    fn image_src(&self, path: &NodePath, _image: &Image) -> Option<String> {
        self.resources.get(path).map(|image| image.href.clone())
    }

    fn footnote_mode(&self) -> FootnoteMode {
        FootnoteMode::Inline
    }

    fn dialect(&self) -> MarkupDialect {
        MarkupDialect::Html5
    }
}

impl PaginatedRenderer {
    /// Creates a renderer with the given options.
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    fn title_page(&self, metadata: &Metadata) -> String {
        let mut page = String::from("<section class=\"title-page\">\n");
        page.push_str(&format!(
            "<h1 class=\"book-title\">{}</h1>\n",
            escape_xml(&metadata.title)
        ));
        if let Some(subtitle) = &metadata.subtitle {
            page.push_str(&format!(
                "<p class=\"subtitle\">{}</p>\n",
                escape_xml(subtitle)
            ));
        }
        page.push_str(&format!(
            "<p class=\"author\">{}</p>\n",
            escape_xml(&metadata.author_line())
        ));
        if let Some(publisher) = &metadata.publisher {
            page.push_str(&format!(
                "<p class=\"publisher\">{}</p>\n",
                escape_xml(publisher)
            ));
        }
        page.push_str("</section>");
        page
    }

    fn copyright_page(&self, metadata: &Metadata) -> Option<String> {
        let copyright = metadata.copyright.as_ref()?;
        let mut page = String::from("<section class=\"copyright-page\">\n");
        page.push_str(&format!("<p>{}</p>\n", escape_xml(copyright)));
        if let Some(isbn) = metadata.print_isbn() {
            page.push_str(&format!("<p>ISBN: {}</p>\n", escape_xml(isbn)));
        }
        page.push_str("</section>");
        Some(page)
    }

    fn toc(&self, document: &Document) -> Option<String> {
        let entries: Vec<String> = document
            .chapters
            .iter()
            .filter(|chapter| !chapter.is_untitled())
            .map(|chapter| {
                format!(
                    "<li><a href=\"#{}\">{}</a></li>",
                    escape_xml(&chapter.id),
                    escape_xml(&chapter.title)
                )
            })
            .collect();
        if entries.is_empty() {
            return None;
        }

        Some(format!(
            "<section class=\"toc\">\n<h2>Contents</h2>\n<nav>\n<ol>\n{}\n</ol>\n</nav>\n</section>",
            entries.join("\n")
        ))
    }
}

impl Renderer for PaginatedRenderer {
    type Output = PrintDocument;

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, document: &Document) -> Result<PrintDocument> {
        let metadata = &document.metadata;
        let resources = resolve_images(document, &ImageNaming::DataUri);
        let hooks = PrintHooks {
            resources: &resources,
        };
        let mut writer = MarkupWriter::new(&hooks, &document.footnotes);

        let mut sections: Vec<String> = vec![format!(
            "<div class=\"running-title\">{}</div>",
            escape_xml(&metadata.title)
        )];

        if self.config.include_title_page {
            sections.push(self.title_page(metadata));
        }
        if self.config.include_copyright_page {
            sections.extend(self.copyright_page(metadata));
        }
        if self.config.include_toc {
            sections.extend(self.toc(document));
        }

        if !document.front_matter.is_empty() {
            let mut section = String::from("<section class=\"front-matter\">\n");
            writer.write_nodes(Scope::FrontMatter, &document.front_matter, &mut section);
            section.push_str("\n</section>");
            sections.push(section);
        }

        for (index, chapter) in document.chapters.iter().enumerate() {
            let mut section = if chapter.is_untitled() {
                format!(
                    "<section class=\"chapter untitled\" id=\"{}\">\n",
                    escape_xml(&chapter.id)
                )
            } else {
                format!(
                    "<section class=\"chapter\" id=\"{}\">\n<h1 class=\"chapter-title\">{}</h1>\n",
                    escape_xml(&chapter.id),
                    escape_xml(&chapter.title)
                )
            };
            writer.write_nodes(Scope::Chapter(index), &chapter.content, &mut section);
            section.push_str("\n</section>");
            sections.push(section);
        }

        if !document.back_matter.is_empty() {
            let mut section = String::from("<section class=\"back-matter\">\n");
            writer.write_nodes(Scope::BackMatter, &document.back_matter, &mut section);
            section.push_str("\n</section>");
            sections.push(section);
        }

        log::debug!(
            "Print document: {} section(s), {} embedded image(s)",
            sections.len(),
            resources.len()
        );

        Ok(PrintDocument {
            language: self
                .config
                .language_override
                .clone()
                .unwrap_or_else(|| metadata.language.clone()),
            title: metadata.title.clone(),
            body: sections.join("\n"),
            stylesheet: print_stylesheet(&self.config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, Node};
    use bytes::Bytes;

    fn document() -> Document {
        let mut document = Document::new();
        document.metadata.title = "Sample Book".into();
        document.metadata.subtitle = Some("A Story".into());
        document.metadata.authors = vec!["Jane Author".into(), "John Writer".into()];
        document.metadata.copyright = Some("© 2024 Jane Author".into());
        document.metadata.isbn_print = Some("978-0-00-000000-1".into());

        let mut lead = Chapter::with_id("", 1, "chapter-1");
        lead.content = vec![Node::paragraph(vec![Node::text("Lead-in.")])];
        let mut one = Chapter::new("Chapter One", 1, 2);
        one.content = vec![
            Node::paragraph(vec![
                Node::text("Hello"),
                Node::FootnoteRef {
                    id: "1".into(),
                    ordinal: 1,
                },
            ]),
            Node::Image(Image::new(
                Bytes::from_static(b"\x89PNG\r\n"),
                "image/png",
                "image_1.png",
            )),
        ];
        document.chapters = vec![lead, one];
        document.footnotes.insert(
            "1".into(),
            Node::Footnote {
                id: "1".into(),
                children: vec![Node::paragraph(vec![Node::text("Note.")])],
            },
        );
        document
    }

    fn render(config: PdfConfig) -> PrintDocument {
        PaginatedRenderer::new(config).render(&document()).unwrap()
    }

    #[test]
    fn test_front_pages() {
        let print = render(PdfConfig::default());
        assert!(print.body.contains("<h1 class=\"book-title\">Sample Book</h1>"));
        assert!(print.body.contains("<p class=\"subtitle\">A Story</p>"));
        assert!(print.body.contains("<p class=\"author\">Jane Author, John Writer</p>"));
        assert!(print.body.contains("<p>ISBN: 978-0-00-000000-1</p>"));
        assert!(print.body.contains("<li><a href=\"#chapter-one\">Chapter One</a></li>"));
        assert!(!print.body.contains("href=\"#chapter-1\""));
    }

    #[test]
    fn test_front_pages_can_be_disabled() {
        let print = render(PdfConfig::new().without_front_matter_pages());
        assert!(!print.body.contains("title-page"));
        assert!(!print.body.contains("copyright-page"));
        assert!(!print.body.contains("class=\"toc\""));
        assert!(print.body.starts_with("<div class=\"running-title\">Sample Book</div>"));
    }

    #[test]
    fn test_chapters_flow_continuously() {
        let print = render(PdfConfig::default());
        assert!(print
            .body
            .contains("<section class=\"chapter untitled\" id=\"chapter-1\">\n<p>Lead-in.</p>"));
        assert!(print.body.contains(
            "<section class=\"chapter\" id=\"chapter-one\">\n<h1 class=\"chapter-title\">Chapter One</h1>"
        ));
        assert!(print.body.contains("src=\"data:image/png;base64,"));
        assert!(print
            .body
            .contains("Hello<span class=\"footnote\">Note.</span>"));
    }

    #[test]
    fn test_html_inlines_stylesheet() {
        let print = render(PdfConfig::new().with_language("fr"));
        let html = print.to_html();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"fr\">"));
        assert!(html.contains("<style>\n/* Print CSS for book layout */"));
        assert!(html.contains(&print.body));
    }

    #[test]
    fn test_copyright_page_requires_copyright() {
        let mut document = document();
        document.metadata.copyright = None;
        let print = PaginatedRenderer::default().render(&document).unwrap();
        assert!(!print.body.contains("copyright-page"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let document = document();
        let renderer = PaginatedRenderer::default();
        let (a, b) = rayon::join(
            || renderer.render(&document).unwrap(),
            || PaginatedRenderer::default().render(&document).unwrap(),
        );
        assert_eq!(a, b);
    }
}
