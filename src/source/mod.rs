//! Source document interface.
//!
//! A source adapter reads a word-processor package and yields a flat stream
//! of style-tagged blocks plus a resource map. The document builder consumes
//! only these types, so it never depends on a concrete file format.

use crate::error::Result;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;

/// Everything a source adapter yields from one read.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    /// Name of the source, typically the file stem
    pub name: Option<String>,
    /// Body blocks in document order
    pub blocks: Vec<SourceBlock>,
    /// Raw embedded resources keyed by resource id
    pub resources: HashMap<String, Bytes>,
    /// Document-level properties
    pub properties: DocumentProperties,
    /// Footnote bodies in declaration order
    pub footnotes: Vec<SourceFootnote>,
}

impl SourceDocument {
    /// Creates an empty source document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a paragraph block.
    pub fn push_paragraph(&mut self, paragraph: SourceParagraph) {
        self.blocks.push(SourceBlock::Paragraph(paragraph));
    }

    /// Appends a table block.
    pub fn push_table(&mut self, table: SourceTable) {
        self.blocks.push(SourceBlock::Table(table));
    }

    /// Returns the number of paragraph blocks.
    pub fn paragraph_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, SourceBlock::Paragraph(_)))
            .count()
    }

    /// Returns the number of table blocks.
    pub fn table_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, SourceBlock::Table(_)))
            .count()
    }
}

/// A top-level body block.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceBlock {
    Paragraph(SourceParagraph),
    Table(SourceTable),
}

/// A paragraph with its style name, runs and embedded resource references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceParagraph {
    /// Style name (not id), e.g. "Heading 1"
    pub style: String,
    /// Text runs in order
    pub runs: Vec<SourceRun>,
    /// Ids of embedded resources (images) in order
    pub images: Vec<String>,
}

impl SourceParagraph {
    /// Creates an empty paragraph with the given style name.
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            runs: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Creates a paragraph with a single plain run.
    pub fn with_text(style: impl Into<String>, text: impl Into<String>) -> Self {
        let mut paragraph = Self::new(style);
        paragraph.runs.push(SourceRun::new(text));
        paragraph
    }

    /// Appends a run.
    pub fn with_run(mut self, run: SourceRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Appends an embedded resource reference.
    pub fn with_image(mut self, resource_id: impl Into<String>) -> Self {
        self.images.push(resource_id.into());
        self
    }

    /// Returns the concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Returns true if any run carries a footnote reference.
    pub fn has_footnote_refs(&self) -> bool {
        self.runs.iter().any(|r| r.footnote.is_some())
    }

    /// Returns true if the paragraph has no text, no images and no footnote
    /// references.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
            && !self.has_footnote_refs()
            && self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// A run of text sharing one set of formatting flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub superscript: bool,
    pub subscript: bool,
    /// Hyperlink target, if the run sits inside a link
    pub link: Option<String>,
    /// Footnote id, if the run is a footnote reference mark
    pub footnote: Option<String>,
}

impl SourceRun {
    /// Creates a plain run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Sets bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Sets italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Sets strikethrough.
    pub fn strike(mut self) -> Self {
        self.strike = true;
        self
    }

    /// Sets superscript.
    pub fn superscript(mut self) -> Self {
        self.superscript = true;
        self
    }

    /// Sets subscript.
    pub fn subscript(mut self) -> Self {
        self.subscript = true;
        self
    }

    /// Sets the hyperlink target.
    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    /// Marks the run as a footnote reference.
    pub fn with_footnote(mut self, id: impl Into<String>) -> Self {
        self.footnote = Some(id.into());
        self
    }

    /// Returns true if any formatting flag is set.
    pub fn has_formatting(&self) -> bool {
        self.bold || self.italic || self.strike || self.superscript || self.subscript
    }
}

/// A table in row-major order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub rows: Vec<SourceRow>,
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub cells: Vec<SourceCell>,
}

/// A table cell holding its own paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCell {
    pub paragraphs: Vec<SourceParagraph>,
}

impl SourceTable {
    /// Builds a table of plain single-paragraph cells.
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|cells| SourceRow {
                    cells: cells
                        .iter()
                        .map(|text| SourceCell {
                            paragraphs: vec![SourceParagraph::with_text("Normal", *text)],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Returns true if no cell contains any text or image.
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.paragraphs.iter())
            .all(SourceParagraph::is_empty)
    }
}

/// A footnote body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFootnote {
    pub id: String,
    pub paragraphs: Vec<SourceParagraph>,
}

/// Document-level properties as stored by the source package.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    /// Comment or description
    pub description: Option<String>,
    /// Comma-separated keywords
    pub keywords: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// A reader that yields one [`SourceDocument`].
pub trait SourceAdapter {
    /// Reads the whole source.
    ///
    /// Fails with a structural error when the block structure cannot be read.
    /// Individual resources that cannot be read are skipped, not reported.
    fn read_source(&mut self) -> Result<SourceDocument>;
}

impl SourceAdapter for SourceDocument {
    fn read_source(&mut self) -> Result<SourceDocument> {
        Ok(self.clone())
    }
}
