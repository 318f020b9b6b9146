//! Body and footnote parsing for DOCX documents.

use crate::error::{Error, Result};
use crate::source::{
    SourceBlock, SourceCell, SourceFootnote, SourceParagraph, SourceRow, SourceRun, SourceTable,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use unicode_normalization::UnicodeNormalization;

use super::parts::Relationships;
use super::styles::StyleTable;
use super::xml::{attr_value, local_name, local_name_end, skip_element, toggle_on};

/// Footnote types that hold separator lines rather than notes.
const SEPARATOR_TYPES: &[&str] = &["separator", "continuationSeparator", "continuationNotice"];

/// Parses the block stream of `word/document.xml`.
pub fn parse_document(
    xml: &str,
    styles: &StyleTable,
    rels: &Relationships,
) -> Result<Vec<SourceBlock>> {
    let mut parser = BodyParser::new(xml, "word/document.xml", styles, rels, "");
    parser.parse_blocks()
}

/// Parses the note bodies of `word/footnotes.xml`.
///
/// Image references inside notes are prefixed with `resource_prefix` so they
/// cannot collide with relationship ids of the main document.
pub fn parse_footnotes(
    xml: &str,
    styles: &StyleTable,
    rels: &Relationships,
    resource_prefix: &str,
) -> Result<Vec<SourceFootnote>> {
    let mut parser = BodyParser::new(xml, "word/footnotes.xml", styles, rels, resource_prefix);
    parser.parse_footnotes()
}

/// Body parser state machine.
struct BodyParser<'a> {
    reader: Reader<&'a [u8]>,
    part: &'static str,
    styles: &'a StyleTable,
    rels: &'a Relationships,
    resource_prefix: &'a str,
}

impl<'a> BodyParser<'a> {
    fn new(
        xml: &'a str,
        part: &'static str,
        styles: &'a StyleTable,
        rels: &'a Relationships,
        resource_prefix: &'a str,
    ) -> Self {
        let mut reader = Reader::from_str(xml);
        // w:t content is whitespace-significant
        reader.config_mut().trim_text(false);

        Self {
            reader,
            part,
            styles,
            rels,
            resource_prefix,
        }
    }

    fn next<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>> {
        self.reader
            .read_event_into(buf)
            .map_err(|e| Error::structural(self.part, e))
    }

    fn skip(&mut self) -> Result<()> {
        skip_element(&mut self.reader).map_err(|e| Error::structural(self.part, e))
    }

    fn parse_blocks(&mut self) -> Result<Vec<SourceBlock>> {
        let mut blocks = Vec::new();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "p" => blocks.push(SourceBlock::Paragraph(self.parse_paragraph()?)),
                    "tbl" => blocks.push(SourceBlock::Table(self.parse_table()?)),
                    "sectPr" => self.skip()?,
                    _ => {}
                },
                Event::Empty(e) => {
                    if local_name(&e) == "p" {
                        blocks.push(SourceBlock::Paragraph(self.empty_paragraph()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(blocks)
    }

    fn parse_footnotes(&mut self) -> Result<Vec<SourceFootnote>> {
        let mut footnotes = Vec::new();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) if local_name(&e) == "footnote" => {
                    let id = attr_value(&e, "id");
                    let note_type = attr_value(&e, "type");
                    let is_separator = note_type
                        .as_deref()
                        .is_some_and(|t| SEPARATOR_TYPES.contains(&t))
                        || matches!(id.as_deref(), Some("-1") | Some("0"));

                    match id {
                        Some(id) if !is_separator => {
                            let paragraphs = self.parse_note_body()?;
                            footnotes.push(SourceFootnote { id, paragraphs });
                        }
                        _ => self.skip()?,
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(footnotes)
    }

    /// Parses the paragraphs of one `<w:footnote>`, flattening tables.
    fn parse_note_body(&mut self) -> Result<Vec<SourceParagraph>> {
        let mut paragraphs = Vec::new();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "p" => paragraphs.push(self.parse_paragraph()?),
                    "tbl" => paragraphs.extend(flatten_table(self.parse_table()?)),
                    _ => {}
                },
                Event::End(e) => {
                    if local_name_end(&e) == "footnote" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(paragraphs)
    }

    fn empty_paragraph(&self) -> SourceParagraph {
        SourceParagraph::new(self.styles.resolve(None))
    }

    /// Parses a `<w:p>` paragraph element.
    fn parse_paragraph(&mut self) -> Result<SourceParagraph> {
        let mut style_id: Option<String> = None;
        let mut paragraph = SourceParagraph::default();
        let mut link: Option<String> = None;
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "pPr" => style_id = self.parse_paragraph_properties()?,
                    "r" => {
                        let run = self.parse_run(link.clone(), &mut paragraph.images)?;
                        if !run.text.is_empty() || run.footnote.is_some() {
                            paragraph.runs.push(run);
                        }
                    }
                    "hyperlink" => link = self.hyperlink_target(&e),
                    // text boxes hold paragraphs of their own
                    "txbxContent" | "Fallback" => self.skip()?,
                    _ => {}
                },
                Event::End(e) => match local_name_end(&e).as_str() {
                    "p" => break,
                    "hyperlink" => link = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        paragraph.style = self.styles.resolve(style_id.as_deref());
        Ok(paragraph)
    }

    /// Parses `<w:pPr>`, returning the referenced style id.
    fn parse_paragraph_properties(&mut self) -> Result<Option<String>> {
        let mut style_id = None;
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "pStyle" => style_id = attr_value(&e, "val"),
                    // paragraph-mark run properties and revisions
                    "rPr" | "pPrChange" => self.skip()?,
                    _ => {}
                },
                Event::Empty(e) => {
                    if local_name(&e) == "pStyle" {
                        style_id = attr_value(&e, "val");
                    }
                }
                Event::End(e) => {
                    if local_name_end(&e) == "pPr" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(style_id)
    }

    fn hyperlink_target(&self, e: &BytesStart) -> Option<String> {
        if let Some(target) = attr_value(e, "id").and_then(|id| {
            self.rels.hyperlink_target(&id).map(str::to_string)
        }) {
            return Some(target);
        }
        attr_value(e, "anchor").map(|anchor| format!("#{}", anchor))
    }

    /// Parses a `<w:r>` run, collecting embedded image references.
    fn parse_run(&mut self, link: Option<String>, images: &mut Vec<String>) -> Result<SourceRun> {
        let mut run = SourceRun {
            link,
            ..Default::default()
        };
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    match name.as_str() {
                        "rPr" => self.parse_run_properties(&mut run)?,
                        "t" => self.read_text(&mut run.text)?,
                        // DrawingML content is repeated as VML fallback
                        "Fallback" => self.skip()?,
                        _ => self.inline_marker(&name, &e, &mut run, images),
                    }
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    self.inline_marker(&name, &e, &mut run, images);
                }
                Event::End(e) => {
                    if local_name_end(&e) == "r" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        run.text = run.text.nfc().collect();
        Ok(run)
    }

    /// Handles run children that carry no text element of their own.
    fn inline_marker(
        &self,
        name: &str,
        e: &BytesStart,
        run: &mut SourceRun,
        images: &mut Vec<String>,
    ) {
        match name {
            "tab" => run.text.push('\t'),
            "br" | "cr" => run.text.push('\n'),
            "footnoteReference" => run.footnote = attr_value(e, "id"),
            "blip" => {
                if let Some(id) = attr_value(e, "embed") {
                    images.push(format!("{}{}", self.resource_prefix, id));
                }
            }
            "imagedata" => {
                if let Some(id) = attr_value(e, "id") {
                    images.push(format!("{}{}", self.resource_prefix, id));
                }
            }
            _ => {}
        }
    }

    /// Parses `<w:rPr>` formatting flags into the run.
    fn parse_run_properties(&mut self, run: &mut SourceRun) -> Result<()> {
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match local_name(&e).as_str() {
                    "b" => run.bold = toggle_on(&e),
                    "i" => run.italic = toggle_on(&e),
                    "strike" | "dstrike" => run.strike |= toggle_on(&e),
                    "vertAlign" => match attr_value(&e, "val").as_deref() {
                        Some("superscript") => run.superscript = true,
                        Some("subscript") => run.subscript = true,
                        _ => {}
                    },
                    "rPrChange" => self.skip()?,
                    _ => {}
                },
                Event::End(e) => {
                    if local_name_end(&e) == "rPr" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Reads the text of a `<w:t>` element.
    fn read_text(&mut self, out: &mut String) -> Result<()> {
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| Error::structural(self.part, e))?;
                    out.push_str(&text);
                }
                Event::CData(t) => out.push_str(&String::from_utf8_lossy(&t)),
                Event::End(_) | Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Parses a `<w:tbl>` table element.
    fn parse_table(&mut self) -> Result<SourceTable> {
        let mut table = SourceTable::default();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "tr" => table.rows.push(self.parse_table_row()?),
                    "tblPr" | "tblGrid" => self.skip()?,
                    _ => {}
                },
                Event::End(e) => {
                    if local_name_end(&e) == "tbl" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    /// Parses a `<w:tr>` table row element.
    fn parse_table_row(&mut self) -> Result<SourceRow> {
        let mut row = SourceRow::default();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "tc" => row.cells.push(self.parse_table_cell()?),
                    "trPr" | "tblPrEx" => self.skip()?,
                    _ => {}
                },
                Event::End(e) => {
                    if local_name_end(&e) == "tr" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(row)
    }

    /// Parses a `<w:tc>` table cell element. Nested tables are flattened.
    fn parse_table_cell(&mut self) -> Result<SourceCell> {
        let mut cell = SourceCell::default();
        let mut buf = Vec::new();

        loop {
            match self.next(&mut buf)? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "p" => cell.paragraphs.push(self.parse_paragraph()?),
                    "tbl" => {
                        let nested = self.parse_table()?;
                        cell.paragraphs.extend(flatten_table(nested));
                    }
                    "tcPr" => self.skip()?,
                    _ => {}
                },
                Event::End(e) => {
                    if local_name_end(&e) == "tc" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(cell)
    }
}

/// Collects the paragraphs of a table in row-major order.
fn flatten_table(table: SourceTable) -> impl Iterator<Item = SourceParagraph> {
    table
        .rows
        .into_iter()
        .flat_map(|row| row.cells.into_iter())
        .flat_map(|cell| cell.paragraphs.into_iter())
}
