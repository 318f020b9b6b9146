//! Style table parsing for DOCX documents.
//!
//! Paragraphs reference styles by id (`Heading1`); classification works on
//! the human-readable name (`heading 1`), so the style table maps one to
//! the other.

use crate::error::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

use super::xml::{attr_value, local_name, local_name_end};

/// Name used when a paragraph has no style and the table declares no default.
pub const FALLBACK_STYLE: &str = "Normal";

/// Style id to style name table from `word/styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleTable {
    /// Creates an empty style table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a `pStyle` reference to a style name.
    ///
    /// Unknown ids resolve to themselves; a missing reference resolves to
    /// the default paragraph style.
    pub fn resolve(&self, style_id: Option<&str>) -> String {
        match style_id {
            Some(id) => self.names.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => self.default_name().to_string(),
        }
    }

    /// Returns the name of the default paragraph style.
    pub fn default_name(&self) -> &str {
        self.default_paragraph
            .as_ref()
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
            .unwrap_or(FALLBACK_STYLE)
    }

    /// Returns the number of known styles.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parses `word/styles.xml`.
pub fn parse_styles(xml: &str) -> Result<StyleTable> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut table = StyleTable::new();
    let mut buf = Vec::new();
    // (style id, is default paragraph style)
    let mut current: Option<(String, bool)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match local_name(&e).as_str() {
                "style" => {
                    let is_default = attr_value(&e, "type").as_deref() == Some("paragraph")
                        && matches!(attr_value(&e, "default").as_deref(), Some("1") | Some("true"));
                    current = attr_value(&e, "styleId").map(|id| (id, is_default));
                }
                "name" => {
                    if let (Some((id, is_default)), Some(name)) = (&current, attr_value(&e, "val")) {
                        if *is_default {
                            table.default_paragraph = Some(id.clone());
                        }
                        table.names.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Event::End(e) => {
                if local_name_end(&e) == "style" {
                    current = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(table)
}
