//! DOCX (Office Open XML) source adapter.
//!
//! DOCX files are ZIP archives holding WordprocessingML parts. The adapter
//! reads the main document, style table, footnotes, relationships, image
//! parts and core properties, and yields a [`SourceDocument`].

mod body;
mod container;
mod parts;
mod styles;
mod xml;

pub use container::{resolve_target, DocxContainer};
pub use parts::{Relationship, Relationships};
pub use styles::StyleTable;

use crate::error::{Error, Result};
use crate::source::{SourceAdapter, SourceDocument};
use bytes::Bytes;
use container::paths;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

/// Resource-id prefix for images referenced from footnotes.
const FOOTNOTE_RESOURCE_PREFIX: &str = "footnotes:";

/// DOCX source adapter.
pub struct DocxAdapter {
    container: DocxContainer,
    name: Option<String>,
}

impl DocxAdapter {
    /// Opens a DOCX document from a file path.
    ///
    /// The file stem becomes the source name.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let container = DocxContainer::open(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        Ok(Self { container, name })
    }

    /// Opens a DOCX document from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let container = DocxContainer::from_reader(reader)?;
        Ok(Self {
            container,
            name: None,
        })
    }

    /// Opens a DOCX document from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let container = DocxContainer::from_bytes(data)?;
        Ok(Self {
            container,
            name: None,
        })
    }

    /// Sets the source name used as a title fallback.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn read_styles(&mut self) -> Result<StyleTable> {
        let Some(xml) = self.container.read_optional(paths::STYLES_XML)? else {
            return Ok(StyleTable::new());
        };
        Ok(styles::parse_styles(&xml).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable style table: {}", e);
            StyleTable::new()
        }))
    }

    fn read_relationships(&mut self, path: &str) -> Result<Relationships> {
        let Some(xml) = self.container.read_optional(path)? else {
            return Ok(Relationships::default());
        };
        parts::parse_relationships(&xml).map_err(|e| Error::structural(path, e))
    }

    fn read_properties(&mut self) -> Result<crate::source::DocumentProperties> {
        let Some(xml) = self.container.read_optional(paths::CORE_XML)? else {
            return Ok(Default::default());
        };
        Ok(parts::parse_core_properties(&xml).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable document properties: {}", e);
            Default::default()
        }))
    }

    /// Reads every image part of `rels` into `resources`.
    ///
    /// A part that cannot be read is logged and skipped.
    fn load_images(
        &mut self,
        rels: &Relationships,
        prefix: &str,
        resources: &mut HashMap<String, Bytes>,
    ) {
        for rel in rels.images() {
            let path = resolve_target(paths::WORD_DIR, &rel.target);
            let key = format!("{}{}", prefix, rel.id);
            match self.container.read_binary(&path) {
                Ok(data) => {
                    resources.insert(key, data);
                }
                Err(e) => {
                    let skipped = Error::ResourceExtraction {
                        id: key,
                        message: format!("{}: {}", path, e),
                    };
                    log::warn!("{}", skipped);
                }
            }
        }
    }
}

impl SourceAdapter for DocxAdapter {
    fn read_source(&mut self) -> Result<SourceDocument> {
        self.container.verify()?;

        let styles = self.read_styles()?;
        let rels = self.read_relationships(paths::DOCUMENT_RELS)?;
        let properties = self.read_properties()?;

        let document_xml = self.container.read_file(paths::DOCUMENT_XML)?;
        let blocks = body::parse_document(&document_xml, &styles, &rels)?;
        log::debug!("Read {} body blocks", blocks.len());

        let mut resources = HashMap::new();
        self.load_images(&rels, "", &mut resources);

        let mut footnotes = Vec::new();
        if let Some(notes_xml) = self.container.read_optional(paths::FOOTNOTES_XML)? {
            let note_rels = self.read_relationships(paths::FOOTNOTES_RELS)?;
            footnotes =
                body::parse_footnotes(&notes_xml, &styles, &note_rels, FOOTNOTE_RESOURCE_PREFIX)?;
            self.load_images(&note_rels, FOOTNOTE_RESOURCE_PREFIX, &mut resources);
        }

        Ok(SourceDocument {
            name: self.name.clone(),
            blocks,
            resources,
            properties,
            footnotes,
        })
    }
}

/// Reads a DOCX file into a source document.
pub fn read_docx(path: impl AsRef<Path>) -> Result<SourceDocument> {
    DocxAdapter::open(path)?.read_source()
}
