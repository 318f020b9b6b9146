//! Relationship and core-properties parts.

use crate::error::Result;
use crate::source::DocumentProperties;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

use super::xml::{attr_value, local_name};

const IMAGE_REL_SUFFIX: &str = "/image";
const HYPERLINK_REL_SUFFIX: &str = "/hyperlink";

/// A single package relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `TargetMode="External"` (hyperlinks to the web)
    pub external: bool,
}

impl Relationship {
    /// Returns true for embedded image relationships.
    pub fn is_image(&self) -> bool {
        !self.external && self.rel_type.ends_with(IMAGE_REL_SUFFIX)
    }

    /// Returns true for hyperlink relationships.
    pub fn is_hyperlink(&self) -> bool {
        self.rel_type.ends_with(HYPERLINK_REL_SUFFIX)
    }
}

/// Relationships of one source part, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: HashMap<String, Relationship>,
}

impl Relationships {
    /// Looks up a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.get(id)
    }

    /// Returns the target of a hyperlink relationship.
    pub fn hyperlink_target(&self, id: &str) -> Option<&str> {
        self.get(id)
            .filter(|rel| rel.is_hyperlink())
            .map(|rel| rel.target.as_str())
    }

    /// Iterates over image relationships in id order.
    pub fn images(&self) -> Vec<&Relationship> {
        let mut images: Vec<_> = self.entries.values().filter(|r| r.is_image()).collect();
        images.sort_by(|a, b| a.id.cmp(&b.id));
        images
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses a `*.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Relationships> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut relationships = Relationships::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == "Relationship" => {
                let id = attr_value(&e, "Id");
                let target = attr_value(&e, "Target");
                if let (Some(id), Some(target)) = (id, target) {
                    let rel_type = attr_value(&e, "Type").unwrap_or_default();
                    let external = attr_value(&e, "TargetMode")
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
                    relationships.entries.insert(
                        id.clone(),
                        Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        },
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Parses `docProps/core.xml` into document properties.
///
/// Elements are matched by local name, so the `dc:`/`cp:`/`dcterms:`
/// prefixes do not matter.
pub fn parse_core_properties(xml: &str) -> Result<DocumentProperties> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut properties = DocumentProperties::default();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => current = Some(local_name(&e)),
            Event::End(_) => current = None,
            Event::Text(t) => {
                let text = t.unescape()?.trim().to_string();
                let slot = match current.as_deref() {
                    Some("title") => Some(&mut properties.title),
                    Some("creator") => Some(&mut properties.author),
                    Some("language") => Some(&mut properties.language),
                    Some("description") => Some(&mut properties.description),
                    Some("keywords") => Some(&mut properties.keywords),
                    Some("created") => Some(&mut properties.created),
                    Some("modified") => Some(&mut properties.modified),
                    _ => None,
                };
                if let Some(slot) = slot.filter(|_| !text.is_empty()) {
                    *slot = Some(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(RELS).unwrap();
        assert_eq!(rels.len(), 3);

        let images = rels.images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].target, "media/image1.png");

        assert_eq!(rels.hyperlink_target("rId5"), Some("https://example.com/?a=1&b=2"));
        assert_eq!(rels.hyperlink_target("rId4"), None);
        assert!(rels.get("rId5").unwrap().external);
    }

    #[test]
    fn test_parse_core_properties() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
    xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>The Lighthouse</dc:title>
  <dc:creator>A. Writer</dc:creator>
  <dc:language>en-GB</dc:language>
  <dc:description>A short novel.</dc:description>
  <cp:keywords>sea, fiction , </cp:keywords>
  <dc:subject>ignored</dc:subject>
  <dcterms:created xsi:type="dcterms:W3CDTF">2024-03-01T10:00:00Z</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">2024-03-02T11:30:00Z</dcterms:modified>
</cp:coreProperties>"#;

        let props = parse_core_properties(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("The Lighthouse"));
        assert_eq!(props.author.as_deref(), Some("A. Writer"));
        assert_eq!(props.language.as_deref(), Some("en-GB"));
        assert_eq!(props.description.as_deref(), Some("A short novel."));
        assert_eq!(props.keywords.as_deref(), Some("sea, fiction ,"));
        assert_eq!(props.modified.as_deref(), Some("2024-03-02T11:30:00Z"));
    }

    #[test]
    fn test_empty_core_properties() {
        let props = parse_core_properties("<cp:coreProperties/>").unwrap();
        assert_eq!(props, DocumentProperties::default());
    }
}
