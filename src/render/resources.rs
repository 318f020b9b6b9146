//! Image resolution pass.
//!
//! Before markup is written, every image in the document is resolved to
//! something the target can address: a packaged file for EPUB, a data URI
//! for the print layout. The result is a side table keyed by the image's
//! position in the tree, so the shared [`Document`] is never touched.

use crate::detect::extension_for_mime;
use crate::model::{Document, Image, Node};
use base64::Engine;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Top-level node list a path is relative to.
///
/// Variants are ordered the way the document reads, so iterating a
/// [`ResourceMap`] follows document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    FrontMatter,
    Chapter(usize),
    BackMatter,
    /// Body of the footnote with this id
    Footnote(String),
}

/// Position of a node: its scope plus the child index at each depth.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath {
    pub scope: Scope,
    pub indices: Vec<usize>,
}

impl NodePath {
    /// Creates the path of a scope's node list itself.
    pub fn root(scope: Scope) -> Self {
        Self {
            scope,
            indices: Vec::new(),
        }
    }

    /// Returns the path of the child at `index`.
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.indices.push(index);
        path
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.indices.push(index);
    }

    pub(crate) fn pop(&mut self) {
        self.indices.pop();
    }
}

/// Every node list of a document with its scope, in document order.
pub(crate) fn document_scopes(document: &Document) -> Vec<(Scope, &[Node])> {
    let mut scopes: Vec<(Scope, &[Node])> = Vec::new();
    scopes.push((Scope::FrontMatter, &document.front_matter));
    for (index, chapter) in document.chapters.iter().enumerate() {
        scopes.push((Scope::Chapter(index), &chapter.content));
    }
    scopes.push((Scope::BackMatter, &document.back_matter));
    for (id, note) in &document.footnotes {
        scopes.push((Scope::Footnote(id.clone()), note_body(note)));
    }
    scopes
}

/// Children of a footnote body, or the node itself when it is not a `Footnote`.
pub(crate) fn note_body(note: &Node) -> &[Node] {
    match note {
        Node::Footnote { children, .. } => children,
        other => std::slice::from_ref(other),
    }
}

/// How resolved images are addressed from markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageNaming {
    /// Files `image_{n}.{ext}` under `dir`, relative to the content documents.
    Packaged { dir: String },
    /// Inline `data:` URIs.
    DataUri,
}

impl ImageNaming {
    /// Packaged files under `images/`.
    pub fn packaged() -> Self {
        ImageNaming::Packaged {
            dir: "images".to_string(),
        }
    }

    fn resolve(&self, image: &Image, ordinal: usize) -> ResolvedImage {
        let href = match self {
            ImageNaming::Packaged { dir } => format!(
                "{}/image_{}.{}",
                dir.trim_end_matches('/'),
                ordinal,
                extension_for_mime(&image.mime_type)
            ),
            ImageNaming::DataUri => format!(
                "data:{};base64,{}",
                image.mime_type,
                base64::engine::general_purpose::STANDARD.encode(&image.data)
            ),
        };

        ResolvedImage {
            href,
            media_type: image.mime_type.clone(),
            data: image.data.clone(),
        }
    }
}

/// A target-addressable image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    /// Value for the `src` attribute.
    pub href: String,
    pub media_type: String,
    /// Shared payload; cloning does not copy the bytes.
    pub data: Bytes,
}

/// Resolved images keyed by node position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMap {
    entries: BTreeMap<NodePath, ResolvedImage>,
}

impl ResourceMap {
    /// Looks up the image at `path`.
    pub fn get(&self, path: &NodePath) -> Option<&ResolvedImage> {
        self.entries.get(path)
    }

    /// Iterates resolved images in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodePath, &ResolvedImage)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves every image of a document.
///
/// Images are numbered in document order: front matter, chapters, back
/// matter, then footnote bodies by id.
pub fn resolve_images(document: &Document, naming: &ImageNaming) -> ResourceMap {
    let mut map = ResourceMap::default();
    let mut ordinal = 0;

    for (scope, nodes) in document_scopes(document) {
        let mut path = NodePath::root(scope);
        collect(nodes, &mut path, naming, &mut ordinal, &mut map);
    }

    log::debug!("Resolved {} image(s)", map.len());
    map
}

fn collect(
    nodes: &[Node],
    path: &mut NodePath,
    naming: &ImageNaming,
    ordinal: &mut usize,
    map: &mut ResourceMap,
) {
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        match node {
            Node::Image(image) => {
                *ordinal += 1;
                map.entries
                    .insert(path.clone(), naming.resolve(image, *ordinal));
            }
            _ => collect(node.children(), path, naming, ordinal, map),
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;

    fn png() -> Image {
        Image::new(Bytes::from_static(b"\x89PNG\r\n"), "image/png", "image_1.png")
    }

    fn sample() -> Document {
        let mut document = Document::new();
        let mut chapter = Chapter::new("One", 1, 1);
        chapter.content = vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::paragraph(vec![Node::Image(png()), Node::Image(png())]),
        ];
        document.chapters.push(chapter);
        document.footnotes.insert(
            "1".into(),
            Node::Footnote {
                id: "1".into(),
                children: vec![Node::Image(png())],
            },
        );
        document
    }

    #[test]
    fn test_packaged_paths_follow_document_order() {
        let map = resolve_images(&sample(), &ImageNaming::packaged());
        assert_eq!(map.len(), 3);

        let first = NodePath::root(Scope::Chapter(0)).child(1).child(0);
        let second = NodePath::root(Scope::Chapter(0)).child(1).child(1);
        assert_eq!(map.get(&first).unwrap().href, "images/image_1.png");
        assert_eq!(map.get(&second).unwrap().href, "images/image_2.png");

        let note = NodePath::root(Scope::Footnote("1".into())).child(0);
        assert_eq!(map.get(&note).unwrap().href, "images/image_3.png");
    }

    #[test]
    fn test_data_uri() {
        let map = resolve_images(&sample(), &ImageNaming::DataUri);
        let (_, image) = map.iter().next().unwrap();
        assert!(image.href.starts_with("data:image/png;base64,"));
        assert_eq!(image.media_type, "image/png");
    }

    #[test]
    fn test_payload_is_shared() {
        let document = sample();
        let map = resolve_images(&document, &ImageNaming::packaged());
        let Node::Image(original) = &document.chapters[0].content[1].children()[0] else {
            panic!("expected image");
        };
        let (_, resolved) = map.iter().next().unwrap();
        assert_eq!(resolved.data.as_ptr(), original.data.as_ptr());
    }

    #[test]
    fn test_scope_order() {
        assert!(Scope::FrontMatter < Scope::Chapter(0));
        assert!(Scope::Chapter(9) < Scope::BackMatter);
        assert!(Scope::BackMatter < Scope::Footnote("1".into()));
    }
}
