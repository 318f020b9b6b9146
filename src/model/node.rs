//! IR node definitions.

use bytes::Bytes;
use serde::Serialize;

/// Kinds of container nodes.
///
/// A container carries no payload beyond its children; the kind alone
/// decides the markup a renderer emits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Paragraph,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Blockquote,
    /// Ordered or unordered list; `start` is the first ordinal of an ordered list.
    List { ordered: bool, start: u32 },
    ListItem,
    Table,
    TableRow,
    TableCell,
    /// Inline code span
    Code,
    /// Preformatted code block
    CodeBlock,
    HorizontalRule,
    PageBreak,
    /// Structural grouping with no markup of its own.
    Group,
}

impl ContainerKind {
    /// Returns true for kinds that render as inline markup.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            ContainerKind::Emphasis
                | ContainerKind::Strong
                | ContainerKind::Strikethrough
                | ContainerKind::Superscript
                | ContainerKind::Subscript
                | ContainerKind::Code
        )
    }
}

/// An embedded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    /// Raw image bytes, shared rather than copied between passes
    #[serde(skip)]
    pub data: Bytes,
    /// MIME type (sniffed from the data)
    pub mime_type: String,
    /// Alternative text for accessibility
    pub alt_text: String,
    /// Optional caption rendered below the image
    pub caption: Option<String>,
    /// Width in pixels (optional)
    pub width: Option<u32>,
    /// Height in pixels (optional)
    pub height: Option<u32>,
    /// Document-unique filename, e.g. `image_3.jpeg`
    pub filename: String,
}

impl Image {
    /// Creates a new image node payload.
    pub fn new(data: Bytes, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            alt_text: String::new(),
            caption: None,
            width: None,
            height: None,
            filename: filename.into(),
        }
    }

    /// Sets the alternative text.
    pub fn with_alt_text(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = alt.into();
        self
    }

    /// Sets the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Sets the pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Returns the size of the image payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// A node in the document IR.
///
/// The tree is strictly owned: every node owns its children, so the graph
/// is finite and acyclic by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Leaf text
    Text(String),
    /// Structural or formatting container
    Container {
        kind: ContainerKind,
        children: Vec<Node>,
    },
    /// Heading with level 1-6
    Heading { level: u8, children: Vec<Node> },
    /// Embedded image
    Image(Image),
    /// Hyperlink wrapping its children
    Link {
        url: String,
        title: Option<String>,
        children: Vec<Node>,
    },
    /// Footnote body
    Footnote { id: String, children: Vec<Node> },
    /// In-text reference to a footnote body
    FootnoteRef { id: String, ordinal: u32 },
}

impl Node {
    /// Creates a text leaf.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Creates a container of the given kind.
    pub fn container(kind: ContainerKind, children: Vec<Node>) -> Self {
        Node::Container { kind, children }
    }

    /// Wraps a single node in a container of the given kind.
    pub fn wrap(kind: ContainerKind, child: Node) -> Self {
        Node::Container {
            kind,
            children: vec![child],
        }
    }

    /// Creates a paragraph.
    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::container(ContainerKind::Paragraph, children)
    }

    /// Creates a heading, clamping the level to 1-6.
    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Node::Heading {
            level: level.clamp(1, 6),
            children,
        }
    }

    /// Creates a strong (bold) span.
    pub fn strong(children: Vec<Node>) -> Self {
        Self::container(ContainerKind::Strong, children)
    }

    /// Creates an emphasis (italic) span.
    pub fn emphasis(children: Vec<Node>) -> Self {
        Self::container(ContainerKind::Emphasis, children)
    }

    /// Creates a hyperlink.
    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Link {
            url: url.into(),
            title: None,
            children,
        }
    }

    /// Returns the children of this node (empty for leaves).
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Container { children, .. }
            | Node::Heading { children, .. }
            | Node::Link { children, .. }
            | Node::Footnote { children, .. } => children,
            Node::Text(_) | Node::Image(_) | Node::FootnoteRef { .. } => &[],
        }
    }

    /// Returns the container kind, if this is a container.
    pub fn kind(&self) -> Option<ContainerKind> {
        match self {
            Node::Container { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the concatenated leaf text of this subtree.
    ///
    /// Depth-first, left-to-right, with no separators inserted.
    pub fn extract_text(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visits every image in this subtree in document order.
    pub fn for_each_image<'a>(&'a self, f: &mut impl FnMut(&'a Image)) {
        match self {
            Node::Image(image) => f(image),
            _ => {
                for child in self.children() {
                    child.for_each_image(f);
                }
            }
        }
    }
}
