//! Shared tree walk from IR nodes to (X)HTML markup.
//!
//! Both renderers emit the same construct for every node kind; they differ
//! only in how images are addressed, how footnotes are presented and which
//! markup dialect is allowed. Those points are supplied by [`FormatHooks`].

use super::resources::{note_body, NodePath, Scope};
use crate::model::{ContainerKind, Image, Node};
use std::collections::{BTreeMap, HashSet};

/// How footnote references are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootnoteMode {
    /// Reference links to a note body written at the end of the unit.
    Linked,
    /// Note body is written in place for the layout engine to float.
    Inline,
}

/// Markup vocabulary available to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupDialect {
    /// HTML5 elements, no EPUB attributes.
    Html5,
    /// HTML5 elements with `epub:type` semantics.
    Epub3,
    /// XHTML 1.1 only: `div` stand-ins for `figure` and `aside`.
    Xhtml11,
}

impl MarkupDialect {
    fn has_html5_elements(&self) -> bool {
        !matches!(self, MarkupDialect::Xhtml11)
    }
}

/// Format-specific decisions of the tree walk.
pub trait FormatHooks {
    /// Returns the `src` of the image at `path`, or `None` to leave it out.
    fn image_src(&self, path: &NodePath, image: &Image) -> Option<String>;

    fn footnote_mode(&self) -> FootnoteMode;

    fn dialect(&self) -> MarkupDialect {
        MarkupDialect::Html5
    }
}

/// Writes markup for node sequences.
///
/// A writer tracks the footnotes it has presented, so one writer should be
/// used per unit of output (a chapter file, or a whole print document).
pub struct MarkupWriter<'a, H: FormatHooks> {
    hooks: &'a H,
    footnotes: &'a BTreeMap<String, Node>,
    path: NodePath,
    pending_notes: Vec<String>,
    presented_notes: HashSet<String>,
    /// Number of enclosing phrasing elements
    inline_depth: usize,
}

impl<'a, H: FormatHooks> MarkupWriter<'a, H> {
    /// Creates a writer resolving footnote references against `footnotes`.
    pub fn new(hooks: &'a H, footnotes: &'a BTreeMap<String, Node>) -> Self {
        Self {
            hooks,
            footnotes,
            path: NodePath::root(Scope::FrontMatter),
            pending_notes: Vec::new(),
            presented_notes: HashSet::new(),
            inline_depth: 0,
        }
    }

    /// Writes a top-level node list, one node per line.
    pub fn write_nodes(&mut self, scope: Scope, nodes: &[Node], output: &mut String) {
        self.path = NodePath::root(scope);
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                output.push('\n');
            }
            self.path.push(index);
            self.write_node(node, output);
            self.path.pop();
        }
    }

    /// Writes the bodies of linked footnotes referenced since the last call.
    pub fn write_notes(&mut self, output: &mut String) {
        let footnotes = self.footnotes;
        for id in std::mem::take(&mut self.pending_notes) {
            let Some(note) = footnotes.get(&id) else {
                continue;
            };
            let saved = std::mem::replace(&mut self.path, NodePath::root(Scope::Footnote(id.clone())));
            output.push('\n');
            self.write_note_block(&id, note_body(note), output);
            self.path = saved;
        }
    }

    /// Returns true if linked footnote bodies are waiting to be written.
    pub fn has_pending_notes(&self) -> bool {
        !self.pending_notes.is_empty()
    }

    fn write_children(&mut self, nodes: &[Node], output: &mut String) {
        for (index, node) in nodes.iter().enumerate() {
            self.path.push(index);
            self.write_node(node, output);
            self.path.pop();
        }
    }

    /// Writes children that sit in phrasing content.
    fn write_inline_children(&mut self, nodes: &[Node], output: &mut String) {
        self.inline_depth += 1;
        self.write_children(nodes, output);
        self.inline_depth -= 1;
    }

    fn write_node(&mut self, node: &Node, output: &mut String) {
        match node {
            Node::Text(text) => output.push_str(&escape_text(text)),
            Node::Container { kind, children } => self.write_container(*kind, children, output),
            Node::Heading { level, children } => {
                let level = (*level).clamp(1, 6);
                output.push_str(&format!("<h{}>", level));
                self.write_inline_children(children, output);
                output.push_str(&format!("</h{}>", level));
            }
            Node::Image(image) => self.write_image(image, output),
            Node::Link {
                url,
                title,
                children,
            } => {
                output.push_str(&format!("<a href=\"{}\"", escape_xml(url)));
                if let Some(title) = title {
                    output.push_str(&format!(" title=\"{}\"", escape_xml(title)));
                }
                output.push('>');
                self.write_inline_children(children, output);
                output.push_str("</a>");
            }
            Node::Footnote { id, children } => match self.hooks.footnote_mode() {
                FootnoteMode::Linked => self.write_note_block(id, children, output),
                FootnoteMode::Inline => self.write_note_inline(children, output),
            },
            Node::FootnoteRef { id, ordinal } => self.write_note_ref(id, *ordinal, output),
        }
    }

    fn write_container(&mut self, kind: ContainerKind, children: &[Node], output: &mut String) {
        let (open, close) = match kind {
            ContainerKind::Paragraph => ("<p>".to_string(), "</p>"),
            ContainerKind::Emphasis => ("<em>".to_string(), "</em>"),
            ContainerKind::Strong => ("<strong>".to_string(), "</strong>"),
            ContainerKind::Strikethrough => ("<del>".to_string(), "</del>"),
            ContainerKind::Superscript => ("<sup>".to_string(), "</sup>"),
            ContainerKind::Subscript => ("<sub>".to_string(), "</sub>"),
            ContainerKind::Blockquote => ("<blockquote>".to_string(), "</blockquote>"),
            ContainerKind::List { ordered: false, .. } => ("<ul>".to_string(), "</ul>"),
            ContainerKind::List {
                ordered: true,
                start,
            } => {
                let open = if start == 1 {
                    "<ol>".to_string()
                } else {
                    format!("<ol start=\"{}\">", start)
                };
                (open, "</ol>")
            }
            ContainerKind::ListItem => ("<li>".to_string(), "</li>"),
            ContainerKind::Table => ("<table>".to_string(), "</table>"),
            ContainerKind::TableRow => ("<tr>".to_string(), "</tr>"),
            ContainerKind::TableCell => ("<td>".to_string(), "</td>"),
            ContainerKind::Code => ("<code>".to_string(), "</code>"),
            ContainerKind::CodeBlock => ("<pre><code>".to_string(), "</code></pre>"),
            ContainerKind::HorizontalRule => {
                output.push_str("<hr/>");
                return;
            }
            ContainerKind::PageBreak => {
                output.push_str("<div class=\"page-break\"></div>");
                return;
            }
            ContainerKind::Group => (String::new(), ""),
        };

        output.push_str(&open);
        if kind.is_inline() || kind == ContainerKind::Paragraph {
            self.write_inline_children(children, output);
        } else {
            self.write_children(children, output);
        }
        output.push_str(close);
    }

    fn write_image(&mut self, image: &Image, output: &mut String) {
        let Some(src) = self.hooks.image_src(&self.path, image) else {
            log::debug!("No resource for image {}; left out", image.filename);
            return;
        };

        // phrasing parents cannot hold figure or div
        if self.inline_depth > 0 {
            output.push_str("<span class=\"figure\">");
            self.write_img(&src, image, output);
            if let Some(caption) = &image.caption {
                output.push_str(&format!(
                    "<span class=\"caption\">{}</span>",
                    escape_text(caption)
                ));
            }
            output.push_str("</span>");
            return;
        }

        let html5 = self.hooks.dialect().has_html5_elements();
        output.push_str(if html5 {
            "<figure>"
        } else {
            "<div class=\"figure\">"
        });
        self.write_img(&src, image, output);

        if let Some(caption) = &image.caption {
            if html5 {
                output.push_str(&format!("<figcaption>{}</figcaption>", escape_text(caption)));
            } else {
                output.push_str(&format!(
                    "<p class=\"caption\">{}</p>",
                    escape_text(caption)
                ));
            }
        }
        output.push_str(if html5 { "</figure>" } else { "</div>" });
    }

    fn write_img(&self, src: &str, image: &Image, output: &mut String) {
        output.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_xml(src),
            escape_xml(&image.alt_text)
        ));
        if let Some(width) = image.width {
            output.push_str(&format!(" width=\"{}\"", width));
        }
        if let Some(height) = image.height {
            output.push_str(&format!(" height=\"{}\"", height));
        }
        output.push_str("/>");
    }

    fn write_note_ref(&mut self, id: &str, ordinal: u32, output: &mut String) {
        let footnotes = self.footnotes;
        let Some(note) = footnotes.get(id) else {
            log::warn!(
                "Footnote reference {} points at missing footnote '{}'",
                ordinal,
                id
            );
            output.push_str(&format!(
                "<sup class=\"footnote-ref unresolved\">{}</sup>",
                ordinal
            ));
            return;
        };

        match self.hooks.footnote_mode() {
            FootnoteMode::Linked => {
                let noteref = if self.hooks.dialect() == MarkupDialect::Epub3 {
                    " epub:type=\"noteref\""
                } else {
                    ""
                };
                output.push_str(&format!(
                    "<sup><a class=\"footnote-ref\"{} href=\"#{}\" id=\"fnref-{}\">{}</a></sup>",
                    noteref,
                    note_anchor(id),
                    ordinal,
                    ordinal
                ));
                if self.presented_notes.insert(id.to_string()) {
                    self.pending_notes.push(id.to_string());
                }
            }
            FootnoteMode::Inline => {
                if !self.presented_notes.insert(id.to_string()) {
                    output.push_str(&format!("<sup class=\"footnote-ref\">{}</sup>", ordinal));
                    return;
                }
                let saved =
                    std::mem::replace(&mut self.path, NodePath::root(Scope::Footnote(id.to_string())));
                self.write_note_inline(note_body(note), output);
                self.path = saved;
            }
        }
    }

    /// Note body as a block, target of linked references.
    fn write_note_block(&mut self, id: &str, body: &[Node], output: &mut String) {
        match self.hooks.dialect() {
            MarkupDialect::Epub3 => output.push_str(&format!(
                "<aside class=\"footnote\" epub:type=\"footnote\" id=\"{}\">",
                note_anchor(id)
            )),
            MarkupDialect::Html5 => output.push_str(&format!(
                "<aside class=\"footnote\" id=\"{}\">",
                note_anchor(id)
            )),
            MarkupDialect::Xhtml11 => output.push_str(&format!(
                "<div class=\"footnote\" id=\"{}\">",
                note_anchor(id)
            )),
        }
        self.write_children(body, output);
        output.push_str(if self.hooks.dialect().has_html5_elements() {
            "</aside>"
        } else {
            "</div>"
        });
    }

    /// Note body as an inline span; paragraph wrappers are flattened.
    fn write_note_inline(&mut self, body: &[Node], output: &mut String) {
        output.push_str("<span class=\"footnote\">");
        self.inline_depth += 1;
        for (index, node) in body.iter().enumerate() {
            if index > 0 {
                output.push(' ');
            }
            self.path.push(index);
            match node {
                Node::Container {
                    kind: ContainerKind::Paragraph,
                    children,
                } => self.write_children(children, output),
                other => self.write_node(other, output),
            }
            self.path.pop();
        }
        self.inline_depth -= 1;
        output.push_str("</span>");
    }
}

/// Anchor id of a footnote body.
pub fn note_anchor(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("fn-{}", safe)
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Escape text content; line breaks become `<br/>`.
fn escape_text(s: &str) -> String {
    escape_xml(s).replace('\n', "<br/>")
}
