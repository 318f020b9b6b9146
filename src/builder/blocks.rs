//! Conversion of source paragraphs, runs and tables into IR nodes.

use super::classifier::StyleClassifier;
use super::BuildState;
use crate::detect::detect_image_format;
use crate::error::Error;
use crate::model::{ContainerKind, Image, Node};
use crate::source::{SourceParagraph, SourceRun, SourceTable};
use bytes::Bytes;
use std::collections::HashMap;

/// Read-only inputs shared by every block conversion of one build.
pub(crate) struct BlockContext<'a> {
    pub classifier: &'a StyleClassifier,
    pub resources: &'a HashMap<String, Bytes>,
}

impl BlockContext<'_> {
    /// Converts a body paragraph.
    ///
    /// Returns `None` when the paragraph yields no nodes at all.
    pub fn paragraph(&self, paragraph: &SourceParagraph, state: &mut BuildState) -> Option<Node> {
        if paragraph.is_empty() {
            return None;
        }

        let images = self.images(&paragraph.images, state);

        if paragraph.text().trim().is_empty() && !paragraph.has_footnote_refs() {
            return match images.len() {
                0 => None,
                1 => images.into_iter().next(),
                _ => Some(Node::paragraph(images)),
            };
        }

        let mut children = self.runs(&paragraph.runs, state);
        children.extend(images);
        if children.is_empty() {
            return None;
        }

        let kind = if self.classifier.is_blockquote(&paragraph.style) {
            ContainerKind::Blockquote
        } else {
            ContainerKind::Paragraph
        };
        Some(Node::container(kind, children))
    }

    /// Converts a section-heading paragraph.
    pub fn heading(
        &self,
        paragraph: &SourceParagraph,
        level: u8,
        state: &mut BuildState,
    ) -> Option<Node> {
        if paragraph.is_empty() {
            return None;
        }

        let mut children = self.runs(&paragraph.runs, state);
        children.extend(self.images(&paragraph.images, state));
        if children.is_empty() {
            return None;
        }
        Some(Node::heading(level, children))
    }

    /// Converts a table in row-major order. Empty cell paragraphs are dropped.
    pub fn table(&self, table: &SourceTable, state: &mut BuildState) -> Node {
        let rows = table
            .rows
            .iter()
            .map(|row| {
                let cells = row
                    .cells
                    .iter()
                    .map(|cell| {
                        let content = cell
                            .paragraphs
                            .iter()
                            .filter_map(|p| self.paragraph(p, state))
                            .collect();
                        Node::container(ContainerKind::TableCell, content)
                    })
                    .collect();
                Node::container(ContainerKind::TableRow, cells)
            })
            .collect();
        Node::container(ContainerKind::Table, rows)
    }

    /// Converts runs into inline nodes.
    ///
    /// Consecutive runs pointing at the same link share one `Link` node.
    pub fn runs(&self, runs: &[SourceRun], state: &mut BuildState) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();

        for run in runs {
            if !run.text.is_empty() {
                let node = formatted_text(run);
                let continues_link = matches!(
                    nodes.last(),
                    Some(Node::Link { url, .. }) if Some(url) == run.link.as_ref()
                );

                if continues_link {
                    if let Some(Node::Link { children, .. }) = nodes.last_mut() {
                        children.push(node);
                    }
                } else if let Some(url) = &run.link {
                    nodes.push(Node::link(url.clone(), vec![node]));
                } else {
                    nodes.push(node);
                }
            }

            if let Some(id) = &run.footnote {
                state.footnote_ordinal += 1;
                nodes.push(Node::FootnoteRef {
                    id: id.clone(),
                    ordinal: state.footnote_ordinal,
                });
            }
        }

        nodes
    }

    /// Resolves resource ids into image nodes, skipping missing resources.
    fn images(&self, ids: &[String], state: &mut BuildState) -> Vec<Node> {
        ids.iter()
            .filter_map(|id| self.image(id, state))
            .collect()
    }

    fn image(&self, id: &str, state: &mut BuildState) -> Option<Node> {
        let Some(data) = self.resources.get(id) else {
            let skipped = Error::ResourceExtraction {
                id: id.to_string(),
                message: "no such embedded resource".into(),
            };
            log::warn!("{}", skipped);
            return None;
        };

        let format = detect_image_format(data);
        state.image_count += 1;
        let filename = format!("image_{}.{}", state.image_count, format.extension());
        state.images.insert(filename.clone(), data.clone());

        Some(Node::Image(Image::new(
            data.clone(),
            format.mime_type(),
            filename,
        )))
    }
}

/// Wraps run text in its formatting containers.
///
/// Nesting order is fixed: emphasis innermost, then strong, strikethrough,
/// superscript and subscript outermost.
fn formatted_text(run: &SourceRun) -> Node {
    let layers = [
        (run.italic, ContainerKind::Emphasis),
        (run.bold, ContainerKind::Strong),
        (run.strike, ContainerKind::Strikethrough),
        (run.superscript, ContainerKind::Superscript),
        (run.subscript, ContainerKind::Subscript),
    ];

    layers
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(Node::text(run.text.clone()), |node, (_, kind)| {
            Node::wrap(kind, node)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(
        classifier: &'a StyleClassifier,
        resources: &'a HashMap<String, Bytes>,
    ) -> BlockContext<'a> {
        BlockContext {
            classifier,
            resources,
        }
    }

    #[test]
    fn test_strong_wraps_emphasis() {
        let node = formatted_text(&SourceRun::new("x").bold().italic());
        assert_eq!(
            node,
            Node::strong(vec![Node::emphasis(vec![Node::text("x")])])
        );
    }

    #[test]
    fn test_full_wrap_order() {
        let run = SourceRun::new("x")
            .subscript()
            .superscript()
            .strike()
            .bold()
            .italic();
        let expected = Node::wrap(
            ContainerKind::Subscript,
            Node::wrap(
                ContainerKind::Superscript,
                Node::wrap(
                    ContainerKind::Strikethrough,
                    Node::strong(vec![Node::emphasis(vec![Node::text("x")])]),
                ),
            ),
        );
        assert_eq!(formatted_text(&run), expected);
    }

    #[test]
    fn test_unformatted_run_is_bare_text() {
        assert_eq!(formatted_text(&SourceRun::new("plain")), Node::text("plain"));
    }

    #[test]
    fn test_empty_runs_skipped_and_links_grouped() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let runs = vec![
            SourceRun::new(""),
            SourceRun::new("click ").with_link("https://a.example"),
            SourceRun::new("here").bold().with_link("https://a.example"),
            SourceRun::new(" now"),
        ];
        let nodes = ctx.runs(&runs, &mut state);
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0],
            Node::link(
                "https://a.example",
                vec![Node::text("click "), Node::strong(vec![Node::text("here")])]
            )
        );
    }

    #[test]
    fn test_footnote_ordinals_are_sequential() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let runs = vec![
            SourceRun::new("a"),
            SourceRun::new("").with_footnote("7"),
            SourceRun::new("b").with_footnote("9"),
        ];
        let nodes = ctx.runs(&runs, &mut state);
        assert_eq!(
            nodes[1],
            Node::FootnoteRef {
                id: "7".into(),
                ordinal: 1
            }
        );
        assert_eq!(
            nodes[3],
            Node::FootnoteRef {
                id: "9".into(),
                ordinal: 2
            }
        );
    }

    #[test]
    fn test_image_only_paragraph_collapses() {
        let classifier = StyleClassifier::default();
        let mut resources = HashMap::new();
        resources.insert("rId1".to_string(), Bytes::from_static(b"\x89PNG\r\n"));
        resources.insert("rId2".to_string(), Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]));
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let single = SourceParagraph::new("Normal").with_image("rId1");
        let node = ctx.paragraph(&single, &mut state).unwrap();
        let Node::Image(image) = node else {
            panic!("expected bare image");
        };
        assert_eq!(image.filename, "image_1.png");

        let double = SourceParagraph::new("Normal")
            .with_image("rId1")
            .with_image("rId2");
        let node = ctx.paragraph(&double, &mut state).unwrap();
        assert_eq!(node.kind(), Some(ContainerKind::Paragraph));
        let Node::Image(second) = &node.children()[1] else {
            panic!("expected image");
        };
        assert_eq!(second.filename, "image_3.jpeg");
        assert_eq!(second.mime_type, "image/jpeg");
        assert_eq!(state.images.len(), 3);
    }

    #[test]
    fn test_footnote_only_paragraph_is_kept() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let paragraph = SourceParagraph::new("Normal")
            .with_run(SourceRun::new(" "))
            .with_run(SourceRun::new("").with_footnote("4"));
        assert!(!paragraph.is_empty());

        let node = ctx.paragraph(&paragraph, &mut state).unwrap();
        assert_eq!(node.kind(), Some(ContainerKind::Paragraph));
        assert_eq!(
            node.children()[1],
            Node::FootnoteRef {
                id: "4".into(),
                ordinal: 1
            }
        );
    }

    #[test]
    fn test_unrecognized_image_defaults_to_png() {
        let classifier = StyleClassifier::default();
        let mut resources = HashMap::new();
        resources.insert("rId1".to_string(), Bytes::from_static(&[0x00, 0x01]));
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let paragraph = SourceParagraph::with_text("Normal", "data").with_image("rId1");
        let node = ctx.paragraph(&paragraph, &mut state).unwrap();
        let Node::Image(image) = &node.children()[1] else {
            panic!("expected image after text");
        };
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.filename, "image_1.png");
    }

    #[test]
    fn test_missing_resource_skipped() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let image_only = SourceParagraph::new("Normal").with_image("rId404");
        assert_eq!(ctx.paragraph(&image_only, &mut state), None);

        let with_text = SourceParagraph::with_text("Normal", "caption").with_image("rId404");
        let node = ctx.paragraph(&with_text, &mut state).unwrap();
        assert_eq!(node.children().len(), 1);
        assert_eq!(state.image_count, 0);
    }

    #[test]
    fn test_blockquote_style_rechecked() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let quote = SourceParagraph::with_text("Intense Quote", "Wise words.");
        assert_eq!(
            ctx.paragraph(&quote, &mut state).unwrap().kind(),
            Some(ContainerKind::Blockquote)
        );
    }

    #[test]
    fn test_table_rows_and_empty_cells() {
        let classifier = StyleClassifier::default();
        let resources = HashMap::new();
        let ctx = context(&classifier, &resources);
        let mut state = BuildState::default();

        let table = SourceTable::from_text_rows(&[&["a", ""], &["c", "d"]]);
        let node = ctx.table(&table, &mut state);
        assert_eq!(node.kind(), Some(ContainerKind::Table));
        assert_eq!(node.children().len(), 2);
        let first_row = &node.children()[0];
        assert_eq!(first_row.children().len(), 2);
        assert!(first_row.children()[1].children().is_empty());
        assert_eq!(node.extract_text(), "acd");
    }
}
