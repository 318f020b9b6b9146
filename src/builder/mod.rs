//! Document construction from source blocks.
//!
//! The builder walks the block stream once, classifying each paragraph by
//! its style name. Chapter headings open chapters; everything else lands in
//! the chapter that is currently open.

mod blocks;
mod classifier;
mod options;

pub use classifier::{heading_level, StyleClassifier, StyleMapping, StyleRole, DEFAULT_SECTION_LEVEL};
pub use options::{BuildOptions, ChapterIdStrategy, LeadingTablePolicy};

use crate::config::MetadataConfig;
use crate::error::Result;
use crate::model::{Chapter, Document, Metadata, Node};
use crate::source::{DocumentProperties, SourceAdapter, SourceBlock, SourceDocument};
use blocks::BlockContext;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};

/// Accumulator threaded through one build.
///
/// Every counter starts from zero for each build, so repeated builds with
/// the same builder are independent.
#[derive(Debug, Default)]
pub(crate) struct BuildState {
    chapters: Vec<Chapter>,
    current: Option<Chapter>,
    chapter_count: usize,
    pub(crate) image_count: usize,
    pub(crate) footnote_ordinal: u32,
    used_ids: HashSet<String>,
    pub(crate) images: BTreeMap<String, Bytes>,
}

impl BuildState {
    fn close_chapter(&mut self) {
        if let Some(chapter) = self.current.take() {
            self.chapters.push(chapter);
        }
    }

    fn open_chapter(&mut self, title: String, level: u8, strategy: ChapterIdStrategy) {
        self.close_chapter();
        self.chapter_count += 1;
        let id = self.unique_id(&title, strategy);
        self.current = Some(Chapter::with_id(title, level, id));
    }

    fn unique_id(&mut self, title: &str, strategy: ChapterIdStrategy) -> String {
        let base = match strategy {
            ChapterIdStrategy::Slug => Chapter::slug_id(title, self.chapter_count),
            ChapterIdStrategy::Sequential => format!("chapter-{}", self.chapter_count),
        };

        let mut id = base.clone();
        let mut suffix = 2;
        while self.used_ids.contains(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        self.used_ids.insert(id.clone());
        id
    }

    fn push(&mut self, node: Node) {
        if let Some(chapter) = self.current.as_mut() {
            chapter.content.push(node);
        }
    }
}

/// Builds an immutable [`Document`] from a [`SourceDocument`].
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    classifier: StyleClassifier,
    options: BuildOptions,
    metadata_overrides: Option<MetadataConfig>,
}

impl DocumentBuilder {
    /// Creates a builder for the given style mapping.
    pub fn new(mapping: &StyleMapping) -> Self {
        Self {
            classifier: StyleClassifier::new(mapping),
            options: BuildOptions::default(),
            metadata_overrides: None,
        }
    }

    /// Sets the build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets metadata values that replace what the source declares.
    pub fn with_metadata(mut self, overrides: MetadataConfig) -> Self {
        self.metadata_overrides = Some(overrides);
        self
    }

    /// Returns the style classifier.
    pub fn classifier(&self) -> &StyleClassifier {
        &self.classifier
    }

    /// Reads a source through its adapter and builds the document.
    pub fn build_from<A: SourceAdapter + ?Sized>(&self, adapter: &mut A) -> Result<Document> {
        let source = adapter.read_source()?;
        Ok(self.build(&source))
    }

    /// Builds the document.
    ///
    /// Never fails: unknown styles are body text, missing resources are
    /// skipped with a warning and an empty source yields one empty chapter.
    pub fn build(&self, source: &SourceDocument) -> Document {
        let ctx = BlockContext {
            classifier: &self.classifier,
            resources: &source.resources,
        };
        let strategy = self.options.chapter_ids;
        let mut state = BuildState::default();

        for block in &source.blocks {
            match block {
                SourceBlock::Paragraph(paragraph) => {
                    let role = self.classifier.classify(&paragraph.style);

                    if let StyleRole::ChapterHeading { level } = role {
                        if paragraph.has_footnote_refs() {
                            log::warn!(
                                "Footnote reference in chapter heading '{}' is not kept",
                                paragraph.text().trim()
                            );
                        }
                        let title = paragraph.text().trim().to_string();
                        let title = if title.is_empty() {
                            format!("Chapter {}", state.chapter_count + 1)
                        } else {
                            title
                        };
                        state.open_chapter(title, level, strategy);
                        continue;
                    }

                    let node = match role {
                        StyleRole::SectionHeading { level } => ctx.heading(paragraph, level, &mut state),
                        _ => ctx.paragraph(paragraph, &mut state),
                    };
                    let Some(node) = node else {
                        continue;
                    };

                    if state.current.is_none() {
                        log::debug!("Opening implicit chapter for leading content");
                        state.open_chapter(String::new(), 1, strategy);
                    }
                    state.push(node);
                }
                SourceBlock::Table(table) => {
                    if state.current.is_none() {
                        match self.options.leading_tables {
                            LeadingTablePolicy::ImplicitChapter if !table.is_empty() => {
                                log::debug!("Opening implicit chapter for leading table");
                                state.open_chapter(String::new(), 1, strategy);
                            }
                            LeadingTablePolicy::ImplicitChapter => continue,
                            LeadingTablePolicy::Drop => {
                                log::warn!(
                                    "Dropping table with {} rows before the first chapter heading",
                                    table.rows.len()
                                );
                                continue;
                            }
                        }
                    }
                    let node = ctx.table(table, &mut state);
                    state.push(node);
                }
            }
        }
        state.close_chapter();

        if state.chapters.is_empty() {
            state.chapters.push(Chapter::with_id("", 1, "chapter-1"));
        }

        let mut footnotes = BTreeMap::new();
        for note in &source.footnotes {
            let children: Vec<Node> = note
                .paragraphs
                .iter()
                .filter_map(|p| ctx.paragraph(p, &mut state))
                .collect();
            footnotes.insert(
                note.id.clone(),
                Node::Footnote {
                    id: note.id.clone(),
                    children,
                },
            );
        }

        let mut metadata = metadata_from_properties(&source.properties, source.name.as_deref());
        if let Some(overrides) = &self.metadata_overrides {
            overrides.apply_to(&mut metadata);
        }

        log::info!(
            "Built {} chapters, {} images, {} footnotes",
            state.chapters.len(),
            state.images.len(),
            footnotes.len()
        );

        Document {
            metadata,
            front_matter: Vec::new(),
            chapters: state.chapters,
            back_matter: Vec::new(),
            footnotes,
            images: state.images,
        }
    }
}

/// Maps source properties onto publication metadata.
///
/// The title falls back to the source name, then to `Untitled`.
pub fn metadata_from_properties(properties: &DocumentProperties, name: Option<&str>) -> Metadata {
    fn non_empty(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    let defaults = Metadata::default();
    Metadata {
        title: non_empty(&properties.title)
            .or_else(|| name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string))
            .unwrap_or(defaults.title),
        authors: non_empty(&properties.author).into_iter().collect(),
        language: non_empty(&properties.language).unwrap_or(defaults.language),
        description: non_empty(&properties.description),
        keywords: properties
            .keywords
            .as_deref()
            .map(split_keywords)
            .unwrap_or_default(),
        publication_date: non_empty(&properties.created),
        modified_date: non_empty(&properties.modified),
        ..defaults
    }
}

/// Splits a comma-separated keyword list, dropping blanks.
pub fn split_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerKind;
    use crate::source::{SourceFootnote, SourceParagraph, SourceRun, SourceTable};

    fn source(paragraphs: &[(&str, &str)]) -> SourceDocument {
        let mut source = SourceDocument::new();
        for (style, text) in paragraphs {
            source.push_paragraph(SourceParagraph::with_text(*style, *text));
        }
        source
    }

    fn build(source: &SourceDocument) -> Document {
        DocumentBuilder::default().build(source)
    }

    #[test]
    fn test_single_chapter_scenario() {
        let doc = build(&source(&[
            ("Heading 1", "Chapter One"),
            ("Normal", "Hello world."),
            ("Normal", ""),
        ]));

        assert_eq!(doc.chapters.len(), 1);
        let chapter = &doc.chapters[0];
        assert_eq!(chapter.title, "Chapter One");
        assert_eq!(chapter.id, "chapter-one");
        assert_eq!(
            chapter.content,
            vec![Node::paragraph(vec![Node::text("Hello world.")])]
        );
    }

    #[test]
    fn test_leading_content_opens_implicit_chapter() {
        let doc = build(&source(&[("Normal", "Lead-in.")]));
        assert_eq!(doc.chapters.len(), 1);
        assert_eq!(doc.chapters[0].title, "");
        assert!(doc.chapters[0].is_untitled());
        assert_eq!(
            doc.chapters[0].content,
            vec![Node::paragraph(vec![Node::text("Lead-in.")])]
        );
    }

    #[test]
    fn test_leading_blank_paragraphs_open_nothing() {
        let doc = build(&source(&[("Normal", "  "), ("Heading 1", "Start")]));
        assert_eq!(doc.chapters.len(), 1);
        assert_eq!(doc.chapters[0].title, "Start");
    }

    #[test]
    fn test_zero_blocks_yield_one_chapter() {
        let doc = build(&SourceDocument::new());
        assert_eq!(doc.chapters.len(), 1);
        assert_eq!(doc.chapters[0].id, "chapter-1");
        assert!(doc.chapters[0].is_empty());
    }

    #[test]
    fn test_duplicate_titles_get_unique_ids() {
        let doc = build(&source(&[
            ("Heading 1", "Intro"),
            ("Normal", "a"),
            ("Heading 1", "Intro"),
            ("Normal", "b"),
        ]));
        let ids: Vec<&str> = doc.chapters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "intro-2"]);
    }

    #[test]
    fn test_sequential_ids() {
        let builder = DocumentBuilder::default().with_options(BuildOptions::new().sequential_ids());
        let doc = builder.build(&source(&[("Heading 1", "Intro"), ("Heading 1", "Intro")]));
        let ids: Vec<&str> = doc.chapters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["chapter-1", "chapter-2"]);
    }

    #[test]
    fn test_ids_unique_with_colliding_fallbacks() {
        let doc = build(&source(&[
            ("Normal", "lead"),
            ("Heading 1", "Chapter 1"),
            ("Heading 1", "!!!"),
        ]));
        let ids: HashSet<&str> = doc.chapters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), doc.chapters.len());
        assert_eq!(doc.chapters[0].id, "chapter-1");
        assert_eq!(doc.chapters[1].id, "chapter-1-2");
    }

    #[test]
    fn test_empty_chapter_heading_gets_numbered_title() {
        let doc = build(&source(&[("Heading 1", "First"), ("Heading 1", " ")]));
        assert_eq!(doc.chapters[1].title, "Chapter 2");
        assert_eq!(doc.chapters[1].id, "chapter-2");
    }

    #[test]
    fn test_chapter_level_from_style() {
        let mapping = StyleMapping {
            chapter_heading_styles: vec!["Part".into()],
            ..Default::default()
        };
        let doc = DocumentBuilder::new(&mapping).build(&source(&[("Part 3", "Third")]));
        assert_eq!(doc.chapters[0].level, 3);
    }

    #[test]
    fn test_section_headings_inside_chapter() {
        let doc = build(&source(&[
            ("Heading 1", "One"),
            ("Heading 3", "Sub"),
            ("Heading 2", ""),
            ("Quote", "Quoted."),
        ]));
        let content = &doc.chapters[0].content;
        assert_eq!(content.len(), 2);
        assert_eq!(content[0], Node::heading(3, vec![Node::text("Sub")]));
        assert_eq!(content[1].kind(), Some(ContainerKind::Blockquote));
    }

    #[test]
    fn test_leading_table_policies() {
        let mut src = SourceDocument::new();
        src.push_table(SourceTable::from_text_rows(&[&["x"]]));
        src.push_paragraph(SourceParagraph::with_text("Heading 1", "One"));

        let implicit = build(&src);
        assert_eq!(implicit.chapters.len(), 2);
        assert_eq!(implicit.chapters[0].content[0].kind(), Some(ContainerKind::Table));

        let dropped = DocumentBuilder::default()
            .with_options(BuildOptions::new().drop_leading_tables())
            .build(&src);
        assert_eq!(dropped.chapters.len(), 1);
        assert_eq!(dropped.chapters[0].title, "One");
    }

    #[test]
    fn test_table_appended_to_open_chapter() {
        let mut src = source(&[("Heading 1", "One")]);
        src.push_table(SourceTable::from_text_rows(&[&["a", "b"]]));
        let doc = build(&src);
        assert_eq!(doc.chapters[0].content.len(), 1);
        assert_eq!(doc.chapters[0].content[0].extract_text(), "ab");
    }

    #[test]
    fn test_footnotes_collected_by_id() {
        let mut src = SourceDocument::new();
        src.push_paragraph(
            SourceParagraph::new("Normal")
                .with_run(SourceRun::new("Claim"))
                .with_run(SourceRun::new("").with_footnote("1")),
        );
        src.footnotes.push(SourceFootnote {
            id: "1".into(),
            paragraphs: vec![SourceParagraph::with_text("Footnote Text", "Source.")],
        });

        let doc = build(&src);
        let para = &doc.chapters[0].content[0];
        assert_eq!(
            para.children()[1],
            Node::FootnoteRef {
                id: "1".into(),
                ordinal: 1
            }
        );
        let note = doc.footnote("1").unwrap();
        assert_eq!(note.extract_text(), "Source.");
    }

    #[test]
    fn test_repeated_builds_are_independent() {
        let mut src = SourceDocument::new();
        src.resources
            .insert("rId1".into(), Bytes::from_static(b"GIF89a"));
        src.push_paragraph(SourceParagraph::new("Normal").with_image("rId1"));

        let builder = DocumentBuilder::default();
        let first = builder.build(&src);
        let second = builder.build(&src);
        assert_eq!(first.chapters, second.chapters);
        assert!(second.images.contains_key("image_1.gif"));
    }

    #[test]
    fn test_metadata_from_properties() {
        let properties = DocumentProperties {
            title: Some("  ".into()),
            author: Some("Ann Author".into()),
            keywords: Some("one, two,, three ,".into()),
            ..Default::default()
        };
        let metadata = metadata_from_properties(&properties, Some("manuscript"));
        assert_eq!(metadata.title, "manuscript");
        assert_eq!(metadata.authors, vec!["Ann Author"]);
        assert_eq!(metadata.language, "en");
        assert_eq!(metadata.keywords, vec!["one", "two", "three"]);

        let untitled = metadata_from_properties(&DocumentProperties::default(), None);
        assert_eq!(untitled.title, "Untitled");
    }

    #[test]
    fn test_metadata_overrides_applied() {
        let mut src = source(&[("Normal", "x")]);
        src.properties.title = Some("From File".into());
        let overrides = MetadataConfig {
            title: Some("From Config".into()),
            publisher: Some("Small Press".into()),
            ..Default::default()
        };
        let doc = DocumentBuilder::default().with_metadata(overrides).build(&src);
        assert_eq!(doc.metadata.title, "From Config");
        assert_eq!(doc.metadata.publisher.as_deref(), Some("Small Press"));
    }
}
