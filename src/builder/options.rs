//! Options for document construction.

use serde::{Deserialize, Serialize};

/// Options for controlling how source blocks become chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// How chapter ids are derived.
    pub chapter_ids: ChapterIdStrategy,

    /// What to do with tables that appear before the first chapter heading.
    pub leading_tables: LeadingTablePolicy,
}

impl BuildOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers chapters `chapter-1`, `chapter-2`, ... regardless of title.
    pub fn sequential_ids(mut self) -> Self {
        self.chapter_ids = ChapterIdStrategy::Sequential;
        self
    }

    /// Derives chapter ids from titles.
    pub fn slug_ids(mut self) -> Self {
        self.chapter_ids = ChapterIdStrategy::Slug;
        self
    }

    /// Drops tables that appear before any chapter heading.
    pub fn drop_leading_tables(mut self) -> Self {
        self.leading_tables = LeadingTablePolicy::Drop;
        self
    }
}

/// How chapter ids are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterIdStrategy {
    /// Slugified title, `chapter-{n}` when the slug is empty, `-{n}` suffix on collision.
    #[default]
    Slug,
    /// `chapter-{n}` by position.
    Sequential,
}

/// What to do with tables before the first chapter heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadingTablePolicy {
    /// Open an untitled chapter for them, like leading paragraphs.
    #[default]
    ImplicitChapter,
    /// Drop them with a warning.
    Drop,
}
