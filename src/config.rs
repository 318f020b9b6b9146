//! Project configuration.
//!
//! A single YAML file (`typeset.yaml`) carries metadata overrides, style
//! mapping, build options and per-format rendering options. Every section
//! is optional; missing keys keep their defaults.

use crate::builder::{BuildOptions, StyleMapping};
use crate::error::{Error, Result};
use crate::model::Metadata;
use crate::render::{EpubConfig, PdfConfig};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// File names searched by [`find_config_file`], in order.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "typeset.yaml",
    "typeset.yml",
    ".typeset.yaml",
    ".typeset.yml",
];

/// Template written by `typeset init`.
pub const DEFAULT_CONFIG_YAML: &str = r#"# Typeset configuration
# Every key is optional; omitted keys keep their defaults.

metadata:
  title: "My Book Title"
  subtitle: null
  authors:
    - "Author Name"
  publisher: null
  publication_date: null
  isbn_print: null
  isbn_epub: null
  language: null        # set to override the manuscript's own language
  description: null
  keywords: []
  copyright: null

pdf:
  # Common sizes: "6in 9in" (trade paperback), "5.5in 8.5in" (digest), "5in 8in" (mass market)
  page_size: "6in 9in"
  margins:
    top: "0.75in"
    bottom: "0.75in"
    inside: "0.875in"   # gutter
    outside: "0.625in"
  bleed: "0.125in"      # null for no bleed
  crop_marks: true

  font_family: "Georgia, serif"
  font_size: "11pt"
  line_height: 1.5

  show_page_numbers: true
  page_number_position: "bottom-outside"  # or "bottom-center"
  show_running_headers: true

  include_title_page: true
  include_copyright_page: true
  include_toc: true

epub:
  version: "3.0"        # or "2.0" for older readers
  language: "en"
  split_chapters: true
  include_toc: true
  css_file: null        # extra stylesheet appended to the generated one
  font_size: "1em"
  cover_image: null
  identifier: null      # defaults to the EPUB ISBN, then the print ISBN
  identifier_fallback: "random"  # or "derived" for reproducible packages

# Map word-processor style names to semantic roles.
# A pattern matches when either string contains the other, ignoring case.
style_mapping:
  chapter_heading_styles:
    - "Heading 1"
    - "Title"
    - "Chapter"
  section_heading_styles:
    - "Heading 2"
    - "Heading 3"
    - "Heading 4"
  body_styles:
    - "Normal"
    - "Body Text"
    - "Body"
  blockquote_styles:
    - "Quote"
    - "Block Text"

build:
  chapter_ids: "slug"              # or "sequential"
  leading_tables: "implicit_chapter"  # or "drop"

output_dir: "./output"
"#;

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesetConfig {
    pub metadata: MetadataConfig,
    pub pdf: PdfConfig,
    pub epub: EpubConfig,
    pub style_mapping: StyleMapping,
    pub build: BuildOptions,
    pub output_dir: PathBuf,
}

impl Default for TypesetConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig::default(),
            pdf: PdfConfig::default(),
            epub: EpubConfig::default(),
            style_mapping: StyleMapping::default(),
            build: BuildOptions::default(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl TypesetConfig {
    /// Parses a YAML document. An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Checks values no layout engine could work with.
    pub fn validate(&self) -> Result<()> {
        if !self
            .style_mapping
            .chapter_heading_styles
            .iter()
            .any(|s| !s.trim().is_empty())
        {
            return Err(Error::Config(
                "style_mapping.chapter_heading_styles has no patterns".into(),
            ));
        }
        if self.pdf.page_size.trim().is_empty() {
            return Err(Error::Config("pdf.page_size is empty".into()));
        }
        if !(self.pdf.line_height.is_finite() && self.pdf.line_height > 0.0) {
            return Err(Error::Config(format!(
                "pdf.line_height must be positive, got {}",
                self.pdf.line_height
            )));
        }
        if self.pdf.font_size.trim().is_empty() || self.epub.font_size.trim().is_empty() {
            return Err(Error::Config("font_size is empty".into()));
        }
        Ok(())
    }

    /// Returns problems that do not stop a conversion, such as missing referenced files.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (key, path) in [
            ("epub.css_file", &self.epub.css_file),
            ("epub.cover_image", &self.epub.cover_image),
        ] {
            if let Some(path) = path {
                if !path.exists() {
                    warnings.push(format!("{} does not exist: {}", key, path.display()));
                }
            }
        }
        if self.metadata.authors.is_empty() {
            warnings.push("metadata.authors is empty".to_string());
        }
        warnings
    }
}

/// Metadata overrides. Unset fields keep what the source document provides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    pub isbn_print: Option<String>,
    pub isbn_epub: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub copyright: Option<String>,
}

impl MetadataConfig {
    /// Applies the set fields to `metadata`.
    ///
    /// A title of `Untitled` counts as unset, as do empty author and keyword lists.
    pub fn apply_to(&self, metadata: &mut Metadata) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        if let Some(title) = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "Untitled")
        {
            metadata.title = title.to_string();
        }
        if !self.authors.is_empty() {
            metadata.authors = self.authors.clone();
        }
        if let Some(language) = self.language.as_deref().filter(|l| !l.trim().is_empty()) {
            metadata.language = language.trim().to_string();
        }
        if !self.keywords.is_empty() {
            metadata.keywords = self.keywords.clone();
        }

        set(&mut metadata.subtitle, &self.subtitle);
        set(&mut metadata.publisher, &self.publisher);
        set(&mut metadata.publication_date, &self.publication_date);
        set(&mut metadata.isbn, &self.isbn);
        set(&mut metadata.isbn_print, &self.isbn_print);
        set(&mut metadata.isbn_epub, &self.isbn_epub);
        set(&mut metadata.description, &self.description);
        set(&mut metadata.copyright, &self.copyright);
    }
}

/// Loads a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<TypesetConfig> {
    let path = path.as_ref();
    let yaml = read_config(path)?;
    let config = TypesetConfig::from_yaml(&yaml)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Loads several configuration files, later files overriding earlier ones key by key.
pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<TypesetConfig> {
    let mut merged = Value::Null;
    for path in paths {
        let path = path.as_ref();
        let yaml = read_config(path)?;
        if yaml.trim().is_empty() {
            continue;
        }
        let layer: Value = serde_yaml::from_str(&yaml)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        merged = merge_yaml(merged, layer);
    }

    if merged.is_null() {
        return Ok(TypesetConfig::default());
    }
    Ok(serde_yaml::from_value(merged)?)
}

fn read_config(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Searches `start` and its parents for a configuration file.
pub fn find_config_file(start: impl AsRef<Path>) -> Option<PathBuf> {
    let start = start.as_ref();
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    start.ancestors().find_map(|dir| {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Deep-merges two YAML values. Mappings merge key by key; anything else is replaced.
pub fn merge_yaml(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

/// Writes [`DEFAULT_CONFIG_YAML`] to `path`, refusing to overwrite unless `force`.
pub fn write_default_config(path: impl AsRef<Path>, force: bool) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    std::fs::write(path, DEFAULT_CONFIG_YAML)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChapterIdStrategy;
    use crate::render::{EpubVersion, IdentifierFallback, PageNumberPosition};

    #[test]
    fn test_template_parses() {
        let config = TypesetConfig::from_yaml(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.metadata.title.as_deref(), Some("My Book Title"));
        assert_eq!(config.metadata.authors, vec!["Author Name"]);
        assert_eq!(config.pdf, PdfConfig::default());
        assert_eq!(config.epub.version, EpubVersion::V3);
        assert_eq!(config.style_mapping, StyleMapping::default());
        assert_eq!(config.build, BuildOptions::default());
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(TypesetConfig::from_yaml("").unwrap(), TypesetConfig::default());
        assert_eq!(
            TypesetConfig::from_yaml("# nothing\n").unwrap(),
            TypesetConfig::default()
        );
    }

    #[test]
    fn test_partial_yaml() {
        let config = TypesetConfig::from_yaml(
            "pdf:\n  page_size: A5\nbuild:\n  chapter_ids: sequential\n",
        )
        .unwrap();
        assert_eq!(config.pdf.page_size, "A5");
        assert_eq!(config.pdf.font_size, "11pt");
        assert_eq!(config.build.chapter_ids, ChapterIdStrategy::Sequential);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = TypesetConfig::from_yaml("pdf: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TypesetConfig::default();
        config.pdf.line_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = TypesetConfig::default();
        config.style_mapping.chapter_heading_styles = vec!["  ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings_for_missing_files() {
        let mut config = TypesetConfig::default();
        config.metadata.authors = vec!["A".into()];
        assert!(config.warnings().is_empty());
        config.epub.css_file = Some(PathBuf::from("/nonexistent/book.css"));
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn test_apply_overrides() {
        let mut metadata = Metadata {
            title: "From File".into(),
            authors: vec!["File Author".into()],
            ..Default::default()
        };
        let overrides = MetadataConfig {
            title: Some("Untitled".into()),
            authors: vec![],
            isbn_print: Some("978-1".into()),
            language: Some("fr".into()),
            ..Default::default()
        };
        overrides.apply_to(&mut metadata);
        assert_eq!(metadata.title, "From File");
        assert_eq!(metadata.authors, vec!["File Author"]);
        assert_eq!(metadata.isbn_print.as_deref(), Some("978-1"));
        assert_eq!(metadata.language, "fr");
    }

    #[test]
    fn test_template_keeps_source_language() {
        use crate::source::{SourceDocument, SourceParagraph};

        let config = TypesetConfig::from_yaml(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.metadata.language, None);

        let mut source = SourceDocument::new();
        source.properties.language = Some("de".into());
        source.push_paragraph(SourceParagraph::with_text("Heading 1", "Kapitel Eins"));
        source.push_paragraph(SourceParagraph::with_text("Normal", "Guten Tag."));

        let document = crate::build_source(&source, &config);
        assert_eq!(document.metadata.language, "de");
    }

    #[test]
    fn test_merge_yaml_deep() {
        let base: Value = serde_yaml::from_str("pdf:\n  page_size: A5\n  font_size: 10pt\n").unwrap();
        let overlay: Value = serde_yaml::from_str("pdf:\n  font_size: 12pt\nepub:\n  version: \"2.0\"\n").unwrap();
        let merged: TypesetConfig = serde_yaml::from_value(merge_yaml(base, overlay)).unwrap();
        assert_eq!(merged.pdf.page_size, "A5");
        assert_eq!(merged.pdf.font_size, "12pt");
        assert_eq!(merged.epub.version, EpubVersion::V2);
    }

    #[test]
    fn test_load_layered_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("chapters").join("drafts");
        std::fs::create_dir_all(&nested).unwrap();

        let base = dir.path().join("typeset.yaml");
        std::fs::write(&base, "pdf:\n  page_number_position: bottom-center\n").unwrap();
        let local = dir.path().join("local.yaml");
        std::fs::write(&local, "epub:\n  identifier_fallback: derived\n").unwrap();

        let config = load_layered(&[&base, &local]).unwrap();
        assert_eq!(config.pdf.page_number_position, PageNumberPosition::BottomCenter);
        assert_eq!(config.epub.identifier_fallback, IdentifierFallback::Derived);

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found.file_name().unwrap(), "typeset.yaml");
    }

    #[test]
    fn test_missing_file_and_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typeset.yaml");
        assert!(matches!(load_config(&path), Err(Error::Config(_))));

        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();
        assert!(load_config(&path).is_ok());
    }
}
