//! ZIP container wrapper for DOCX packages.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Well-known part paths inside a word-processing package.
pub mod paths {
    pub const DOCUMENT_XML: &str = "word/document.xml";
    pub const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
    pub const STYLES_XML: &str = "word/styles.xml";
    pub const FOOTNOTES_XML: &str = "word/footnotes.xml";
    pub const FOOTNOTES_RELS: &str = "word/_rels/footnotes.xml.rels";
    pub const CORE_XML: &str = "docProps/core.xml";
    /// Directory that relationship targets of `word/*` parts are relative to
    pub const WORD_DIR: &str = "word";
}

/// ZIP container wrapper for DOCX files.
pub struct DocxContainer {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl DocxContainer {
    /// Opens a DOCX container from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Opens a DOCX container from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Opens a DOCX container from bytes.
    ///
    /// Data that is not a ZIP archive is a structural failure.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let cursor = Cursor::new(data);
        let archive = ZipArchive::new(cursor)
            .map_err(|e| Error::structural("package", format!("not a ZIP archive: {}", e)))?;
        Ok(Self { archive })
    }

    /// Verifies the package has a main document part.
    pub fn verify(&mut self) -> Result<()> {
        if self.file_exists(paths::DOCUMENT_XML) {
            Ok(())
        } else {
            Err(Error::structural(
                "package",
                format!("{} is missing", paths::DOCUMENT_XML),
            ))
        }
    }

    /// Reads a file from the archive as UTF-8 string.
    pub fn read_file(&mut self, path: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| Error::MissingComponent(path.to_string()))?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Reads an optional file; a missing part yields `None`.
    pub fn read_optional(&mut self, path: &str) -> Result<Option<String>> {
        if !self.file_exists(path) {
            return Ok(None);
        }
        self.read_file(path).map(Some)
    }

    /// Reads a binary file from the archive.
    pub fn read_binary(&mut self, path: &str) -> Result<Bytes> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| Error::MissingComponent(path.to_string()))?;

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Bytes::from(data))
    }

    /// Checks if a file exists in the archive.
    pub fn file_exists(&mut self, path: &str) -> bool {
        self.archive.by_name(path).is_ok()
    }

    /// Returns the number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Returns true if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }
}

/// Resolves a relationship target against the directory of its source part.
///
/// Absolute targets (leading `/`) are package-rooted; `..` segments walk up.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(rooted) = target.strip_prefix('/') {
        return rooted.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_target() {
        assert_eq!(resolve_target("word", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word", "./media/image1.png"), "word/media/image1.png");
    }

    #[test]
    fn test_resolve_parent_and_rooted_targets() {
        assert_eq!(resolve_target("word", "../media/cover.jpg"), "media/cover.jpg");
        assert_eq!(resolve_target("word", "/word/media/x.gif"), "word/media/x.gif");
    }

    #[test]
    fn test_non_zip_is_structural() {
        let err = DocxContainer::from_bytes(b"not a zip archive at all".to_vec())
            .err()
            .unwrap();
        assert!(err.is_structural());
    }

    #[test]
    fn test_missing_file_not_found() {
        let result = DocxContainer::open("/no/such/dir/book.docx");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
