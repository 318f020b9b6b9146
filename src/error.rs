//! Error types for typeset library.

use crate::render::OutputFormat;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for typeset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for typeset library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source document does not exist.
    #[error("Source document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file format is not recognized.
    #[error("Unknown file format")]
    UnknownFormat,

    /// The file format is recognized but not supported (e.g., legacy binary .doc).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source yielded a malformed or unreadable block structure.
    #[error("Malformed document structure in {context}: {message}")]
    StructuralParse { context: String, message: String },

    /// ZIP archive parsing error.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Required part of the source package is missing.
    #[error("Missing required component: {0}")]
    MissingComponent(String),

    /// A single embedded resource could not be read or typed.
    #[error("Resource {id} could not be extracted: {message}")]
    ResourceExtraction { id: String, message: String },

    /// Rendering or back-end hand-off failed for one output format.
    #[error("{format} rendering failed: {message}")]
    Render {
        format: OutputFormat,
        message: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Creates a structural parse error for the named source part.
    pub fn structural(context: impl Into<String>, message: impl ToString) -> Self {
        Error::StructuralParse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Creates a render error for one output format.
    pub fn render(format: OutputFormat, message: impl ToString) -> Self {
        Error::Render {
            format,
            message: message.to_string(),
        }
    }

    /// Returns true if this error means the source could not be turned into a document.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::StructuralParse { .. }
                | Error::ZipArchive(_)
                | Error::XmlParse(_)
                | Error::MissingComponent(_)
        )
    }

    /// Returns true if conversion may continue after this error.
    ///
    /// Only single-resource failures are recoverable; everything else aborts
    /// the conversion (or, for render errors, the one affected format).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ResourceExtraction { .. })
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(Error::structural("word/document.xml", "unexpected end").is_structural());
        assert!(Error::XmlParse("bad".into()).is_structural());
        assert!(!Error::NotFound(PathBuf::from("a.docx")).is_structural());
    }

    #[test]
    fn test_only_resource_errors_are_recoverable() {
        let skipped = Error::ResourceExtraction {
            id: "rId9".into(),
            message: "truncated".into(),
        };
        assert!(skipped.is_recoverable());
        assert!(!Error::render(OutputFormat::Epub, "disk full").is_recoverable());
    }

    #[test]
    fn test_render_error_names_format() {
        let err = Error::render(OutputFormat::Pdf, "engine exited with status 1");
        assert_eq!(
            err.to_string(),
            "PDF rendering failed: engine exited with status 1"
        );
    }
}
