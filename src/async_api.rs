//! Async API for non-blocking document processing.
//!
//! Enable the `async` feature to use these APIs:
//!
//! ```toml
//! [dependencies]
//! typeset = { version = "0.1", features = ["async"] }
//! ```
//!
//! Building and rendering are CPU-bound, so every call runs the blocking
//! pipeline on Tokio's blocking pool.

use crate::config::TypesetConfig;
use crate::error::{Error, Result};
use crate::model::Document;
use crate::render::{convert_all, ConversionReport, OutputFormat, Publisher};
use crate::SourceFormat;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
}

/// Asynchronously builds a document from a file path.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> typeset::Result<()> {
/// let config = typeset::TypesetConfig::default();
/// let document = typeset::async_api::build_file("manuscript.docx", &config).await?;
/// println!("Chapters: {}", document.chapters.len());
/// # Ok(())
/// # }
/// ```
pub async fn build_file(path: impl AsRef<Path>, config: &TypesetConfig) -> Result<Document> {
    let path = path.as_ref();
    if fs::metadata(path).await.is_err() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let data = fs::read(path).await?;
    build_bytes(data, config).await
}

/// Asynchronously builds a document from bytes.
pub async fn build_bytes(data: Vec<u8>, config: &TypesetConfig) -> Result<Document> {
    let config = config.clone();
    blocking(move || crate::build_bytes(&data, &config)).await
}

/// Asynchronously builds a document from an async reader.
pub async fn build_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &TypesetConfig,
) -> Result<Document> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await?;
    build_bytes(data, config).await
}

/// Asynchronously detects the format of a file.
pub async fn detect_format(path: impl AsRef<Path>) -> Result<SourceFormat> {
    let data = fs::read(path).await?;
    crate::detect_format_from_bytes(&data)
}

/// Asynchronously renders and writes the requested formats.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> typeset::Result<()> {
/// use typeset::{OutputFormat, TypesetConfig};
///
/// let config = TypesetConfig::default();
/// let report = typeset::async_api::convert_file(
///     "manuscript.docx",
///     &config,
///     &OutputFormat::ALL,
///     "./output",
/// )
/// .await?;
/// assert!(report.all_succeeded());
/// # Ok(())
/// # }
/// ```
pub async fn convert_file(
    path: impl AsRef<Path>,
    config: &TypesetConfig,
    formats: &[OutputFormat],
    output_dir: impl AsRef<Path>,
) -> Result<ConversionReport> {
    let input = path.as_ref().to_path_buf();
    let document = build_file(&input, config).await?;
    let output_dir: PathBuf = output_dir.as_ref().to_path_buf();
    fs::create_dir_all(&output_dir).await?;

    let config = config.clone();
    let formats = formats.to_vec();
    blocking(move || {
        let stem = crate::output_stem(&document.metadata.title, &input);
        let publisher = Publisher::new(config.epub, config.pdf);
        Ok(convert_all(
            &publisher,
            &document,
            &formats,
            &output_dir,
            &stem,
        ))
    })
    .await
}
