//! Format detection for source packages and embedded images.

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Magic bytes for ZIP archive (DOCX and other OOXML packages)
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Magic bytes for OLE Compound File (legacy binary .doc)
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const PNG_SIGNATURE: &[u8] = b"\x89PNG";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_SIGNATURE: &[u8] = b"GIF";
const RIFF_SIGNATURE: &[u8] = b"RIFF";
const WEBP_FOURCC: &[u8] = b"WEBP";

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Office Open XML word-processing package (ZIP container)
    Docx,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Docx => write!(f, "DOCX"),
        }
    }
}

/// Detect source format from a file path.
///
/// A missing file is reported as [`Error::NotFound`].
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<SourceFormat> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let mut file = std::fs::File::open(path)?;
    detect_format(&mut file)
}

/// Detect source format from a reader.
pub fn detect_format<R: Read + Seek>(reader: &mut R) -> Result<SourceFormat> {
    let mut buffer = [0u8; 8];

    reader.seek(SeekFrom::Start(0))?;
    let bytes_read = reader.read(&mut buffer)?;
    reader.seek(SeekFrom::Start(0))?;

    detect_format_from_bytes(&buffer[..bytes_read])
}

/// Detect source format from bytes.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<SourceFormat> {
    if data.len() < 4 {
        return Err(Error::InvalidData("Data too small".into()));
    }

    if data[..4] == ZIP_MAGIC {
        return Ok(SourceFormat::Docx);
    }

    if data.len() >= 8 && data[..8] == OLE_MAGIC {
        return Err(Error::UnsupportedFormat(
            "legacy binary Word documents (.doc); save as .docx first".into(),
        ));
    }

    Err(Error::UnknownFormat)
}

/// Raster image formats recognized by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Returns the MIME type for this image format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Returns the file extension, which is the MIME subtype.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Detect an image format from its leading bytes.
///
/// Unrecognized data is treated as PNG.
pub fn detect_image_format(data: &[u8]) -> ImageFormat {
    if data.starts_with(PNG_SIGNATURE) {
        ImageFormat::Png
    } else if data.starts_with(JPEG_SIGNATURE) {
        ImageFormat::Jpeg
    } else if data.starts_with(GIF_SIGNATURE) {
        ImageFormat::Gif
    } else if data.starts_with(RIFF_SIGNATURE) && data.get(8..12) == Some(WEBP_FOURCC) {
        ImageFormat::Webp
    } else {
        ImageFormat::Png
    }
}

/// Returns the file extension for a MIME type, falling back to its subtype.
pub fn extension_for_mime(mime_type: &str) -> &str {
    match mime_type {
        "image/svg+xml" => "svg",
        _ => mime_type.rsplit('/').next().unwrap_or("bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_zip_magic() {
        let data = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00];
        assert_eq!(detect_format_from_bytes(&data).unwrap(), SourceFormat::Docx);
    }

    #[test]
    fn test_detect_legacy_doc_unsupported() {
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00, 0x00];
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_unknown() {
        let data = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_detect_too_short() {
        assert!(matches!(
            detect_format_from_bytes(&[0x50, 0x4B]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let result = detect_format_from_path("/definitely/not/here/manuscript.docx");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_image_signatures() {
        assert_eq!(detect_image_format(b"\x89PNG\r\n\x1a\n"), ImageFormat::Png);
        assert_eq!(detect_image_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(detect_image_format(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(detect_image_format(b"RIFF\x24\x00\x00\x00WEBPVP8 "), ImageFormat::Webp);
    }

    #[test]
    fn test_riff_without_webp_at_offset_eight() {
        // WAVE audio shares the RIFF container
        assert_eq!(detect_image_format(b"RIFF\x24\x00\x00\x00WAVEfmt "), ImageFormat::Png);
        // WEBP fourcc at the wrong offset does not count
        assert_eq!(detect_image_format(b"RIFFWEBP\x00\x00\x00\x00"), ImageFormat::Png);
    }

    #[test]
    fn test_unknown_signature_defaults_to_png() {
        let format = detect_image_format(&[0x00, 0x01]);
        assert_eq!(format.mime_type(), "image/png");
        assert_eq!(detect_image_format(&[]).extension(), "png");
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpeg");
        assert_eq!(extension_for_mime("image/svg+xml"), "svg");
        assert_eq!(extension_for_mime("image/webp"), "webp");
    }
}
