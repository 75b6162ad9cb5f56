//! Image input encoded as a `data:` URL for the generator request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("cannot read image '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image file is empty")]
    Empty,
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// An uploaded image as the generator expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInput {
    mime: String,
    data_url: String,
}

impl ImageInput {
    /// Encode raw bytes. The mime type comes from magic bytes, then from the
    /// file name's extension.
    pub fn from_bytes(bytes: &[u8], file_name: Option<&str>) -> Self {
        let mime = sniff_mime(bytes)
            .or_else(|| file_name.and_then(mime_from_extension))
            .unwrap_or("application/octet-stream");
        ImageInput {
            mime: mime.to_string(),
            data_url: format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let name = path.file_name().map(|n| n.to_string_lossy().to_string());
        Ok(ImageInput::from_bytes(&bytes, name.as_deref()))
    }

    /// Accept a `data:<mime>;base64,<payload>` URL as sent by a browser.
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImageError::InvalidDataUrl("expected a base64 payload".to_string()))?;
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }
        STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidDataUrl(e.to_string()))?;
        Ok(ImageInput {
            mime: if mime.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime.to_string()
            },
            data_url: url.to_string(),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        let head = head.trim_start_matches('\u{feff}').trim_start();
        (head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")))
            .then_some("image/svg+xml")
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn magic_bytes_win_over_extension() {
        let png = ImageInput::from_bytes(b"\x89PNG\r\n\x1a\nrest", Some("photo.jpg"));
        assert_eq!(png.mime(), "image/png");
        assert!(png.data_url().starts_with("data:image/png;base64,iVBORw0KGgpyZXN0"));
        let svg = ImageInput::from_bytes(b"  <svg xmlns='http://www.w3.org/2000/svg'/>", None);
        assert_eq!(svg.mime(), "image/svg+xml");
        let webp = ImageInput::from_bytes(b"RIFF\0\0\0\0WEBPVP8 ", None);
        assert_eq!(webp.mime(), "image/webp");
    }

    #[test]
    fn extension_fallback() {
        let img = ImageInput::from_bytes(b"????", Some("design.JPEG"));
        assert_eq!(img.mime(), "image/jpeg");
        let unknown = ImageInput::from_bytes(b"????", Some("notes.txt"));
        assert_eq!(unknown.mime(), "application/octet-stream");
    }

    #[test]
    fn reads_files() {
        let mut file = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        file.write_all(b"GIF89a....").unwrap();
        let img = ImageInput::from_path(file.path()).unwrap();
        assert_eq!(img.mime(), "image/gif");

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ImageInput::from_path(empty.path()),
            Err(ImageError::Empty)
        ));
        assert!(matches!(
            ImageInput::from_path(Path::new("/definitely/not/here.png")),
            Err(ImageError::Io { .. })
        ));
    }

    #[test]
    fn data_urls() {
        let img = ImageInput::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(img.mime(), "image/png");
        assert!(ImageInput::from_data_url("http://x/y.png").is_err());
        assert!(ImageInput::from_data_url("data:image/png;base64,@@@").is_err());
    }
}
