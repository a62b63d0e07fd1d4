use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use image::RgbaImage;

use crate::error::AtlasError;

/// Where a sprite sheet comes from. Generated images usually arrive either
/// as a file on disk or inline as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageSource {
    Path(PathBuf),
    DataUrl(String),
    Bytes(Arc<[u8]>),
}

impl ImageSource {
    /// Interpret a stored image reference: `data:` URLs are embedded images,
    /// anything else is a filesystem path.
    pub fn from_reference(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("data:") {
            Self::DataUrl(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Short label for logs and errors. Data URLs are truncated.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => format!("'{}'", path.display()),
            Self::DataUrl(url) => {
                let head: String = url.chars().take(32).collect();
                format!("data URL '{head}...' ({} chars)", url.len())
            }
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }

    pub fn load(&self) -> Result<RgbaImage, AtlasError> {
        let image = match self {
            Self::Path(path) => image::open(path),
            Self::DataUrl(url) => {
                let bytes = decode_data_url(url)
                    .map_err(|reason| AtlasError::image_load(self.describe(), reason))?;
                image::load_from_memory(&bytes)
            }
            Self::Bytes(bytes) => image::load_from_memory(bytes),
        }
        .map_err(|e| AtlasError::image_load(self.describe(), e))?;
        Ok(image.to_rgba8())
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URL".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no ',' separator".to_string())?;
    if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err("only base64 data URLs are supported".to_string());
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))
}
