use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Declared content type of a carrier.
///
/// Supplied by the caller; sniffing strategy lives outside the codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierType {
    /// Raster image (PNG, JPEG, WebP).
    Image,
    /// UTF-8 JSON document.
    Json,
    /// Anything without a watermark scheme.
    Unsupported,
}

impl CarrierType {
    /// Classify by file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "webp" => Self::Image,
            "json" => Self::Json,
            _ => Self::Unsupported,
        }
    }

    /// Classify by the extension of a file name.
    pub fn from_filename(name: &str) -> Self {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unsupported)
    }
}

impl fmt::Display for CarrierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Json => write!(f, "json"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}
