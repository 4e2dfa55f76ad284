//! External line-OCR engine contract
//!
//! The engine is an opaque, synchronous service: it receives a normalized
//! single-line image on disk, a whitelist character set, and a legacy-model
//! flag, and returns a raw string (possibly empty). Glyph recognition itself
//! is never reimplemented here.

mod tesseract;

pub use tesseract::TesseractOcr;

use std::path::Path;

use crate::error::EngineError;

/// Single-line recognition over a normalized image file.
pub trait LineOcr: Send + Sync {
    /// Recognize the text line in `image`, restricted to `whitelist`
    /// characters. `legacy` selects the engine's legacy line model.
    fn recognize_line(&self, image: &Path, whitelist: &str, legacy: bool)
        -> Result<String, EngineError>;
}
