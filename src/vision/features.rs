//! Gradient-histogram features for the frame-validity classifier

use image::GrayImage;
use imageproc::hog::{hog, HogOptions};

use crate::error::EngineError;

/// Canonical classifier frame width (transposed orientation).
pub const CANONICAL_WIDTH: u32 = 64;
/// Canonical classifier frame height (transposed orientation).
pub const CANONICAL_HEIGHT: u32 = 300;

/// HOG layout over the canonical frame. Cell side 4 divides both canonical
/// dimensions, so the feature vector has a fixed length for every frame.
fn options() -> HogOptions {
    HogOptions::new(9, false, 4, 2, 1)
}

/// Extract the fixed-dimension gradient-histogram feature vector from a
/// canonical-size grayscale frame.
pub fn gradient_features(img: &GrayImage) -> Result<Vec<f32>, EngineError> {
    if img.dimensions() != (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        return Err(EngineError::Invocation(format!(
            "classifier frame must be {}x{}, got {}x{}",
            CANONICAL_WIDTH,
            CANONICAL_HEIGHT,
            img.width(),
            img.height()
        )));
    }
    hog(img, options()).map_err(EngineError::Invocation)
}
