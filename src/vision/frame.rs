//! Captured frame data and color statistics

use std::collections::BTreeMap;
use std::path::Path;

use image::RgbImage;

use crate::error::FrameError;

/// A captured screen-region frame handed in by the capture layer.
///
/// Consumed once per pipeline call, never retained.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Raw RGB pixel data
    pub image: RgbImage,
    /// Source label, typically the originating file or capture name
    pub label: String,
}

impl CaptureFrame {
    pub fn new(image: RgbImage, label: impl Into<String>) -> Self {
        Self {
            image,
            label: label.into(),
        }
    }

    /// Load a frame from an image file, labeling it with the file name.
    pub fn from_file(path: &Path) -> Result<Self, FrameError> {
        let image = image::open(path)
            .map_err(|source| FrameError {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { image, label })
    }

    /// A frame with zero pixels carries no information.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Summary of a frame's color population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCensus {
    /// Number of distinct RGB triples
    pub distinct: usize,
    /// Most frequent RGB triple (ties go to the lowest triple)
    pub dominant: [u8; 3],
}

/// Count distinct colors and find the dominant (background) color.
pub fn color_census(img: &RgbImage) -> ColorCensus {
    let mut counts: BTreeMap<[u8; 3], u32> = BTreeMap::new();
    for p in img.pixels() {
        *counts.entry(p.0).or_insert(0) += 1;
    }

    let mut dominant = [0u8; 3];
    let mut best = 0u32;
    for (&color, &count) in &counts {
        if count > best {
            best = count;
            dominant = color;
        }
    }

    ColorCensus {
        distinct: counts.len(),
        dominant,
    }
}
