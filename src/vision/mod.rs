//! Pixel-level building blocks of the recognition pipeline
//!
//! Frame buffers and color statistics, border-line removal, the canonical
//! normalization applied before OCR, and the gradient features fed to the
//! frame-validity classifier.

pub mod borders;
pub mod features;
pub mod frame;
pub mod preprocess;

pub use frame::{color_census, CaptureFrame, ColorCensus};
pub use preprocess::normalize;

use image::GrayImage;

/// Swap axes: output pixel `(x, y)` is input pixel `(y, x)`.
pub fn transpose(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(h, w, |x, y| *img.get_pixel(y, x))
}

/// Most frequent intensity in a grayscale image; ties go to the lower value.
pub fn background_intensity(img: &GrayImage) -> u8 {
    let mut counts = [0u32; 256];
    for p in img.pixels() {
        counts[p.0[0] as usize] += 1;
    }
    let mut best = 0usize;
    for (value, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = value;
        }
    }
    best as u8
}

/// Otsu mask with raw polarity: pixels above the threshold become white.
pub fn otsu_mask(img: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] > level {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    })
}

/// Otsu mask normalized so the background is always white: when black pixels
/// outnumber white ones the mask is inverted.
pub fn binarize(img: &GrayImage) -> GrayImage {
    let mut mask = otsu_mask(img);
    let black = mask.pixels().filter(|p| p.0[0] == 0).count();
    let white = mask.pixels().len() - black;
    if black > white {
        for p in mask.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
    }
    mask
}

/// Background-column gaps of a white-background binary image: a column is a
/// gap when its summed deviation from pure white stays below one full pixel.
/// Consecutive gap columns coalesce into inclusive `(start, end)` intervals.
pub fn column_gaps(img: &GrayImage) -> Vec<(u32, u32)> {
    let (w, h) = img.dimensions();
    let mut gaps = Vec::new();
    let mut start: Option<u32> = None;

    for x in 0..w {
        let deviation: u32 = (0..h).map(|y| 255 - img.get_pixel(x, y).0[0] as u32).sum();
        if deviation < 255 {
            if start.is_none() {
                start = Some(x);
            }
        } else if let Some(s) = start.take() {
            gaps.push((s, x - 1));
        }
    }
    if let Some(s) = start {
        gaps.push((s, w - 1));
    }
    gaps
}

/// Complement of gap intervals over the inclusive span `[min, max]`: the
/// column ranges that actually carry ink.
pub fn word_blocks(gaps: &[(u32, u32)], min: u32, max: u32) -> Vec<(u32, u32)> {
    let mut blocks = Vec::new();
    let mut next_start = min;
    for &(start, end) in gaps {
        if next_start < start {
            blocks.push((next_start, start - 1));
            next_start = end + 1;
        } else if next_start < end {
            next_start = end + 1;
        }
    }
    if next_start < max {
        blocks.push((next_start, max));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn white(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    #[test]
    fn test_transpose() {
        let mut img = white(3, 2);
        img.put_pixel(2, 1, Luma([0]));
        let t = transpose(&img);
        assert_eq!(t.dimensions(), (2, 3));
        assert_eq!(t.get_pixel(1, 2).0[0], 0);
    }

    #[test]
    fn test_background_intensity_ties_pick_lower() {
        let mut img = white(2, 1);
        img.put_pixel(0, 0, Luma([10]));
        assert_eq!(background_intensity(&img), 10);
    }

    #[test]
    fn test_binarize_normalizes_polarity() {
        // Dark background with a small light mark: the mask inverts so the
        // background ends up white either way.
        let mut dark_bg = GrayImage::from_pixel(10, 10, Luma([20]));
        dark_bg.put_pixel(5, 5, Luma([240]));
        let mask = binarize(&dark_bg);
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn test_column_gaps_and_blocks() {
        let mut img = white(10, 4);
        // Ink in columns 3-4 and 7
        for y in 0..4 {
            img.put_pixel(3, y, Luma([0]));
            img.put_pixel(4, y, Luma([0]));
            img.put_pixel(7, y, Luma([0]));
        }
        let gaps = column_gaps(&img);
        assert_eq!(gaps, vec![(0, 2), (5, 6), (8, 9)]);
        let blocks = word_blocks(&gaps, 0, 9);
        assert_eq!(blocks, vec![(3, 4), (7, 7)]);
    }
}
