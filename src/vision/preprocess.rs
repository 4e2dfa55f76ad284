//! Canonical frame normalization for the line-OCR engine
//!
//! `normalize` is a pure function: identical input pixels and flags produce
//! byte-identical output. The transform order is fixed - grayscale, optional
//! border removal, adaptive binarization, foreground crop, rescale to the
//! canonical height, polarity flip, stray-mark removal, padding.

use image::{imageops, DynamicImage, GrayImage, Luma};

use super::{background_intensity, borders, column_gaps, otsu_mask, word_blocks};

/// Canonical text-line height before padding.
const CANONICAL_HEIGHT: u32 = 50;
/// Pixels to expand around the foreground bounding box.
const EXPAND_PIXELS: u32 = 2;
/// A leading/trailing block shorter than this share of the median block
/// height is a stray mark (e.g. a label colon).
const STRAY_HEIGHT_RATIO: f32 = 0.65;
/// Symmetric padding as a share of the image dimensions.
const PAD_WIDTH_RATIO: f32 = 0.1;
const PAD_HEIGHT_RATIO: f32 = 0.3;

/// Normalize a raw frame into the canonical form expected by the OCR engine.
pub fn normalize(img: &DynamicImage, remove_borders: bool) -> GrayImage {
    let mut gray = img.to_luma8();

    if remove_borders {
        gray = borders::remove_borders(&gray);
    }

    // Foreground is whichever binarized population is in the minority
    let mask = otsu_mask(&gray);
    let black = mask.pixels().filter(|p| p.0[0] == 0).count();
    let white = mask.pixels().len() - black;
    let white_background = black <= white;
    let foreground = if white_background { 0u8 } else { 255u8 };

    let mut gray = crop_to_foreground(&gray, &mask, foreground);

    // Fixed canonical height, aspect ratio preserved
    let (w, h) = gray.dimensions();
    if h != 0 && w != 0 {
        let scale = CANONICAL_HEIGHT as f32 / h as f32;
        let new_w = ((w as f32 * scale) as u32).max(1);
        gray = imageops::resize(&gray, new_w, CANONICAL_HEIGHT, imageops::FilterType::Triangle);
    }

    // Background is always light from here on
    if !white_background {
        for p in gray.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
    }

    let mask = otsu_mask(&gray);
    let bg = background_intensity(&gray);
    remove_stray_marks(&mut gray, &mask, bg);

    pad(&gray, bg)
}

/// Crop to the bounding box of foreground-colored mask pixels, expanded by
/// [`EXPAND_PIXELS`] on each side. A mask with no foreground at all leaves
/// the image untouched.
fn crop_to_foreground(gray: &GrayImage, mask: &GrayImage, foreground: u8) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut seen = false;

    for (x, y, p) in mask.enumerate_pixels() {
        if p.0[0] == foreground {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            seen = true;
        }
    }
    if !seen {
        return gray.clone();
    }

    let x0 = min_x.saturating_sub(EXPAND_PIXELS);
    let y0 = min_y.saturating_sub(EXPAND_PIXELS);
    let x1 = (max_x + 1 + EXPAND_PIXELS).min(w);
    let y1 = (max_y + 1 + EXPAND_PIXELS).min(h);
    imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image()
}

/// Repaint a leading or trailing word block to background when its ink height
/// falls below [`STRAY_HEIGHT_RATIO`] of the median block height.
pub(crate) fn remove_stray_marks(img: &mut GrayImage, mask: &GrayImage, bg: u8) {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    let gaps = column_gaps(mask);
    let blocks = word_blocks(&gaps, 0, w - 1);
    if blocks.is_empty() {
        return;
    }

    let heights: Vec<u32> = blocks
        .iter()
        .map(|&(b0, b1)| {
            let has_ink = |y: u32| (b0..=b1).any(|x| mask.get_pixel(x, y).0[0] == 0);
            let start = (0..h).find(|&y| has_ink(y)).unwrap_or(0);
            let end = (0..h).rev().find(|&y| has_ink(y)).unwrap_or(h - 1);
            end - start + 1
        })
        .collect();

    let threshold = median(&heights);

    let mut repaint = |block: (u32, u32)| {
        let x0 = block.0.saturating_sub(1);
        let x1 = (block.1 + 2).min(w);
        for x in x0..x1 {
            for y in 0..img.height() {
                img.get_pixel_mut(x, y).0[0] = bg;
            }
        }
    };

    if (heights[0] as f32) < threshold * STRAY_HEIGHT_RATIO {
        repaint(blocks[0]);
    }
    if (*heights.last().unwrap() as f32) < threshold * STRAY_HEIGHT_RATIO {
        repaint(*blocks.last().unwrap());
    }
}

fn median(values: &[u32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f32
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f32 / 2.0
    }
}

/// Symmetric background-filled padding.
fn pad(img: &GrayImage, bg: u8) -> GrayImage {
    let (w, h) = img.dimensions();
    let pad_w = (w as f32 * PAD_WIDTH_RATIO) as u32;
    let pad_h = (h as f32 * PAD_HEIGHT_RATIO) as u32;

    let mut out = GrayImage::from_pixel(w + 2 * pad_w, h + 2 * pad_h, Luma([bg]));
    imageops::replace(&mut out, img, pad_w as i64, pad_h as i64);
    out
}
