//! Border-line detection and removal
//!
//! Selection rectangles and dashed focus boxes leak into captured regions as
//! straight lines. Lines are found per row (and per column via transpose) by
//! run-length encoding: a solid non-background run spanning most of the image
//! and touching an edge, or a short two-value pattern repeating like a dashed
//! border, marks the line for repainting with the background color.

use std::collections::BTreeSet;

use image::GrayImage;

use super::{background_intensity, binarize, transpose};

/// Minimum share of the span a border line must cover.
const LINE_SPAN_RATIO: f32 = 0.6;
/// Minimum repeats for a dashed two-value pattern.
const DASH_MIN_REPEATS: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32,
    len: u32,
    value: u8,
}

/// A non-background run covering most of a line; `end` is exclusive.
#[derive(Debug, Clone, Copy)]
struct LongRun {
    line: u32,
    start: u32,
    end: u32,
    value: u8,
}

fn encode_runs(row: &[u8]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, &value) in row.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.value == value => run.len += 1,
            _ => runs.push(Run {
                start: i as u32,
                len: 1,
                value,
            }),
        }
    }
    runs
}

/// Does a `(len, value)` pair starting at `j` repeat often enough to cover
/// most of the span?
fn is_dashed(runs: &[Run], j: usize, span: u32) -> bool {
    let (a, b) = (runs[j], runs[j + 1]);
    let period = (a.len + b.len) as usize;
    let times = (span as f32 * LINE_SPAN_RATIO) as usize / period;
    if times < DASH_MIN_REPEATS || j + times * 2 > runs.len() {
        return false;
    }
    runs[j..j + times * 2].chunks(2).all(|pair| {
        pair[0].len == a.len
            && pair[0].value == a.value
            && pair[1].len == b.len
            && pair[1].value == b.value
    })
}

/// Scan every horizontal line of `img` for border candidates.
///
/// Returns the flagged line indices (dashed patterns, plus solid long runs
/// touching an edge) and every long non-background run for cross-orientation
/// intersection checks.
fn scan_lines(img: &GrayImage, bg: u8) -> (Vec<u32>, Vec<LongRun>) {
    let (w, h) = img.dimensions();
    let mut flagged = Vec::new();
    let mut long_runs = Vec::new();
    let min_len = (w as f32 * LINE_SPAN_RATIO) as u32;

    for y in 0..h {
        let row: Vec<u8> = (0..w).map(|x| img.get_pixel(x, y).0[0]).collect();
        let runs = encode_runs(&row);

        for j in 0..runs.len().saturating_sub(1) {
            if is_dashed(&runs, j, w) {
                flagged.push(y);
                break;
            }
        }

        for run in &runs {
            if run.value != bg && run.len > min_len {
                long_runs.push(LongRun {
                    line: y,
                    start: run.start,
                    end: run.start + run.len,
                    value: run.value,
                });
                if run.start == 0 || run.start + run.len == w {
                    flagged.push(y);
                }
            }
        }
    }

    (flagged, long_runs)
}

/// Find border lines in `mask` and repaint them in `img` with its background
/// color. `mask` and `img` share dimensions; the mask may be the raw
/// grayscale image or its binarization.
fn repaint_border_lines(mask: &GrayImage, img: &mut GrayImage) {
    let mask_bg = background_intensity(mask);
    let (row_flags, rows) = scan_lines(mask, mask_bg);
    let transposed = transpose(mask);
    let (col_flags, cols) = scan_lines(&transposed, mask_bg);

    let rows_set: BTreeSet<u32> = row_flags.into_iter().collect();
    let mut cols_set: BTreeSet<u32> = col_flags.into_iter().collect();

    // A long vertical run crossing a long horizontal run of similar color is
    // part of the same box even when it stops short of an edge.
    for row in &rows {
        for col in &cols {
            if row.start <= col.line
                && col.line <= row.end
                && (col.value as i16 - row.value as i16).abs() < 3
            {
                cols_set.insert(col.line);
            }
        }
    }

    let bg = background_intensity(img);
    let (w, h) = img.dimensions();
    for &x in &cols_set {
        for y in 0..h {
            img.get_pixel_mut(x, y).0[0] = bg;
        }
    }
    for &y in &rows_set {
        for x in 0..w {
            img.get_pixel_mut(x, y).0[0] = bg;
        }
    }
}

/// Double-pass border removal: once against the raw grayscale image, once
/// against its binarized form, since a border may sit on either side of the
/// binarization threshold.
pub fn remove_borders(gray: &GrayImage) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }

    let mut img = gray.clone();
    let snapshot = img.clone();
    repaint_border_lines(&snapshot, &mut img);

    // Nothing left to separate: the binary pass needs at least two values
    let first = img.get_pixel(0, 0).0[0];
    if img.pixels().all(|p| p.0[0] == first) {
        return img;
    }

    let binary = binarize(&img);
    repaint_border_lines(&binary, &mut img);
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_solid_edge_line_removed() {
        let mut img = GrayImage::from_pixel(20, 10, Luma([255]));
        // Solid dark line across the full top row
        for x in 0..20 {
            img.put_pixel(x, 0, Luma([0]));
        }
        // And a glyph pixel that must survive
        img.put_pixel(10, 5, Luma([0]));

        let cleaned = remove_borders(&img);
        assert_eq!(cleaned.get_pixel(3, 0).0[0], 255);
        assert_eq!(cleaned.get_pixel(10, 5).0[0], 0);
    }

    #[test]
    fn test_solid_vertical_line_removed() {
        let mut img = GrayImage::from_pixel(12, 16, Luma([255]));
        for y in 0..16 {
            img.put_pixel(0, y, Luma([0]));
        }
        img.put_pixel(6, 8, Luma([0]));

        let cleaned = remove_borders(&img);
        assert_eq!(cleaned.get_pixel(0, 7).0[0], 255);
        assert_eq!(cleaned.get_pixel(6, 8).0[0], 0);
    }

    #[test]
    fn test_dashed_line_removed() {
        let mut img = GrayImage::from_pixel(24, 10, Luma([255]));
        // 2-on 2-off dashes across row 4: period 4, repeats 6 over 24 px
        for x in 0..24 {
            if (x / 2) % 2 == 0 {
                img.put_pixel(x, 4, Luma([0]));
            }
        }
        img.put_pixel(11, 7, Luma([0]));

        let cleaned = remove_borders(&img);
        assert_eq!(cleaned.get_pixel(0, 4).0[0], 255);
        assert_eq!(cleaned.get_pixel(2, 4).0[0], 255);
        assert_eq!(cleaned.get_pixel(11, 7).0[0], 0);
    }

    #[test]
    fn test_short_marks_kept() {
        let mut img = GrayImage::from_pixel(20, 10, Luma([255]));
        // Short run at an edge, well under the span ratio
        for x in 0..5 {
            img.put_pixel(x, 0, Luma([0]));
        }
        let cleaned = remove_borders(&img);
        assert_eq!(cleaned.get_pixel(2, 0).0[0], 0);
    }
}
