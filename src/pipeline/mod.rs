//! Recognition pipeline orchestration
//!
//! Two modes, selected explicitly by the caller: **Setup** calibrates a
//! capture region from a single clean frame and learns its background color;
//! **Apply** filters a batch of noisy operational frames against that
//! calibration, recognizes each survivor, and aggregates the results into one
//! consensus identifier. All services (patterns, store, OCR engine,
//! classifier) are injected at construction.

use image::{imageops, DynamicImage, GrayImage};
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationStore, COLOR_TOLERANCE};
use crate::classifier::FrameClassifier;
use crate::config::EngineConfig;
use crate::error::{EngineError, SetupError};
use crate::ocr::LineOcr;
use crate::pattern::{self, Pattern};
use crate::vision::{
    binarize, borders, color_census, column_gaps, features, normalize, transpose, CaptureFrame,
};

/// Setup-mode canonical size (width, height) before normalization.
const SETUP_CANONICAL: (u32, u32) = (300, 64);
/// Share of a row's columns that must deviate from background for the row to
/// count as part of the text band.
const ROW_ACTIVE_DIVISOR: u32 = 15;
/// Extra rows kept above and below the detected text band.
const ROW_MARGIN_RATIO: f32 = 0.1;

/// One Apply-mode frame with its optional precomputed column threshold.
#[derive(Debug)]
pub struct ApplyFrame {
    pub frame: CaptureFrame,
    /// Width of the calibration gap measured at Setup; defaults to 1
    pub threshold: Option<u32>,
}

impl ApplyFrame {
    pub fn new(frame: CaptureFrame) -> Self {
        Self {
            frame,
            threshold: None,
        }
    }

    pub fn with_threshold(frame: CaptureFrame, threshold: u32) -> Self {
        Self {
            frame,
            threshold: Some(threshold),
        }
    }
}

/// Pipeline invocation, mode chosen explicitly by the caller.
#[derive(Debug)]
pub enum Request {
    /// One-time calibration; exactly one frame is required.
    Setup { frames: Vec<CaptureFrame> },
    /// Repeated operational recognition over any number of frames.
    Apply { frames: Vec<ApplyFrame> },
}

/// Pipeline result, mirroring the request mode.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Setup { text: String, threshold: u32 },
    /// Empty text signals "no confident result".
    Apply { text: String },
}

/// The only entry point of the recognition core.
pub struct RecognitionPipeline {
    config: EngineConfig,
    patterns: Option<Vec<Pattern>>,
    store: CalibrationStore,
    ocr: Box<dyn LineOcr>,
    classifier: Box<dyn FrameClassifier>,
}

impl RecognitionPipeline {
    pub fn new(
        config: EngineConfig,
        patterns: Option<Vec<Pattern>>,
        store: CalibrationStore,
        ocr: Box<dyn LineOcr>,
        classifier: Box<dyn FrameClassifier>,
    ) -> Self {
        Self {
            config,
            patterns,
            store,
            ocr,
            classifier,
        }
    }

    pub fn run(&self, fingerprint: &str, request: Request) -> Result<Outcome, SetupError> {
        match request {
            Request::Setup { frames } => {
                let (text, threshold) = self.setup(fingerprint, &frames)?;
                Ok(Outcome::Setup { text, threshold })
            }
            Request::Apply { frames } => Ok(Outcome::Apply {
                text: self.apply(fingerprint, &frames),
            }),
        }
    }

    /// Calibrate the region from a single clean frame: learn its background
    /// color, measure the selection-gap threshold, and recognize the
    /// identifier once.
    fn setup(&self, fingerprint: &str, frames: &[CaptureFrame]) -> Result<(String, u32), SetupError> {
        if frames.len() != 1 {
            return Err(SetupError::FrameCount(frames.len()));
        }
        let frame = &frames[0];
        if frame.is_empty() {
            return Err(SetupError::DegenerateFrame);
        }
        let census = color_census(&frame.image);
        if census.distinct <= 1 {
            return Err(SetupError::DegenerateFrame);
        }

        let gray = imageops::grayscale(&frame.image);
        let binary = binarize(&gray);
        let (upper, lower) = row_band(&binary, self.config.offset, ROW_ACTIVE_DIVISOR);

        // The gap interval covering the lateral offset is the margin between
        // the selection box and the identifier; its width is the threshold
        // Apply will later look for.
        let band_mask =
            imageops::crop_imm(&binary, 0, upper, binary.width(), lower - upper).to_image();
        let offset = self.config.offset;
        let threshold = column_gaps(&band_mask)
            .into_iter()
            .find(|&(start, end)| start <= offset && offset <= end)
            .map(|(start, end)| end - start + 1)
            .ok_or(SetupError::BBoxMisplaced)?;

        let mut band =
            imageops::crop_imm(&frame.image, 0, upper, frame.image.width(), lower - upper)
                .to_image();
        if offset > 0 && band.width() > 2 * offset {
            band = imageops::crop_imm(&band, offset, 0, band.width() - 2 * offset, band.height())
                .to_image();
        }
        let resized = imageops::resize(
            &band,
            SETUP_CANONICAL.0,
            SETUP_CANONICAL.1,
            imageops::FilterType::Triangle,
        );

        let canonical = normalize(&DynamicImage::ImageRgb8(resized), true);
        let text = self.recognize(&canonical)?;
        let text = self.correct(text);

        // Persisted unconditionally; the recognized text is not verified
        // against any expected identifier
        self.store.record(fingerprint, census.dominant)?;

        info!(fingerprint, threshold, text = %text, "setup complete");
        Ok((text, threshold))
    }

    /// Recognize over a batch of operational frames. Per-frame failures are
    /// logged and absorbed; only an empty accepted set yields an empty
    /// result.
    fn apply(&self, fingerprint: &str, frames: &[ApplyFrame]) -> String {
        let mut results = Vec::new();
        for entry in frames {
            match self.apply_frame(fingerprint, entry) {
                Ok(Some(text)) => results.push(text),
                Ok(None) => {}
                Err(e) => {
                    warn!(frame = %entry.frame.label, error = %e, "frame skipped after engine failure");
                }
            }
        }
        if results.is_empty() {
            warn!(fingerprint, "no frame survived filtering");
        }
        majority_vote(&results)
    }

    fn apply_frame(
        &self,
        fingerprint: &str,
        entry: &ApplyFrame,
    ) -> Result<Option<String>, EngineError> {
        let frame = &entry.frame;
        if frame.is_empty() {
            warn!(frame = %frame.label, "empty frame");
            return Ok(None);
        }
        let census = color_census(&frame.image);
        if census.distinct <= 1 {
            warn!(frame = %frame.label, "single color in frame");
            return Ok(None);
        }
        match self.store.matches(fingerprint, census.dominant, COLOR_TOLERANCE) {
            Ok(true) => {}
            Ok(false) => {
                warn!(frame = %frame.label, color = ?census.dominant, "background color not calibrated");
                return Ok(None);
            }
            Err(e) => {
                warn!(frame = %frame.label, error = %e, "calibration store unreadable");
                return Ok(None);
            }
        }

        let gray = imageops::grayscale(&frame.image);
        if !center_row_has_foreground(&binarize(&gray)) {
            warn!(frame = %frame.label, "center row has no foreground");
            return Ok(None);
        }

        let gray = borders::remove_borders(&gray);
        let binary = binarize(&gray);
        let (upper, lower) = row_band(&binary, self.config.offset, ROW_ACTIVE_DIVISOR);
        let band = imageops::crop_imm(&gray, 0, upper, gray.width(), lower - upper).to_image();
        let band_mask =
            imageops::crop_imm(&binary, 0, upper, binary.width(), lower - upper).to_image();

        let Some(cropped) = crop_to_margin(
            &band,
            &column_gaps(&band_mask),
            entry.threshold.unwrap_or(1),
            self.config.offset,
        ) else {
            warn!(frame = %frame.label, "degenerate column crop");
            return Ok(None);
        };

        // Canonical classifier orientation is transposed relative to Setup
        let canonical = imageops::resize(
            &transpose(&cropped),
            features::CANONICAL_WIDTH,
            features::CANONICAL_HEIGHT,
            imageops::FilterType::Triangle,
        );
        let feats = features::gradient_features(&canonical)?;
        if !self.classifier.accept(&feats)? {
            debug!(frame = %frame.label, "classifier rejected frame");
            return Ok(None);
        }

        let ocr_input = transpose(&canonical);
        let normalized = normalize(&DynamicImage::ImageLuma8(ocr_input), true);
        let text = self.recognize(&normalized)?;
        let text = self.correct(text);

        if let Some(expected) = self.config.expected_len {
            if text.chars().count() != expected {
                debug!(frame = %frame.label, text = %text, expected, "length filter dropped result");
                return Ok(None);
            }
        }
        Ok(Some(text))
    }

    /// Save the normalized image to a scratch file and invoke the engine.
    fn recognize(&self, img: &GrayImage) -> Result<String, EngineError> {
        let tmp = tempfile::Builder::new()
            .prefix("idscan")
            .suffix(".png")
            .tempfile()?;
        img.save(tmp.path())
            .map_err(|e| EngineError::Invocation(e.to_string()))?;
        self.ocr
            .recognize_line(tmp.path(), &self.config.whitelist, true)
    }

    /// Replace the raw OCR text with the top-ranked correction, when any
    /// pattern matched.
    fn correct(&self, text: String) -> String {
        let Some(patterns) = &self.patterns else {
            return text;
        };
        pattern::correct(&text, patterns)
            .into_iter()
            .next()
            .map(|c| c.converted)
            .unwrap_or(text)
    }
}

/// Find the vertical text band: scanning outward from the center row, a row
/// belongs to the band while more than `1/divisor` of its columns deviate
/// from background by more than 3 intensity levels; the band is then extended
/// by a 10% margin on each side. `offset` columns are ignored at both edges.
/// Returns `(upper, lower)` with `lower` exclusive.
fn row_band(binary: &GrayImage, offset: u32, divisor: u32) -> (u32, u32) {
    let (w, h) = binary.dimensions();
    let (x0, x1) = if offset > 0 && w > 2 * offset {
        (offset, w - offset)
    } else {
        (0, w)
    };
    let width = x1 - x0;
    let active = |y: u32| {
        let deviating = (x0..x1)
            .filter(|&x| 255 - binary.get_pixel(x, y).0[0] as i32 > 3)
            .count();
        deviating > (width / divisor) as usize
    };

    let margin = (h as f32 * ROW_MARGIN_RATIO) as u32;
    let center = h / 2;

    let mut flag = false;
    let mut min_row = center;
    let mut upper = 0;
    for y in (1..=center).rev() {
        if active(y) {
            flag = true;
            min_row = min_row.min(y);
        } else if flag {
            upper = min_row;
            break;
        } else {
            upper = 0;
        }
    }
    let upper = upper.saturating_sub(margin);

    let mut flag = false;
    let mut max_row = 0;
    let mut lower = h.saturating_sub(1);
    for y in center..h {
        if active(y) {
            flag = true;
            max_row = max_row.max(y);
        } else if flag {
            lower = max_row;
            break;
        } else {
            lower = h.saturating_sub(1);
        }
    }
    let lower = (lower + margin).min(h.saturating_sub(1));

    (upper, lower + 1)
}

/// The primary Apply noise test: the binarized center row must contain some
/// foreground ink.
fn center_row_has_foreground(binary: &GrayImage) -> bool {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return false;
    }
    let y = h / 2;
    let deviation: u64 = (0..w).map(|x| 255 - binary.get_pixel(x, y).0[0] as u64).sum();
    deviation as f64 >= w as f64 / 20.0 * 255.0
}

/// Locate the left margin as the first background gap at least
/// `threshold - 1` wide within the first half of the gap list, and crop
/// symmetrically around it. Sentinel "no margin found" falls back to the raw
/// offset crop. Returns `None` only when the resulting span is degenerate.
fn crop_to_margin(
    band: &GrayImage,
    gaps: &[(u32, u32)],
    threshold: u32,
    offset: u32,
) -> Option<GrayImage> {
    let w = band.width() as i64;
    let threshold = threshold as i64;
    let offset = offset as i64;

    let mut left: i64 = -1;
    let mut margin: i64 = 0;
    for (pos, &(start, end)) in gaps.iter().enumerate() {
        let width = (end - start + 1) as i64;
        if width >= threshold - 1 && (pos as f64) < gaps.len() as f64 / 2.0 {
            let run = (end - start) as i64;
            left = end as i64 + 1 - run / 2;
            margin = run / 2;
            break;
        }
    }

    let (x0, x1) = if left >= 0 {
        let right = (left + w - 2 * offset + margin).min(w - 1);
        (left, right)
    } else {
        (0, w - offset)
    };
    if x0 < 0 || x1 <= x0 || x0 >= w {
        return None;
    }
    Some(imageops::crop_imm(band, x0 as u32, 0, (x1 - x0) as u32, band.height()).to_image())
}

/// Plurality aggregation; ties are broken by first-seen order.
fn majority_vote(results: &[String]) -> String {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for text in results {
        match tally.iter_mut().find(|(t, _)| *t == text.as_str()) {
            Some(entry) => entry.1 += 1,
            None => tally.push((text, 1)),
        }
    }

    let mut winner = "";
    let mut best = 0;
    for (text, count) in tally {
        if count > best {
            best = count;
            winner = text;
        }
    }
    winner.to_string()
}
