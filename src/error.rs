//! Error taxonomy for the recognition pipeline
//!
//! Configuration-time pattern errors disable correction but never the engine;
//! Setup errors surface to the caller; Apply absorbs per-frame failures.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while compiling an identifier-format grammar string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    /// A token did not match any of `[..]`, `d(..)`, `L(..)`.
    #[error("unrecognized token at byte {offset} of pattern {spec:?}")]
    Syntax { spec: String, offset: usize },

    /// A length range was empty, malformed, or had more than two bounds.
    #[error("invalid length range {range:?} in pattern")]
    BadRange { range: String },

    /// A two-bound range ran backwards.
    #[error("length range start {start} exceeds end {end}")]
    InvertedRange { start: usize, end: usize },
}

/// Failures invoking an external engine (OCR or classifier artifact).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine invocation failed: {0}")]
    Invocation(String),

    #[error("engine did not respond within {0:?}")]
    Timeout(Duration),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Invocation(err.to_string())
    }
}

/// A captured-frame image file that could not be opened or decoded.
#[derive(Debug, Error)]
#[error("failed to load frame image {path:?}: {source}")]
pub struct FrameError {
    pub path: std::path::PathBuf,
    #[source]
    pub source: image::ImageError,
}

/// Calibration store I/O and format failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("calibration file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("calibration file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Classifier artifact loading failures.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("classifier artifact i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("classifier artifact is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("classifier artifact has no weights")]
    Empty,
}

/// Recoverable Setup-time failures; the operator retries with a different
/// region or frame.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup requires exactly one frame, got {0}")]
    FrameCount(usize),

    #[error("frame is empty or contains a single color")]
    DegenerateFrame,

    #[error("no background gap covers the lateral offset; the selection box sits on the identifier")]
    BBoxMisplaced,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
