//! idscan - identifier recognition over captured screen regions
//!
//! Turns a captured screen region into a validated identifier string: one
//! Setup pass calibrates the region (background color, selection-gap
//! threshold), then Apply passes filter operational frames against that
//! calibration, normalize and recognize each survivor, and aggregate the
//! per-frame results by majority vote.

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pattern;
pub mod pipeline;
pub mod vision;

pub use config::EngineConfig;
pub use pipeline::{ApplyFrame, Outcome, RecognitionPipeline, Request};
