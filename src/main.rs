//! idscan command line
//!
//! Thin wrapper around [`RecognitionPipeline`]: wire up configuration, the
//! calibration store, the OCR engine, and the optional classifier artifact,
//! then run one Setup or Apply request over frames given as image files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use idscan::calibration::CalibrationStore;
use idscan::classifier::{AcceptAll, FrameClassifier, LinearSvm};
use idscan::config::{self, EngineConfig};
use idscan::ocr::TesseractOcr;
use idscan::pattern::{compile, Pattern};
use idscan::pipeline::{ApplyFrame, Outcome, RecognitionPipeline, Request};
use idscan::vision::CaptureFrame;

/// idscan - identifier recognition over captured screen regions
#[derive(Parser, Debug)]
#[command(name = "idscan")]
#[command(about = "Recognize identifiers in captured screen regions")]
struct Args {
    /// Configuration file (TOML); defaults to the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration store directory; defaults to the platform data directory
    #[arg(long)]
    store: Option<PathBuf>,

    /// Frame-validity classifier artifact (JSON); without it every frame is
    /// accepted
    #[arg(long)]
    classifier: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calibrate a region from a single clean frame
    Setup {
        /// Stable fingerprint naming the region
        #[arg(short, long)]
        fingerprint: String,

        /// Captured frame image
        frame: PathBuf,
    },
    /// Recognize the identifier over a batch of operational frames
    Apply {
        /// Stable fingerprint naming the region
        #[arg(short, long)]
        fingerprint: String,

        /// Selection-gap threshold reported by setup
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Captured frame images
        #[arg(required = true)]
        frames: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = load_or_default_config(args.config.as_deref())?;
    let patterns = compile_patterns(&config);
    let store = CalibrationStore::new(&store_dir(args.store)?)?;
    let ocr = Box::new(TesseractOcr::new(config.ocr_timeout()));
    let classifier = load_classifier(args.classifier.as_deref());

    let pipeline = RecognitionPipeline::new(config, patterns, store, ocr, classifier);

    match args.command {
        Command::Setup { fingerprint, frame } => {
            let frame = CaptureFrame::from_file(&frame)?;
            let outcome = pipeline.run(
                &fingerprint,
                Request::Setup {
                    frames: vec![frame],
                },
            )?;
            if let Outcome::Setup { text, threshold } = outcome {
                info!(threshold, "pass the threshold to apply runs with --threshold");
                println!("{text}");
            }
        }
        Command::Apply {
            fingerprint,
            threshold,
            frames,
        } => {
            let frames = frames
                .iter()
                .map(|path| {
                    CaptureFrame::from_file(path).map(|frame| match threshold {
                        Some(t) => ApplyFrame::with_threshold(frame, t),
                        None => ApplyFrame::new(frame),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = pipeline.run(&fingerprint, Request::Apply { frames })?;
            if let Outcome::Apply { text } = outcome {
                println!("{text}");
            }
        }
    }

    Ok(())
}

/// Load configuration from the given or default path, or fall back to
/// defaults.
fn load_or_default_config(path: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        return Ok(config);
    }
    if let Some(dirs) = ProjectDirs::from("", "", "idscan") {
        let default_path = dirs.config_dir().join("config.toml");
        if default_path.exists() {
            if let Ok(config) = config::load_config(&default_path) {
                info!(path = %default_path.display(), "loaded configuration");
                return Ok(config);
            }
            warn!(path = %default_path.display(), "unreadable configuration file ignored");
        }
    }
    info!("using default configuration");
    Ok(EngineConfig::default())
}

/// Compile the configured identifier grammar; a malformed grammar disables
/// correction instead of aborting.
fn compile_patterns(config: &EngineConfig) -> Option<Vec<Pattern>> {
    let spec = config.pattern.as_deref()?;
    match compile(spec) {
        Ok(patterns) => Some(patterns),
        Err(e) => {
            warn!(pattern = spec, error = %e, "pattern disabled");
            None
        }
    }
}

fn store_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let dirs = ProjectDirs::from("", "", "idscan")
        .context("no home directory available for the calibration store")?;
    Ok(dirs.data_dir().join("calibration"))
}

fn load_classifier(path: Option<&Path>) -> Box<dyn FrameClassifier> {
    let Some(path) = path else {
        return Box::new(AcceptAll);
    };
    match LinearSvm::load(path) {
        Ok(svm) => Box::new(svm),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "classifier unavailable, accepting all frames");
            Box::new(AcceptAll)
        }
    }
}
