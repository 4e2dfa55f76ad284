//! Tesseract CLI adapter for the [`LineOcr`] contract

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::EngineError;

use super::LineOcr;

/// How often the child process is polled while waiting for the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Invokes the `tesseract` binary in single-block page-segmentation mode and
/// reads back its `.txt` sidecar. A timeout is enforced by polling the child
/// and killing it on expiry; the source engine had none.
pub struct TesseractOcr {
    executable: PathBuf,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(timeout: Duration) -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            timeout,
        }
    }

    /// Override the executable path (e.g. a bundled binary).
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    fn wait_with_deadline(
        &self,
        child: &mut std::process::Child,
    ) -> Result<std::process::ExitStatus, EngineError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(timeout = ?self.timeout, "killing unresponsive OCR engine");
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Timeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl LineOcr for TesseractOcr {
    fn recognize_line(
        &self,
        image: &Path,
        whitelist: &str,
        legacy: bool,
    ) -> Result<String, EngineError> {
        // Tesseract writes <base>.txt next to the output base path
        let base = image.with_extension("");
        let sidecar = base.with_extension("txt");

        let mut cmd = Command::new(&self.executable);
        cmd.arg(image)
            .arg(&base)
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={whitelist}"))
            .args(["--psm", "6"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if legacy {
            cmd.args(["--oem", "0"]);
        }

        let mut child = cmd.spawn()?;
        let status = self.wait_with_deadline(&mut child)?;
        if !status.success() {
            return Err(EngineError::Invocation(format!(
                "tesseract exited with {status}"
            )));
        }

        let content = std::fs::read_to_string(&sidecar)?;
        let _ = std::fs::remove_file(&sidecar);

        let text = content
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .replace(' ', "");
        debug!(image = ?image, text = %text, "OCR engine result");
        Ok(text)
    }
}
