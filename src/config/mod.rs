//! Engine Configuration
//!
//! Recognition settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Recognition engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Characters the OCR engine may emit
    #[serde(default = "default_whitelist")]
    pub whitelist: String,
    /// Identifier-format grammar, e.g. `[ZS]d(2,5)L(3)`; absent disables
    /// pattern-assisted correction
    #[serde(default)]
    pub pattern: Option<String>,
    /// Expected identifier length; Apply discards results of any other length
    #[serde(default)]
    pub expected_len: Option<usize>,
    /// Lateral offset in pixels between the selection box and the identifier
    #[serde(default = "default_offset")]
    pub offset: u32,
    /// Upper bound on a single OCR engine invocation, in seconds
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,
}

fn default_whitelist() -> String {
    "0123456789ABCDEFGHJKLMNPQRSTUVWXYZ".to_string()
}

fn default_offset() -> u32 {
    10
}

fn default_ocr_timeout_secs() -> u64 {
    20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            pattern: None,
            expected_len: None,
            offset: default_offset(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.whitelist, "0123456789ABCDEFGHJKLMNPQRSTUVWXYZ");
        assert_eq!(config.offset, 10);
        assert!(config.pattern.is_none());
        assert_eq!(config.ocr_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "pattern = \"[ZS]d(2,5)\"\nexpected_len = 8\n").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pattern.as_deref(), Some("[ZS]d(2,5)"));
        assert_eq!(config.expected_len, Some(8));
        assert_eq!(config.offset, 10);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EngineConfig::default();
        config.expected_len = Some(10);
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.expected_len, Some(10));
    }
}
