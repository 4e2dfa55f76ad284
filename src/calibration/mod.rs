//! Background-color calibration store
//!
//! One JSON file per capture-region fingerprint, holding every background
//! color observed during Setup. The list is append-only and preserves exact
//! duplicates; Apply reads it as a whitelist of known-good backgrounds.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Per-channel tolerance when matching a candidate background color.
pub const COLOR_TOLERANCE: u8 = 5;

/// On-disk record format: `{"backgroundColor": [[r,g,b], ...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationRecord {
    #[serde(rename = "backgroundColor")]
    background_colors: Vec<[u8; 3]>,
}

/// File-backed calibration store rooted at a directory.
///
/// Writes go through a temp file plus rename so a concurrent reader never
/// observes a half-written record; a store-wide mutex serializes the
/// read-modify-rewrite of [`record`](CalibrationStore::record).
pub struct CalibrationStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CalibrationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    /// Append `color` to the fingerprint's record, creating the record if it
    /// does not exist. Exact duplicates are preserved.
    pub fn record(&self, fingerprint: &str, color: [u8; 3]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let path = self.path(fingerprint);
        let mut record = read_record(&path)?.unwrap_or(CalibrationRecord {
            background_colors: Vec::new(),
        });
        record.background_colors.push(color);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(serde_json::to_string(&record)?.as_bytes())?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(fingerprint, ?color, "recorded background color");
        Ok(())
    }

    /// True iff any stored color for the fingerprint is within `tolerance`
    /// of `color` on every channel. A missing record matches nothing.
    pub fn matches(
        &self,
        fingerprint: &str,
        color: [u8; 3],
        tolerance: u8,
    ) -> Result<bool, StoreError> {
        let Some(record) = read_record(&self.path(fingerprint))? else {
            return Ok(false);
        };
        Ok(record.background_colors.iter().any(|stored| {
            stored
                .iter()
                .zip(color.iter())
                .all(|(&a, &b)| a.abs_diff(b) <= tolerance)
        }))
    }

    /// Stored colors for a fingerprint, in recording order.
    pub fn colors(&self, fingerprint: &str) -> Result<Vec<[u8; 3]>, StoreError> {
        Ok(read_record(&self.path(fingerprint))?
            .map(|r| r.background_colors)
            .unwrap_or_default())
    }
}

fn read_record(path: &Path) -> Result<Option<CalibrationRecord>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CalibrationStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CalibrationStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_preserves_duplicates() {
        let (_dir, store) = store();
        store.record("region-a", [10, 10, 10]).unwrap();
        store.record("region-a", [10, 10, 10]).unwrap();
        assert_eq!(
            store.colors("region-a").unwrap(),
            vec![[10, 10, 10], [10, 10, 10]]
        );
    }

    #[test]
    fn test_matches_within_tolerance() {
        let (_dir, store) = store();
        store.record("region-a", [100, 120, 140]).unwrap();
        assert!(store
            .matches("region-a", [105, 115, 140], COLOR_TOLERANCE)
            .unwrap());
        assert!(!store
            .matches("region-a", [106, 120, 140], COLOR_TOLERANCE)
            .unwrap());
        // every channel must be close, not just some
        assert!(!store
            .matches("region-a", [100, 120, 200], COLOR_TOLERANCE)
            .unwrap());
    }

    #[test]
    fn test_missing_fingerprint_matches_nothing() {
        let (_dir, store) = store();
        assert!(!store.matches("unknown", [0, 0, 0], COLOR_TOLERANCE).unwrap());
        assert!(store.colors("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_fingerprints_are_isolated() {
        let (_dir, store) = store();
        store.record("a", [1, 2, 3]).unwrap();
        store.record("b", [9, 9, 9]).unwrap();
        assert_eq!(store.colors("a").unwrap(), vec![[1, 2, 3]]);
        assert_eq!(store.colors("b").unwrap(), vec![[9, 9, 9]]);
    }
}
