//! Frame-validity classification
//!
//! A pretrained linear model decides per frame whether the cropped canonical
//! image actually shows an identifier line. The model is loaded once at
//! startup from a versioned JSON artifact; training is out of scope.

use std::path::Path;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ArtifactError, EngineError};

/// Accept/reject decision over a fixed-length feature vector.
pub trait FrameClassifier: Send + Sync {
    fn accept(&self, features: &[f32]) -> Result<bool, EngineError>;
}

/// Serialized artifact: `{"version": ..., "weights": [...], "bias": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmArtifact {
    pub version: String,
    pub weights: Vec<f32>,
    pub bias: f32,
}

/// Linear SVM decision function `w . x + b > 0`.
pub struct LinearSvm {
    version: String,
    weights: Array1<f32>,
    bias: f32,
}

impl LinearSvm {
    pub fn from_artifact(artifact: SvmArtifact) -> Result<Self, ArtifactError> {
        if artifact.weights.is_empty() {
            return Err(ArtifactError::Empty);
        }
        Ok(Self {
            version: artifact.version,
            weights: Array1::from(artifact.weights),
            bias: artifact.bias,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path)?;
        let artifact: SvmArtifact = serde_json::from_str(&content)?;
        let svm = Self::from_artifact(artifact)?;
        info!(version = %svm.version, features = svm.weights.len(), "loaded classifier artifact");
        Ok(svm)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl FrameClassifier for LinearSvm {
    fn accept(&self, features: &[f32]) -> Result<bool, EngineError> {
        if features.len() != self.weights.len() {
            return Err(EngineError::Invocation(format!(
                "feature vector length {} does not match classifier ({})",
                features.len(),
                self.weights.len()
            )));
        }
        let score = ArrayView1::from(features).dot(&self.weights) + self.bias;
        Ok(score > 0.0)
    }
}

/// Permissive fallback used when no classifier artifact is installed: every
/// frame passes through to the OCR engine.
pub struct AcceptAll;

impl FrameClassifier for AcceptAll {
    fn accept(&self, _features: &[f32]) -> Result<bool, EngineError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_linear_decision() {
        let svm = LinearSvm::from_artifact(SvmArtifact {
            version: "1".into(),
            weights: vec![1.0, -1.0],
            bias: -0.5,
        })
        .unwrap();
        assert!(svm.accept(&[2.0, 0.0]).unwrap());
        assert!(!svm.accept(&[0.0, 2.0]).unwrap());
    }

    #[test]
    fn test_length_mismatch_is_invocation_error() {
        let svm = LinearSvm::from_artifact(SvmArtifact {
            version: "1".into(),
            weights: vec![1.0, 2.0],
            bias: 0.0,
        })
        .unwrap();
        assert!(svm.accept(&[1.0]).is_err());
    }

    #[test]
    fn test_load_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"2024-05","weights":[0.1,0.2,0.3],"bias":-0.05}}"#
        )
        .unwrap();
        let svm = LinearSvm::load(file.path()).unwrap();
        assert_eq!(svm.version(), "2024-05");
    }

    #[test]
    fn test_empty_weights_rejected() {
        let err = LinearSvm::from_artifact(SvmArtifact {
            version: "1".into(),
            weights: vec![],
            bias: 0.0,
        });
        assert!(err.is_err());
    }
}
