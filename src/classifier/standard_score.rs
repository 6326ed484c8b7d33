//! Standard-score detector
//!
//! Scores a vector by the root-mean-square of its per-feature z-scores
//! against the means/stds of normal traffic stored in a JSON artifact.
//! The artifact is read once at startup and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Classification, Classifier};
use crate::error::{ClassificationError, ModelLoadError};
use crate::models::Label;

/// On-disk model format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorArtifact {
    pub name: String,
    pub feature_count: usize,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    /// Scores strictly above this are anomalies
    pub threshold: f64,
}

impl DetectorArtifact {
    fn validate(&self) -> Result<(), ModelLoadError> {
        if self.feature_count == 0 {
            return Err(ModelLoadError::Invalid("feature_count must be > 0".into()));
        }
        if self.means.len() != self.feature_count || self.stds.len() != self.feature_count {
            return Err(ModelLoadError::Invalid(format!(
                "expected {} means/stds, got {}/{}",
                self.feature_count,
                self.means.len(),
                self.stds.len()
            )));
        }
        if self.means.iter().any(|m| !m.is_finite()) {
            return Err(ModelLoadError::Invalid("means must be finite".into()));
        }
        if self.stds.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelLoadError::Invalid("stds must be finite and > 0".into()));
        }
        if !self.threshold.is_finite() {
            return Err(ModelLoadError::Invalid("threshold must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StandardScoreDetector {
    artifact: DetectorArtifact,
    fingerprint: String,
}

impl StandardScoreDetector {
    /// Load and validate the artifact at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let artifact: DetectorArtifact = serde_json::from_slice(&bytes)?;
        artifact.validate()?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let fingerprint = format!("{:x}", hasher.finalize());

        tracing::info!(
            "Model '{}' loaded from {} ({} features, threshold {}, sha256 {})",
            artifact.name,
            path.display(),
            artifact.feature_count,
            artifact.threshold,
            &fingerprint[..12]
        );

        Ok(Self { artifact, fingerprint })
    }

    pub fn from_artifact(artifact: DetectorArtifact) -> Result<Self, ModelLoadError> {
        artifact.validate()?;
        let bytes = serde_json::to_vec(&artifact)?;
        let fingerprint = format!("{:x}", Sha256::digest(&bytes));
        Ok(Self { artifact, fingerprint })
    }

    pub fn dimension(&self) -> usize {
        self.artifact.feature_count
    }

    fn score(&self, features: &[f64]) -> f64 {
        let sum_sq: f64 = features
            .iter()
            .zip(&self.artifact.means)
            .zip(&self.artifact.stds)
            .map(|((x, mean), std)| ((x - mean) / std).powi(2))
            .sum();
        (sum_sq / features.len() as f64).sqrt()
    }
}

impl Classifier for StandardScoreDetector {
    fn classify(&self, features: &[f64]) -> Result<Classification, ClassificationError> {
        if features.len() != self.artifact.feature_count {
            return Err(ClassificationError(format!(
                "model expects {} features, got {}",
                self.artifact.feature_count,
                features.len()
            )));
        }

        let score = self.score(features);
        if !score.is_finite() {
            return Err(ClassificationError("score is not finite".into()));
        }

        let label = if score > self.artifact.threshold {
            Label::Anomaly
        } else {
            Label::Normal
        };

        Ok(Classification::new(label, Some(score)))
    }

    fn name(&self) -> &str {
        &self.artifact.name
    }

    /// SHA-256 of the artifact bytes
    fn fingerprint(&self) -> Option<&str> {
        Some(&self.fingerprint)
    }
}
