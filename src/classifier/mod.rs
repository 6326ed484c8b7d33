//! Classifier - call boundary to the scoring function
//!
//! The pipeline only depends on the [`Classifier`] trait, so any detector
//! (the bundled [`StandardScoreDetector`], a remote scorer, a closure in tests)
//! can be swapped in without touching ingestion.

mod standard_score;

pub use standard_score::{DetectorArtifact, StandardScoreDetector};

use serde::Serialize;

use crate::error::ClassificationError;
use crate::models::Label;

/// Result of scoring one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: Label,
    /// Higher = more anomalous. No fixed scale.
    pub score: Option<f64>,
}

impl Classification {
    pub fn new(label: Label, score: Option<f64>) -> Self {
        Self { label, score }
    }
}

/// Synchronous, side-effect free scorer. May be slow; callers must not hold
/// locks across `classify`.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &[f64]) -> Result<Classification, ClassificationError>;

    fn name(&self) -> &str {
        "custom"
    }

    fn fingerprint(&self) -> Option<&str> {
        None
    }
}

impl<F> Classifier for F
where
    F: Fn(&[f64]) -> Result<Classification, ClassificationError> + Send + Sync,
{
    fn classify(&self, features: &[f64]) -> Result<Classification, ClassificationError> {
        self(features)
    }
}
