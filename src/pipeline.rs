//! Ingestion pipeline
//!
//! validate → classify → persist → broadcast. Each step is a hard sequence
//! point: a failure stops the call, and later steps never run.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classifier::{Classification, Classifier};
use crate::error::{ClassificationError, IngestError, PersistenceError, ValidationError};
use crate::hub::BroadcastHub;
use crate::models::{AnomalyEvent, Meta, NewEvent};
use crate::store::EventStore;

pub struct IngestionPipeline {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn EventStore>,
    hub: Arc<BroadcastHub>,
    feature_dim: usize,
    /// Held across append + publish so live order matches id order.
    commit_lock: Arc<Mutex<()>>,
}

impl IngestionPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn EventStore>,
        hub: Arc<BroadcastHub>,
        feature_dim: usize,
    ) -> Self {
        Self {
            classifier,
            store,
            hub,
            feature_dim,
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn classifier_fingerprint(&self) -> Option<&str> {
        self.classifier.fingerprint()
    }

    pub async fn ingest(
        &self,
        features: Vec<f64>,
        meta: Option<Meta>,
    ) -> Result<AnomalyEvent, IngestError> {
        self.validate(&features).map_err(|e| {
            tracing::debug!("Rejected feature vector: {}", e);
            e
        })?;

        let (features, classification) = self.classify(features).await.map_err(|e| {
            tracing::warn!("{}", e);
            e
        })?;

        let event = self
            .commit(NewEvent {
                label: classification.label,
                score: classification.score,
                features,
                meta,
            })
            .await
            .map_err(|e| {
                tracing::warn!("{}", e);
                e
            })?;

        tracing::debug!(
            "Ingested event {} ({}, score {:?})",
            event.id,
            event.label,
            event.score
        );
        Ok(event)
    }

    fn validate(&self, features: &[f64]) -> Result<(), ValidationError> {
        if features.len() != self.feature_dim {
            return Err(ValidationError(format!(
                "expected {} features, got {}",
                self.feature_dim,
                features.len()
            )));
        }
        if let Some(pos) = features.iter().position(|f| !f.is_finite()) {
            return Err(ValidationError(format!("feature {} is not a finite number", pos)));
        }
        Ok(())
    }

    /// Append + publish under the commit lock, on its own task.
    ///
    /// Dropping the caller's future only detaches the task: a stored event is
    /// always broadcast.
    async fn commit(&self, new_event: NewEvent) -> Result<AnomalyEvent, PersistenceError> {
        let store = Arc::clone(&self.store);
        let hub = Arc::clone(&self.hub);
        let commit_lock = Arc::clone(&self.commit_lock);

        tokio::spawn(async move {
            let _commit = commit_lock.lock_owned().await;
            let event = store.append(new_event).await?;
            hub.publish(&event);
            Ok::<_, PersistenceError>(event)
        })
        .await
        .map_err(|e| PersistenceError(format!("commit task failed: {}", e)))?
    }

    /// Runs the classifier on the blocking pool; no locks are held here.
    async fn classify(
        &self,
        features: Vec<f64>,
    ) -> Result<(Vec<f64>, Classification), ClassificationError> {
        let classifier = Arc::clone(&self.classifier);

        tokio::task::spawn_blocking(move || {
            let result = classifier.classify(&features);
            result.map(|c| (features, c))
        })
        .await
        .map_err(|e| ClassificationError(format!("classifier task failed: {}", e)))?
    }
}
