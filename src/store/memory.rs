//! In-process event store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::EventStore;
use crate::error::PersistenceError;
use crate::models::{AnomalyEvent, EventFilter, NewEvent, WindowSummary};

/// Events kept in a `Vec` in id order. Appends take the write lock, which is
/// the single point where ids and timestamps are assigned.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<AnomalyEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored event in id order
    pub fn events(&self) -> Vec<AnomalyEvent> {
        self.events.read().clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<AnomalyEvent, PersistenceError> {
        let mut events = self.events.write();

        let id = events.last().map_or(1, |last| last.id + 1);
        let now = Utc::now();
        let timestamp = events
            .last()
            .map_or(now, |last| last.timestamp.max(now));

        let stored = AnomalyEvent {
            id,
            timestamp,
            label: event.label,
            score: event.score,
            features: event.features,
            meta: event.meta,
        };
        events.push(stored.clone());

        Ok(stored)
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnomalyEvent>, PersistenceError> {
        let limit = filter.effective_limit() as usize;
        let events = self.events.read();

        // Id order is also timestamp order, so reverse iteration is newest first.
        Ok(events
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn summarize(&self, since: DateTime<Utc>) -> Result<WindowSummary, PersistenceError> {
        let events = self.events.read();

        let summary = events
            .iter()
            .rev()
            .take_while(|e| e.timestamp >= since)
            .fold(WindowSummary::default(), |mut acc, e| {
                acc.total += 1;
                if e.label.is_anomaly() {
                    acc.anomalies += 1;
                }
                acc.score_sum += e.score.unwrap_or(0.0);
                acc
            });

        Ok(summary)
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        Ok(self.events.read().len() as i64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
