//! Window aggregator - trailing-window stats over the event store

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::PersistenceError;
use crate::models::{WindowSize, WindowStat};
use crate::store::EventStore;

pub struct WindowAggregator {
    store: Arc<dyn EventStore>,
}

impl WindowAggregator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Stats for the window ending now. An empty window yields zeros.
    pub async fn stats(&self, window: WindowSize) -> Result<WindowStat, PersistenceError> {
        self.stats_at(window, Utc::now()).await
    }

    pub async fn stats_at(
        &self,
        window: WindowSize,
        now: DateTime<Utc>,
    ) -> Result<WindowStat, PersistenceError> {
        let window_start = now - window.duration();
        let summary = self.store.summarize(window_start).await?;

        Ok(WindowStat::from_summary(window, window_start, now, summary))
    }
}
