//! Event store - append-only log of classified events
//!
//! Two backends share one contract:
//!
//! - [`PgEventStore`]: PostgreSQL, used in deployment
//! - [`MemoryEventStore`]: in-process, for local runs and tests
//!
//! Both assign `id` and `timestamp` at a single serialization point, so ids
//! are strictly increasing and timestamps never decrease with id.

mod memory;
mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PersistenceError;
use crate::models::{AnomalyEvent, EventFilter, NewEvent, WindowSummary};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Assign id + timestamp and persist. All-or-nothing.
    async fn append(&self, event: NewEvent) -> Result<AnomalyEvent, PersistenceError>;

    /// Filtered range query, newest first (timestamp desc, then id desc).
    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnomalyEvent>, PersistenceError>;

    /// Counts and score sum over events with `timestamp >= since`.
    async fn summarize(&self, since: DateTime<Utc>) -> Result<WindowSummary, PersistenceError>;

    /// Total stored events.
    async fn count(&self) -> Result<i64, PersistenceError>;

    /// Backend name for logs and /health.
    fn backend(&self) -> &'static str;
}
