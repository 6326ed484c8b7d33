//! PostgreSQL event store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Row};

use super::EventStore;
use crate::error::PersistenceError;
use crate::models::{AnomalyEvent, EventFilter, Label, Meta, NewEvent, WindowSummary};

/// Advisory lock key serializing id/timestamp assignment across connections
/// (and across processes sharing the database).
const APPEND_LOCK_KEY: i64 = 0x1d5_e7e7;

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    timestamp: DateTime<Utc>,
    label: i16,
    score: Option<f64>,
    features: Json<Vec<f64>>,
    meta: Option<Json<Meta>>,
}

impl TryFrom<EventRow> for AnomalyEvent {
    type Error = PersistenceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(AnomalyEvent {
            id: row.id,
            timestamp: row.timestamp,
            label: Label::try_from(row.label).map_err(PersistenceError)?,
            score: row.score,
            features: row.features.0,
            meta: row.meta.map(|m| m.0),
        })
    }
}

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewEvent) -> Result<AnomalyEvent, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        // Released on commit/rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO anomaly_events (timestamp, label, score, features, meta)
            VALUES (
                GREATEST(clock_timestamp(), (SELECT MAX(timestamp) FROM anomaly_events)),
                $1, $2, $3, $4
            )
            RETURNING id, timestamp, label, score, features, meta
            "#
        )
        .bind(event.label.as_i16())
        .bind(event.score)
        .bind(Json(&event.features))
        .bind(event.meta.as_ref().map(Json))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnomalyEvent>, PersistenceError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, timestamp, label, score, features, meta
            FROM anomaly_events
            WHERE ($1::timestamptz IS NULL OR timestamp >= $1)
              AND ($2::timestamptz IS NULL OR timestamp <= $2)
              AND ($3::float8 IS NULL OR score >= $3)
              AND ($4::smallint IS NULL OR label = $4)
            ORDER BY timestamp DESC, id DESC
            LIMIT $5
            "#
        )
        .bind(filter.from_time)
        .bind(filter.to_time)
        .bind(filter.min_score)
        .bind(filter.label.map(Label::as_i16))
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AnomalyEvent::try_from).collect()
    }

    async fn summarize(&self, since: DateTime<Utc>) -> Result<WindowSummary, PersistenceError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE label = 1) AS anomalies,
                COALESCE(SUM(score), 0)::float8 AS score_sum
            FROM anomaly_events
            WHERE timestamp >= $1
            "#
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(WindowSummary {
            total: row.try_get("total")?,
            anomalies: row.try_get("anomalies")?,
            score_sum: row.try_get("score_sum")?,
        })
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM anomaly_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
