//! Event ingestion and listing handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{AnomalyEvent, EventFilter, Label, Meta};
use super::extract::{ApiJson, ApiQuery};

#[derive(Debug, Deserialize, Validate)]
pub struct IngestRequest {
    // Same bound as config::MAX_FEATURE_DIM
    #[validate(length(min = 1, max = 100))]
    pub features: Vec<f64>,
    pub meta: Option<Meta>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: i64,
    pub label: Label,
    pub score: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub meta: Option<Meta>,
}

impl From<AnomalyEvent> for IngestResponse {
    fn from(event: AnomalyEvent) -> Self {
        Self {
            id: event.id,
            label: event.label,
            score: event.score,
            timestamp: event.timestamp,
            meta: event.meta,
        }
    }
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Validate)]
pub struct EventsQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: i64,
    pub min_score: Option<f64>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
    pub label: Option<Label>,
}

impl From<EventsQuery> for EventFilter {
    fn from(q: EventsQuery) -> Self {
        EventFilter {
            from_time: q.from_time,
            to_time: q.to_time,
            min_score: q.min_score,
            label: q.label,
            limit: q.limit,
        }
    }
}

/// Classify, store and broadcast one feature vector
pub async fn ingest(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<IngestRequest>,
) -> AppResult<Json<IngestResponse>> {
    req.validate()?;

    let event = state.pipeline.ingest(req.features, req.meta).await?;

    Ok(Json(event.into()))
}

/// List events, newest first
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventsQuery>,
) -> AppResult<Json<Vec<AnomalyEvent>>> {
    query.validate()?;

    if let Some(score) = query.min_score {
        if !score.is_finite() {
            return Err(AppError::ValidationError("min_score must be a finite number".to_string()));
        }
    }

    let events = state.store.query(&query.into()).await?;
    Ok(Json(events))
}
