//! Window statistics handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::extract::ApiQuery;
use crate::{AppState, AppResult};
use crate::models::{WindowSize, WindowStat};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub window: Option<String>,
}

/// Aggregated stats over a trailing window (default 5m)
pub async fn get(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> AppResult<Json<WindowStat>> {
    let window: WindowSize = query.window.as_deref().unwrap_or("5m").parse()?;

    let stat = state.aggregator.stats(window).await?;
    Ok(Json(stat))
}
