// handlers/protected/stats.rs - GET /api/stats

use axum::{extract::State, Json};

use crate::api::StatsSummary;
use crate::error::ApiError;
use crate::services::StatsService;
use crate::state::AppState;

/// GET /api/stats - aggregate summary over all battles
pub async fn battles_stats(State(state): State<AppState>) -> Result<Json<StatsSummary>, ApiError> {
    let summary = StatsService::new(state.store.as_ref(), state.config.stats.partial_failure)
        .summarize()
        .await?;
    Ok(Json(summary))
}
