// handlers/protected/battles.rs - GET /api/count, /api/list, /api/search

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::json;

use crate::database::models::{Battle, BattleField};
use crate::error::ApiError;
use crate::filter::{FilterData, SearchFilter};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/count - plain-text total, `Total Battles:- N`
pub async fn battles_count(State(state): State<AppState>) -> Result<String, ApiError> {
    let total = state.store.count(FilterData::default()).await?;
    Ok(format!("Total Battles:- {}", total))
}

/// GET /api/list - distinct non-null battle locations
pub async fn battles_list(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let locations = state
        .store
        .distinct(BattleField::Location, FilterData::default())
        .await?;
    Ok(Json(locations))
}

/// GET /api/search?king=&location=&type= - battles matching every given parameter
pub async fn battles_search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(search): Query<SearchFilter>,
) -> Result<Json<Vec<Battle>>, ApiError> {
    tracing::debug!(principal = %user.name, ?search, "Battle search");

    let filter = FilterData {
        where_clause: search.to_where(),
        order: Some(json!("battle_number asc")),
        ..Default::default()
    };
    let battles = state.store.select(filter).await?;
    Ok(Json(battles))
}
