use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::{AuthUser, Role},
    error::ApiError,
    state::AppState,
    stats::repo::{self, TeamHeadLoad, TeamHeadStats},
};

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/team-heads", get(team_heads_by_load))
        .route("/team-heads/stats", get(team_head_stats))
}

#[instrument(skip(state))]
pub async fn team_heads_by_load(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<TeamHeadLoad>>, ApiError> {
    actor.require(&[Role::Admin])?;
    let heads = repo::fetch_load(&state.db).await?;
    Ok(Json(repo::sort_by_load(heads)))
}

#[instrument(skip(state))]
pub async fn team_head_stats(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<TeamHeadStats>>, ApiError> {
    actor.require(&[Role::Admin])?;
    let counters = repo::fetch_counters(&state.db).await?;
    Ok(Json(repo::build_stats(counters)))
}
