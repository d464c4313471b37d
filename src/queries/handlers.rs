use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    error::ApiError,
    queries::{
        dto::{AnswerRequest, AssignRequest, CreateQueryRequest, DismantleRequest},
        lifecycle,
        repo::Query,
    },
    state::AppState,
};

pub fn query_routes() -> Router<AppState> {
    Router::new()
        .route("/queries", post(create_query).get(list_queries))
        .route("/queries/:id", get(get_query))
        .route("/queries/:id/request", patch(request_query))
        .route("/queries/:id/assign", patch(assign_query))
        .route("/queries/:id/reassign", patch(reassign_query))
        .route("/queries/:id/answer", patch(answer_query))
        .route("/queries/:id/dismantle", patch(dismantle_query))
}

#[instrument(skip(state, payload))]
pub async fn create_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateQueryRequest>,
) -> Result<(StatusCode, Json<Query>), ApiError> {
    let query = lifecycle::create(
        &state,
        &actor,
        payload.title.as_deref(),
        payload.description.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(query)))
}

#[instrument(skip(state))]
pub async fn list_queries(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<Query>>, ApiError> {
    let queries = match actor.role {
        Role::Participant => Query::list_created_by(&state.db, actor.id).await?,
        Role::Admin | Role::TeamHead => Query::list_all(&state.db).await?,
    };
    Ok(Json(queries))
}

#[instrument(skip(state))]
pub async fn get_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Query>, ApiError> {
    let query = Query::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("query"))?;
    lifecycle::check_read_access(&actor, &query)?;
    Ok(Json(query))
}

#[instrument(skip(state))]
pub async fn request_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Query>, ApiError> {
    let query = lifecycle::request(&state, &actor, id).await?;
    Ok(Json(query))
}

#[instrument(skip(state, payload))]
pub async fn assign_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<AssignRequest>>,
) -> Result<Json<Query>, ApiError> {
    let team_head_id = payload.and_then(|Json(p)| p.team_head_id);
    let query = lifecycle::assign(&state, &actor, id, team_head_id).await?;
    Ok(Json(query))
}

#[instrument(skip(state, payload))]
pub async fn reassign_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<AssignRequest>>,
) -> Result<Json<Query>, ApiError> {
    let team_head_id = payload.and_then(|Json(p)| p.team_head_id);
    let query = lifecycle::reassign(&state, &actor, id, team_head_id).await?;
    Ok(Json(query))
}

#[instrument(skip(state, payload))]
pub async fn answer_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<AnswerRequest>>,
) -> Result<Json<Query>, ApiError> {
    let answer = payload.and_then(|Json(p)| p.answer);
    let query = lifecycle::answer(&state, &actor, id, answer.as_deref()).await?;
    Ok(Json(query))
}

#[instrument(skip(state, payload))]
pub async fn dismantle_query(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<DismantleRequest>>,
) -> Result<Json<Query>, ApiError> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let query = lifecycle::dismantle(&state, &actor, id, reason.as_deref()).await?;
    Ok(Json(query))
}
