use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    notifications::repo::Notification,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", patch(mark_read))
        .route("/notifications/read-all", patch(mark_all_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<NotificationList>, ApiError> {
    let notifications = Notification::list_recent(&state.db, actor.id).await?;
    let unread_count = Notification::unread_count(&state.db, actor.id).await?;
    Ok(Json(NotificationList {
        notifications,
        unread_count,
    }))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = Notification::mark_read(&state.db, id, actor.id)
        .await?
        .ok_or(ApiError::NotFound("notification"))?;
    Ok(Json(notification))
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = Notification::mark_all_read(&state.db, actor.id).await?;
    Ok(Json(serde_json::json!({ "success": true, "updated": updated })))
}
