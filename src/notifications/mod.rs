use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod repo;

pub use repo::{Notification, NotificationKind};

pub fn router() -> Router<AppState> {
    handlers::notification_routes()
}
