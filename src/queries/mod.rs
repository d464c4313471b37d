use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod lifecycle;
pub mod repo;

pub use lifecycle::Transition;
pub use repo::{Query, QueryStatus};

pub fn router() -> Router<AppState> {
    handlers::query_routes()
}
