use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod jwt;
mod password;
pub mod repo;
mod services;

pub use jwt::{Actor, AuthUser, Claims, JwtKeys};
pub use repo::{Role, User};
pub use services::bootstrap_admin;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
