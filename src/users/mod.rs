use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users/refresh", post(handlers::refresh))
        .route(
            "/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/users/change-password", put(handlers::change_password))
        .route("/users/patients", get(handlers::list_patients))
        .route("/users/:id/status", patch(handlers::set_user_status))
}
