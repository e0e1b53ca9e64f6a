use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meals", get(handlers::list_meals).post(handlers::create_meal))
        .route("/meals/recent", get(handlers::recent_meals))
        .route("/meals/nutrition-summary", get(handlers::nutrition_summary))
        .route(
            "/meals/:id",
            get(handlers::get_meal)
                .put(handlers::update_meal)
                .delete(handlers::delete_meal),
        )
}
