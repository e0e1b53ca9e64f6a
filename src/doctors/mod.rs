use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/doctors/patients/requiring-attention",
            get(handlers::patients_requiring_attention),
        )
        .route("/doctors/patients/assign", post(handlers::assign_patient))
        .route("/doctors/patients/:patient_id/meals", get(handlers::patient_meals))
        .route(
            "/doctors/patients/:patient_id/nutrition-summary",
            get(handlers::patient_nutrition_summary),
        )
        .route("/doctors/meals/:meal_id/review", post(handlers::review_meal))
}
