use axum::{
    extract::State,
    Json,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    AssignPatientRequest, PatientAttention, PatientMealsQuery, PatientNutritionSummary,
    ReviewRequest,
};
use crate::{
    auth::DoctorUser,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery},
    meals::{
        dto::{parse_optional_date, DateRangeQuery, MealView},
        repo::{MealFilter, MealSort, PageRequest},
        services,
    },
    response::{ApiResponse, PageInfo, PagedResponse},
    state::AppState,
    users::repo_types::{Role, User},
};

pub const ATTENTION_WINDOW_DAYS: i64 = 7;
pub const ATTENTION_MEAL_LIMIT: i64 = 5;
const DEFAULT_PAGE_SIZE: i64 = 20;

fn is_patient_of(user: &User, doctor_id: Uuid) -> bool {
    user.role == Role::Patient && user.doctor_id == Some(doctor_id)
}

/// Loads a patient assigned to `doctor_id`; anything else is a 404.
async fn assigned_patient(state: &AppState, doctor_id: Uuid, patient_id: Uuid) -> ApiResult<User> {
    state
        .users
        .find_by_id(patient_id)
        .await?
        .filter(|p| is_patient_of(p, doctor_id))
        .ok_or_else(|| {
            warn!(%doctor_id, %patient_id, "patient not assigned to doctor");
            ApiError::not_found("Patient not found or not assigned to you")
        })
}

#[instrument(skip(state, doctor), fields(doctor_id = %doctor.id))]
pub async fn patients_requiring_attention(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
) -> ApiResult<Json<ApiResponse<Vec<PatientAttention>>>> {
    let since = OffsetDateTime::now_utc() - Duration::days(ATTENTION_WINDOW_DAYS);
    let mut flagged = Vec::new();
    for patient in state.users.list_patients_of(doctor.id).await? {
        let meals = state
            .meals
            .awaiting_review(patient.id, since, ATTENTION_MEAL_LIMIT)
            .await?;
        if let Some(latest) = meals.first() {
            let last_meal_date = latest.created_at;
            flagged.push(PatientAttention {
                recent_meals_requiring_attention: meals.len(),
                last_meal_date,
                patient,
            });
        }
    }
    Ok(Json(ApiResponse::ok(flagged)))
}

#[instrument(skip(state, doctor), fields(doctor_id = %doctor.id))]
pub async fn patient_meals(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
    AppPath(patient_id): AppPath<Uuid>,
    AppQuery(q): AppQuery<PatientMealsQuery>,
) -> ApiResult<Json<PagedResponse<MealView>>> {
    let patient = assigned_patient(&state, doctor.id, patient_id).await?;

    let filter = MealFilter {
        start: parse_optional_date(q.start_date.as_deref(), false)?,
        end: parse_optional_date(q.end_date.as_deref(), true)?,
        ..Default::default()
    };
    let page = PageRequest::new(q.page.unwrap_or(1), q.limit.unwrap_or(DEFAULT_PAGE_SIZE));
    let (meals, total) = state
        .meals
        .list(patient.id, &filter, MealSort::MealDateDesc, page)
        .await?;

    Ok(Json(PagedResponse::new(
        meals.into_iter().map(MealView::from).collect(),
        PageInfo::new(page.page, page.limit, total),
    )))
}

#[instrument(skip(state, doctor), fields(doctor_id = %doctor.id))]
pub async fn patient_nutrition_summary(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
    AppPath(patient_id): AppPath<Uuid>,
    AppQuery(q): AppQuery<DateRangeQuery>,
) -> ApiResult<Json<ApiResponse<PatientNutritionSummary>>> {
    let patient = assigned_patient(&state, doctor.id, patient_id).await?;
    let period = services::summary_period(&q, OffsetDateTime::now_utc())?;
    let meals = state
        .meals
        .in_range(patient.id, period.start_date, period.end_date)
        .await?;

    Ok(Json(ApiResponse::ok(PatientNutritionSummary {
        summary: services::summarize(&meals),
        meal_type_breakdown: services::breakdown_by_meal_type(&meals),
        period,
    })))
}

#[instrument(skip(state, doctor, payload), fields(doctor_id = %doctor.id))]
pub async fn assign_patient(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
    AppJson(payload): AppJson<AssignPatientRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let patient_id = payload
        .patient_id
        .ok_or_else(|| ApiError::bad_request("Patient ID is required"))?;

    let patient = state
        .users
        .assign_doctor(patient_id, doctor.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient not found"))?;

    info!(%patient_id, "patient assigned");
    Ok(Json(ApiResponse::with_message(
        patient,
        "Patient assigned successfully",
    )))
}

#[instrument(skip(state, doctor, payload), fields(doctor_id = %doctor.id))]
pub async fn review_meal(
    State(state): State<AppState>,
    DoctorUser(doctor): DoctorUser,
    AppPath(meal_id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReviewRequest>,
) -> ApiResult<Json<ApiResponse<MealView>>> {
    let mut meal = state
        .meals
        .find_by_id(meal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;

    let owner = state.users.find_by_id(meal.user_id).await?;
    if !owner.is_some_and(|o| is_patient_of(&o, doctor.id)) {
        warn!(%meal_id, "review of a meal outside the doctor's patients");
        return Err(ApiError::forbidden(
            "You are not authorized to review this meal",
        ));
    }

    let now = OffsetDateTime::now_utc();
    meal.doctor_review = payload.into_review(doctor.id, now)?;
    meal.updated_at = now;
    let meal = state
        .meals
        .save(&meal)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;

    info!(%meal_id, status = %meal.doctor_review.status, "meal reviewed");
    Ok(Json(ApiResponse::with_message(
        meal.into(),
        "Meal reviewed successfully",
    )))
}
