use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        parse_optional_date, DateRangeQuery, ListMealsQuery, MealInput, MealView,
        NutritionSummary, RecentMeal, SummaryResponse,
    },
    repo::{MealFilter, MealSort, PageRequest},
    repo_types::MealType,
    services,
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery},
    response::{ApiResponse, MessageResponse, PageInfo, PagedResponse},
    state::AppState,
};

pub const RECENT_LIMIT: i64 = 3;
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Turns list query parameters into repository arguments; bad values are 400s.
pub fn list_params(q: &ListMealsQuery) -> ApiResult<(MealFilter, MealSort, PageRequest)> {
    let meal_type = match q.meal_type.as_deref().filter(|t| !t.is_empty()) {
        Some(t) => Some(
            MealType::parse(t)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid meal_type: {t}")))?,
        ),
        None => None,
    };
    let sort = match q.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => {
            MealSort::parse(s).ok_or_else(|| ApiError::bad_request(format!("Invalid sort: {s}")))?
        }
        None => MealSort::default(),
    };
    let filter = MealFilter {
        meal_type,
        start: parse_optional_date(q.start_date.as_deref(), false)?,
        end: parse_optional_date(q.end_date.as_deref(), true)?,
        search: q
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    };
    let page = PageRequest::new(q.page.unwrap_or(1), q.limit.unwrap_or(DEFAULT_PAGE_SIZE));
    Ok((filter, sort, page))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(q): AppQuery<ListMealsQuery>,
) -> ApiResult<Json<PagedResponse<MealView>>> {
    let (filter, sort, page) = list_params(&q)?;
    let (meals, total) = state.meals.list(user.id, &filter, sort, page).await?;
    let data = meals.into_iter().map(MealView::from).collect();
    Ok(Json(PagedResponse::new(
        data,
        PageInfo::new(page.page, page.limit, total),
    )))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn recent_meals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<RecentMeal>>>> {
    let meals = state.meals.recent(user.id, RECENT_LIMIT).await?;
    Ok(Json(ApiResponse::ok(
        meals.into_iter().map(RecentMeal::from).collect(),
    )))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn nutrition_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(q): AppQuery<DateRangeQuery>,
) -> ApiResult<Json<SummaryResponse<NutritionSummary>>> {
    let period = services::summary_period(&q, OffsetDateTime::now_utc())?;
    let meals = state
        .meals
        .in_range(user.id, period.start_date, period.end_date)
        .await?;
    Ok(Json(SummaryResponse::new(
        services::summarize(&meals),
        period,
    )))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ApiResponse<MealView>>> {
    let meal = state
        .meals
        .find_for_user(user.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;
    Ok(Json(ApiResponse::ok(meal.into())))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<MealInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MealView>>)> {
    input.validate_new()?;
    let mut meal = services::new_meal(user.id, input, OffsetDateTime::now_utc())?;
    services::fill_nutrition(&mut meal, state.nutrition.as_ref()).await;
    let meal = state.meals.insert(&meal).await?;

    info!(meal_id = %meal.id, food_name = %meal.food_name, "meal created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            meal.into(),
            "Meal created successfully",
        )),
    ))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<MealInput>,
) -> ApiResult<Json<ApiResponse<MealView>>> {
    input.validate()?;
    let mut meal = state
        .meals
        .find_for_user(user.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;

    services::apply_update(&mut meal, input, OffsetDateTime::now_utc())?;
    let meal = state.meals.save(&meal).await?.ok_or_else(|| {
        warn!(meal_id = %id, "meal vanished during update");
        ApiError::not_found("Meal not found")
    })?;

    info!(meal_id = %meal.id, "meal updated");
    Ok(Json(ApiResponse::with_message(
        meal.into(),
        "Meal updated successfully",
    )))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.meals.delete_for_user(user.id, id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    info!(meal_id = %id, "meal deleted");
    Ok(Json(MessageResponse::new("Meal deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_default_and_clamp() {
        let q = ListMealsQuery {
            limit: Some(500),
            page: Some(0),
            ..Default::default()
        };
        let (filter, sort, page) = list_params(&q).unwrap();
        assert!(filter.meal_type.is_none());
        assert_eq!(sort, MealSort::CreatedAtDesc);
        assert_eq!(page, PageRequest { page: 1, limit: 100 });
    }

    #[test]
    fn list_params_reject_unknown_sort_and_type() {
        let q = ListMealsQuery {
            sort: Some("-price".into()),
            ..Default::default()
        };
        assert!(list_params(&q).is_err());
        let q = ListMealsQuery {
            meal_type: Some("brunch".into()),
            ..Default::default()
        };
        assert!(list_params(&q).is_err());
    }

    #[test]
    fn list_params_parse_filters() {
        let q = ListMealsQuery {
            meal_type: Some("lunch".into()),
            sort: Some("calories".into()),
            search: Some("  dal ".into()),
            start_date: Some("2024-01-01".into()),
            ..Default::default()
        };
        let (filter, sort, _) = list_params(&q).unwrap();
        assert_eq!(filter.meal_type, Some(MealType::Lunch));
        assert_eq!(filter.search.as_deref(), Some("dal"));
        assert!(filter.start.is_some());
        assert_eq!(sort, MealSort::CaloriesAsc);
    }
}
