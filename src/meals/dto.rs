use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{
    AyurvedicProperties, ImageData, JournalEntry, Meal, MealType, Nutrition, Servings, Unit,
    VoiceData,
};
use crate::error::ApiError;

pub const MAX_FOOD_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 1000;
pub const MAX_LOCATION_LEN: usize = 100;

/// Writable meal fields. Create requires `food_name` and `quantity`; update
/// applies whatever is present.
#[derive(Debug, Default, Deserialize)]
pub struct MealInput {
    pub meal_type: Option<MealType>,
    pub food_name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub nutrition: Option<Nutrition>,
    pub ayurvedic_properties: Option<AyurvedicProperties>,
    pub image_data: Option<ImageData>,
    pub voice_data: Option<VoiceData>,
    pub journal_entry: Option<JournalEntry>,
    pub servings: Option<Servings>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub meal_date: Option<String>,
    pub location: Option<String>,
}

fn too_long(field: &str, max: usize) -> ApiError {
    ApiError::bad_request(format!("{field} cannot exceed {max} characters"))
}

fn check_len(value: Option<&str>, field: &str, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) if v.chars().count() > max => Err(too_long(field, max)),
        _ => Ok(()),
    }
}

impl MealInput {
    /// Validates the fields that are present.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.food_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::bad_request("Food name is required"));
            }
            if name.chars().count() > MAX_FOOD_NAME_LEN {
                return Err(too_long("Food name", MAX_FOOD_NAME_LEN));
            }
        }
        check_len(self.description.as_deref(), "Description", MAX_DESCRIPTION_LEN)?;
        check_len(self.location.as_deref(), "Location", MAX_LOCATION_LEN)?;

        if let Some(q) = self.quantity {
            if !q.is_finite() || q <= 0.0 {
                return Err(ApiError::bad_request("Quantity must be a positive number"));
            }
        }
        if let Some(field) = self.nutrition.as_ref().and_then(Nutrition::invalid_field) {
            return Err(ApiError::bad_request(format!(
                "nutrition.{field} must be a non-negative number"
            )));
        }
        if let Some(journal) = &self.journal_entry {
            if !(1..=10).contains(&journal.energy_level) {
                return Err(ApiError::bad_request("Energy level must be between 1 and 10"));
            }
            check_len(journal.notes.as_deref(), "Journal notes", MAX_NOTES_LEN)?;
        }
        if let Some(s) = &self.servings {
            let bad = |v: f64| !v.is_finite() || v < 0.0;
            if bad(s.planned) || bad(s.consumed) {
                return Err(ApiError::bad_request("Servings must be non-negative numbers"));
            }
        }
        if let Some(date) = &self.meal_date {
            parse_date(date, false)?;
        }
        Ok(())
    }

    /// Validates a create request, which additionally needs a name and a quantity.
    pub fn validate_new(&self) -> Result<(), ApiError> {
        if self.food_name.is_none() {
            return Err(ApiError::bad_request("Food name is required"));
        }
        if self.quantity.is_none() {
            return Err(ApiError::bad_request("Quantity is required"));
        }
        self.validate()
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (UTC). A bare date
/// resolves to the start of the day, or its last instant when `end_of_day` is set.
pub fn parse_date(value: &str, end_of_day: bool) -> Result<OffsetDateTime, ApiError> {
    let value = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(ts);
    }
    let invalid = || ApiError::bad_request(format!("Invalid date: {value}"));
    let date = Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| invalid())?;
    let dt = if end_of_day {
        date.with_hms_nano(23, 59, 59, 999_999_999)
    } else {
        date.with_hms(0, 0, 0)
    }
    .map_err(|_| invalid())?;
    Ok(dt.assume_utc())
}

pub fn parse_optional_date(
    value: Option<&str>,
    end_of_day: bool,
) -> Result<Option<OffsetDateTime>, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_date(v, end_of_day))
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMealsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub meal_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A meal as returned by the API, with its derived score.
#[derive(Debug, Serialize)]
pub struct MealView {
    #[serde(flatten)]
    pub meal: Meal,
    pub nutrition_score: f64,
}

impl From<Meal> for MealView {
    fn from(meal: Meal) -> Self {
        let nutrition_score = meal.nutrition.score();
        Self {
            meal,
            nutrition_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecentMeal {
    pub id: Uuid,
    pub food_name: String,
    pub meal_type: MealType,
    pub calories: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub meal_date: OffsetDateTime,
    pub image_url: Option<String>,
}

impl From<Meal> for RecentMeal {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            food_name: m.food_name,
            meal_type: m.meal_type,
            calories: m.nutrition.calories,
            meal_date: m.meal_date,
            image_url: m.image_data.map(|i| i.url),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionSummary {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub meal_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Period {
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub period: Period,
}

impl<T: Serialize> SummaryResponse<T> {
    pub fn new(data: T, period: Period) -> Self {
        Self {
            success: true,
            data,
            period,
        }
    }
}
