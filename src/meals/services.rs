use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{
    dto::{parse_date, parse_optional_date, DateRangeQuery, MealInput, NutritionSummary, Period},
    repo_types::{DoctorReview, Meal, MealType, Nutrition},
};
use crate::{error::ApiError, nutrition::NutritionAnalyzer};

pub const SUMMARY_WINDOW_DAYS: i64 = 30;

fn clean(s: String) -> String {
    s.trim().to_string()
}

fn clean_opt(s: Option<String>) -> Option<String> {
    s.map(clean).filter(|v| !v.is_empty())
}

/// Builds a new meal owned by `user_id` from a validated create request.
pub fn new_meal(user_id: Uuid, input: MealInput, now: OffsetDateTime) -> Result<Meal, ApiError> {
    let meal_date = match input.meal_date.as_deref() {
        Some(d) => parse_date(d, false)?,
        None => now,
    };
    let mut servings = input.servings.unwrap_or_default();
    servings.recompute();

    Ok(Meal {
        id: Uuid::new_v4(),
        user_id,
        meal_type: input.meal_type.unwrap_or_default(),
        food_name: input.food_name.map(clean).unwrap_or_default(),
        description: clean_opt(input.description),
        quantity: input.quantity.unwrap_or(1.0),
        unit: input.unit.unwrap_or_default(),
        nutrition: input.nutrition.unwrap_or_default(),
        ayurvedic_properties: input.ayurvedic_properties.unwrap_or_default(),
        image_data: input.image_data,
        voice_data: input.voice_data,
        journal_entry: input.journal_entry,
        servings,
        doctor_review: DoctorReview::default(),
        tags: input.tags.unwrap_or_default(),
        is_favorite: input.is_favorite.unwrap_or(false),
        meal_date,
        location: clean_opt(input.location),
        created_at: now,
        updated_at: now,
    })
}

/// Overlays the analyzer's facts. Fields the analyzer leaves at zero keep the
/// caller's value.
fn merge_nutrition(given: Nutrition, analyzed: Nutrition) -> Nutrition {
    let pick = |a: f64, g: f64| if a > 0.0 { a } else { g };
    Nutrition {
        calories: analyzed.calories,
        protein: analyzed.protein,
        carbohydrates: analyzed.carbohydrates,
        fat: analyzed.fat,
        fiber: pick(analyzed.fiber, given.fiber),
        sugar: pick(analyzed.sugar, given.sugar),
        sodium: pick(analyzed.sodium, given.sodium),
    }
}

/// Runs the analyzer when the meal arrived without calories.
pub async fn fill_nutrition(meal: &mut Meal, analyzer: &dyn NutritionAnalyzer) {
    if meal.nutrition.calories > 0.0 {
        return;
    }
    let analysis = analyzer
        .analyze(&meal.food_name, meal.quantity, meal.unit)
        .await;
    debug!(food_name = %meal.food_name, calories = analysis.nutrition.calories, "nutrition analyzed");
    meal.nutrition = merge_nutrition(meal.nutrition, analysis.nutrition);
    if let Some(tag) = analysis.known_tag() {
        if !meal.tags.iter().any(|t| t == tag) {
            meal.tags.push(tag.to_string());
        }
    }
}

/// Applies a validated partial update; servings are recomputed.
pub fn apply_update(meal: &mut Meal, input: MealInput, now: OffsetDateTime) -> Result<(), ApiError> {
    if let Some(v) = input.meal_type {
        meal.meal_type = v;
    }
    if let Some(v) = input.food_name {
        meal.food_name = clean(v);
    }
    if let Some(v) = input.description {
        meal.description = clean_opt(Some(v));
    }
    if let Some(v) = input.quantity {
        meal.quantity = v;
    }
    if let Some(v) = input.unit {
        meal.unit = v;
    }
    if let Some(v) = input.nutrition {
        meal.nutrition = v;
    }
    if let Some(v) = input.ayurvedic_properties {
        meal.ayurvedic_properties = v;
    }
    if let Some(v) = input.image_data {
        meal.image_data = Some(v);
    }
    if let Some(v) = input.voice_data {
        meal.voice_data = Some(v);
    }
    if let Some(v) = input.journal_entry {
        meal.journal_entry = Some(v);
    }
    if let Some(v) = input.servings {
        meal.servings = v;
    }
    if let Some(v) = input.tags {
        meal.tags = v;
    }
    if let Some(v) = input.is_favorite {
        meal.is_favorite = v;
    }
    if let Some(v) = input.meal_date.as_deref() {
        meal.meal_date = parse_date(v, false)?;
    }
    if let Some(v) = input.location {
        meal.location = clean_opt(Some(v));
    }
    meal.servings.recompute();
    meal.updated_at = now;
    Ok(())
}

/// Resolves the summary window, defaulting to the last 30 days.
pub fn summary_period(q: &DateRangeQuery, now: OffsetDateTime) -> Result<Period, ApiError> {
    let start = parse_optional_date(q.start_date.as_deref(), false)?
        .unwrap_or(now - Duration::days(SUMMARY_WINDOW_DAYS));
    let end = parse_optional_date(q.end_date.as_deref(), true)?.unwrap_or(now);
    if start > end {
        return Err(ApiError::bad_request("start_date must not be after end_date"));
    }
    Ok(Period {
        start_date: start,
        end_date: end,
    })
}

pub fn summarize(meals: &[Meal]) -> NutritionSummary {
    meals.iter().fold(NutritionSummary::default(), |mut s, m| {
        s.total_calories += m.nutrition.calories;
        s.total_protein += m.nutrition.protein;
        s.total_carbs += m.nutrition.carbohydrates;
        s.total_fat += m.nutrition.fat;
        s.meal_count += 1;
        s
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealTypeBreakdown {
    pub meal_type: MealType,
    pub count: i64,
    pub avg_calories: f64,
    pub total_calories: f64,
}

/// Per-type counts and calories, in [`MealType::ALL`] order, skipping absent types.
pub fn breakdown_by_meal_type(meals: &[Meal]) -> Vec<MealTypeBreakdown> {
    MealType::ALL
        .iter()
        .filter_map(|&meal_type| {
            let (count, total) = meals
                .iter()
                .filter(|m| m.meal_type == meal_type)
                .fold((0i64, 0.0), |(c, t), m| (c + 1, t + m.nutrition.calories));
            (count > 0).then(|| MealTypeBreakdown {
                meal_type,
                count,
                avg_calories: ((total / count as f64) * 10.0).round() / 10.0,
                total_calories: total,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::repo_types::{Servings, Unit};
    use crate::nutrition::LocalNutrition;
    use time::macros::datetime;

    fn input(json: &str) -> MealInput {
        serde_json::from_str(json).unwrap()
    }

    fn meal(meal_type: MealType, calories: f64) -> Meal {
        let mut m = new_meal(
            Uuid::new_v4(),
            input(r#"{"food_name": "x", "quantity": 1}"#),
            datetime!(2024-05-01 12:00 UTC),
        )
        .unwrap();
        m.meal_type = meal_type;
        m.nutrition.calories = calories;
        m
    }

    #[test]
    fn new_meal_applies_defaults() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let m = new_meal(Uuid::new_v4(), input(r#"{"food_name": "  Dal  ", "quantity": 2}"#), now)
            .unwrap();
        assert_eq!(m.food_name, "Dal");
        assert_eq!(m.meal_type, MealType::Other);
        assert_eq!(m.unit, Unit::Serving);
        assert_eq!(m.meal_date, now);
        assert_eq!(m.servings, Servings { planned: 1.0, consumed: 1.0, remaining: 0.0 });
    }

    #[tokio::test]
    async fn missing_calories_are_analyzed() {
        let mut m = new_meal(
            Uuid::new_v4(),
            input(r#"{"food_name": "rice", "quantity": 200, "nutrition": {"fiber": 9}}"#),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        fill_nutrition(&mut m, &LocalNutrition).await;
        assert_eq!(m.nutrition.calories, 260.0);
        assert_eq!(m.nutrition.fiber, 0.8);
    }

    #[tokio::test]
    async fn given_calories_skip_analysis() {
        let mut m = new_meal(
            Uuid::new_v4(),
            input(r#"{"food_name": "rice", "quantity": 200, "nutrition": {"calories": 10}}"#),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        fill_nutrition(&mut m, &LocalNutrition).await;
        assert_eq!(m.nutrition.calories, 10.0);
        assert_eq!(m.nutrition.protein, 0.0);
    }

    #[test]
    fn update_recomputes_remaining_servings() {
        let mut m = meal(MealType::Lunch, 100.0);
        let now = datetime!(2024-05-02 12:00 UTC);
        apply_update(&mut m, input(r#"{"servings": {"planned": 3, "consumed": 1}}"#), now).unwrap();
        assert_eq!(m.servings.remaining, 2.0);
        assert_eq!(m.updated_at, now);
        assert_eq!(m.meal_type, MealType::Lunch);
    }

    #[test]
    fn summary_defaults_to_last_thirty_days() {
        let now = datetime!(2024-05-31 00:00 UTC);
        let p = summary_period(&DateRangeQuery::default(), now).unwrap();
        assert_eq!(p.start_date, datetime!(2024-05-01 00:00 UTC));
        assert_eq!(p.end_date, now);

        let q = DateRangeQuery {
            start_date: Some("2024-06-02".into()),
            end_date: Some("2024-06-01".into()),
        };
        assert!(summary_period(&q, now).is_err());
    }

    #[test]
    fn summarize_totals_meals() {
        let mut a = meal(MealType::Lunch, 300.0);
        a.nutrition.protein = 20.0;
        let b = meal(MealType::Dinner, 500.0);
        let s = summarize(&[a, b]);
        assert_eq!(s.total_calories, 800.0);
        assert_eq!(s.total_protein, 20.0);
        assert_eq!(s.meal_count, 2);
        assert_eq!(summarize(&[]), NutritionSummary::default());
    }

    #[test]
    fn breakdown_groups_by_meal_type() {
        let meals = [
            meal(MealType::Lunch, 300.0),
            meal(MealType::Breakfast, 200.0),
            meal(MealType::Lunch, 401.0),
        ];
        let b = breakdown_by_meal_type(&meals);
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].meal_type, MealType::Breakfast);
        assert_eq!(b[1].count, 2);
        assert_eq!(b[1].total_calories, 701.0);
        assert_eq!(b[1].avg_calories, 350.5);
    }
}
