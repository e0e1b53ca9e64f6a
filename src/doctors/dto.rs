use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::ApiError,
    meals::{
        dto::{NutritionSummary, Period},
        repo_types::{DoctorReview, ReviewStatus},
        services::MealTypeBreakdown,
    },
    users::repo_types::User,
};

pub const DEFAULT_RATING: u8 = 3;

#[derive(Debug, Deserialize)]
pub struct AssignPatientRequest {
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub feedback: Option<String>,
    pub recommendations: Option<Vec<String>>,
    pub rating: Option<i64>,
    pub status: Option<ReviewStatus>,
}

impl ReviewRequest {
    /// The review this request records, with defaults for absent fields.
    pub fn into_review(self, doctor_id: Uuid, now: OffsetDateTime) -> Result<DoctorReview, ApiError> {
        let rating = match self.rating {
            None => DEFAULT_RATING,
            Some(r @ 1..=5) => r as u8,
            Some(_) => return Err(ApiError::bad_request("Rating must be between 1 and 5")),
        };
        Ok(DoctorReview {
            reviewed_by: Some(doctor_id),
            review_date: Some(now),
            feedback: Some(self.feedback.unwrap_or_default()),
            recommendations: self.recommendations.unwrap_or_default(),
            rating: Some(rating),
            status: self.status.unwrap_or(ReviewStatus::Reviewed),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientMealsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientAttention {
    #[serde(flatten)]
    pub patient: User,
    pub recent_meals_requiring_attention: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_meal_date: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct PatientNutritionSummary {
    pub summary: NutritionSummary,
    pub meal_type_breakdown: Vec<MealTypeBreakdown>,
    pub period: Period,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn review_defaults() {
        let doctor = Uuid::new_v4();
        let now = datetime!(2024-05-01 9:00 UTC);
        let r = ReviewRequest::default().into_review(doctor, now).unwrap();
        assert_eq!(r.reviewed_by, Some(doctor));
        assert_eq!(r.review_date, Some(now));
        assert_eq!(r.feedback.as_deref(), Some(""));
        assert!(r.recommendations.is_empty());
        assert_eq!(r.rating, Some(3));
        assert_eq!(r.status, ReviewStatus::Reviewed);
    }

    #[test]
    fn rating_must_be_one_to_five() {
        let now = OffsetDateTime::now_utc();
        for bad in [0, 6, -1] {
            let req = ReviewRequest {
                rating: Some(bad),
                ..Default::default()
            };
            assert!(req.into_review(Uuid::new_v4(), now).is_err());
        }
        let req = ReviewRequest {
            rating: Some(5),
            status: Some(ReviewStatus::RequiresAttention),
            ..Default::default()
        };
        let r = req.into_review(Uuid::new_v4(), now).unwrap();
        assert_eq!(r.rating, Some(5));
        assert_eq!(r.status, ReviewStatus::RequiresAttention);
    }
}
