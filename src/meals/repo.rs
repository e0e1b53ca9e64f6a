use std::cmp::Ordering;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Meal, MealRow, MealType, ReviewStatus};

/// Optional constraints applied to a user's meal list.
#[derive(Debug, Clone, Default)]
pub struct MealFilter {
    pub meal_type: Option<MealType>,
    /// Inclusive lower bound on `meal_date`.
    pub start: Option<OffsetDateTime>,
    /// Inclusive upper bound on `meal_date`.
    pub end: Option<OffsetDateTime>,
    /// Case-insensitive substring of `food_name` or `description`.
    pub search: Option<String>,
}

impl MealFilter {
    pub fn matches(&self, meal: &Meal) -> bool {
        if self.meal_type.is_some_and(|t| t != meal.meal_type) {
            return false;
        }
        if self.start.is_some_and(|s| meal.meal_date < s) {
            return false;
        }
        if self.end.is_some_and(|e| meal.meal_date > e) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_name = meal.food_name.to_lowercase().contains(&term);
            let in_desc = meal
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_desc {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MealSort {
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
    MealDateAsc,
    MealDateDesc,
    CaloriesAsc,
    CaloriesDesc,
}

impl MealSort {
    /// Accepts `field` or `-field` (descending) for createdAt, meal_date and calories.
    pub fn parse(s: &str) -> Option<Self> {
        let (desc, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let sort = match (field, desc) {
            ("createdAt" | "created_at", false) => MealSort::CreatedAtAsc,
            ("createdAt" | "created_at", true) => MealSort::CreatedAtDesc,
            ("meal_date" | "mealDate", false) => MealSort::MealDateAsc,
            ("meal_date" | "mealDate", true) => MealSort::MealDateDesc,
            ("calories", false) => MealSort::CaloriesAsc,
            ("calories", true) => MealSort::CaloriesDesc,
            _ => return None,
        };
        Some(sort)
    }

    fn order_by(self) -> &'static str {
        match self {
            MealSort::CreatedAtAsc => " ORDER BY created_at ASC, id ASC",
            MealSort::CreatedAtDesc => " ORDER BY created_at DESC, id DESC",
            MealSort::MealDateAsc => " ORDER BY meal_date ASC, id ASC",
            MealSort::MealDateDesc => " ORDER BY meal_date DESC, id DESC",
            MealSort::CaloriesAsc => " ORDER BY (nutrition->>'calories')::float8 ASC, id ASC",
            MealSort::CaloriesDesc => " ORDER BY (nutrition->>'calories')::float8 DESC, id DESC",
        }
    }

    pub fn compare(self, a: &Meal, b: &Meal) -> Ordering {
        let cal = |m: &Meal| m.nutrition.calories;
        match self {
            MealSort::CreatedAtAsc => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
            MealSort::CreatedAtDesc => b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)),
            MealSort::MealDateAsc => a.meal_date.cmp(&b.meal_date).then(a.id.cmp(&b.id)),
            MealSort::MealDateDesc => b.meal_date.cmp(&a.meal_date).then(b.id.cmp(&a.id)),
            MealSort::CaloriesAsc => cal(a).total_cmp(&cal(b)).then(a.id.cmp(&b.id)),
            MealSort::CaloriesDesc => cal(b).total_cmp(&cal(a)).then(b.id.cmp(&a.id)),
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const MAX_LIMIT: i64 = 100;
    /// Highest page whose offset still fits in an `i64`.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_LIMIT;

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, Self::MAX_PAGE),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[async_trait]
pub trait MealRepo: Send + Sync {
    async fn insert(&self, meal: &Meal) -> anyhow::Result<Meal>;
    /// Overwrites the stored meal with the same id; `None` if it no longer exists.
    async fn save(&self, meal: &Meal) -> anyhow::Result<Option<Meal>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Meal>>;
    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Meal>>;
    /// One page of meals plus the total count matching `filter`.
    async fn list(
        &self,
        user_id: Uuid,
        filter: &MealFilter,
        sort: MealSort,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Meal>, i64)>;
    async fn recent(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Meal>>;
    /// Meals with `meal_date` in `[start, end]`.
    async fn in_range(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> anyhow::Result<Vec<Meal>>;
    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
    /// Newest meals created since `since` whose review is pending or flagged.
    async fn awaiting_review(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<Meal>>;
}

pub(crate) fn needs_attention(status: ReviewStatus) -> bool {
    matches!(
        status,
        ReviewStatus::Pending | ReviewStatus::RequiresAttention
    )
}

const MEAL_COLUMNS: &str = "id, user_id, meal_type, food_name, description, quantity, unit, \
                            nutrition, ayurvedic_properties, image_data, voice_data, \
                            journal_entry, servings, doctor_review, tags, is_favorite, \
                            meal_date, location, created_at, updated_at";

pub struct PgMealRepo {
    db: PgPool,
}

impl PgMealRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &MealFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(t) = filter.meal_type {
        qb.push(" AND meal_type = ").push_bind(t.as_str());
    }
    if let Some(start) = filter.start {
        qb.push(" AND meal_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(" AND meal_date <= ").push_bind(end);
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (food_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn rows_into_meals(rows: Vec<MealRow>) -> anyhow::Result<Vec<Meal>> {
    rows.into_iter().map(Meal::try_from).collect()
}

#[async_trait]
impl MealRepo for PgMealRepo {
    async fn insert(&self, m: &Meal) -> anyhow::Result<Meal> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            INSERT INTO meals ({MEAL_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(m.id)
        .bind(m.user_id)
        .bind(m.meal_type.as_str())
        .bind(&m.food_name)
        .bind(&m.description)
        .bind(m.quantity)
        .bind(m.unit.as_str())
        .bind(Json(&m.nutrition))
        .bind(Json(&m.ayurvedic_properties))
        .bind(m.image_data.as_ref().map(Json))
        .bind(m.voice_data.as_ref().map(Json))
        .bind(m.journal_entry.as_ref().map(Json))
        .bind(Json(&m.servings))
        .bind(Json(&m.doctor_review))
        .bind(&m.tags)
        .bind(m.is_favorite)
        .bind(m.meal_date)
        .bind(&m.location)
        .bind(m.created_at)
        .bind(m.updated_at)
        .fetch_one(&self.db)
        .await
        .context("insert meal")?;
        row.try_into()
    }

    async fn save(&self, m: &Meal) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            UPDATE meals
               SET meal_type = $2, food_name = $3, description = $4, quantity = $5,
                   unit = $6, nutrition = $7, ayurvedic_properties = $8, image_data = $9,
                   voice_data = $10, journal_entry = $11, servings = $12,
                   doctor_review = $13, tags = $14, is_favorite = $15, meal_date = $16,
                   location = $17, updated_at = $18
             WHERE id = $1
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(m.id)
        .bind(m.meal_type.as_str())
        .bind(&m.food_name)
        .bind(&m.description)
        .bind(m.quantity)
        .bind(m.unit.as_str())
        .bind(Json(&m.nutrition))
        .bind(Json(&m.ayurvedic_properties))
        .bind(m.image_data.as_ref().map(Json))
        .bind(m.voice_data.as_ref().map(Json))
        .bind(m.journal_entry.as_ref().map(Json))
        .bind(Json(&m.servings))
        .bind(Json(&m.doctor_review))
        .bind(&m.tags)
        .bind(m.is_favorite)
        .bind(m.meal_date)
        .bind(&m.location)
        .bind(m.updated_at)
        .fetch_optional(&self.db)
        .await
        .context("update meal")?;
        row.map(Meal::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find meal")?;
        row.map(Meal::try_from).transpose()
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find meal for user")?;
        row.map(Meal::try_from).transpose()
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: &MealFilter,
        sort: MealSort,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Meal>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM meals");
        push_filters(&mut count_qb, user_id, filter);
        let (total,) = count_qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.db)
            .await
            .context("count meals")?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {MEAL_COLUMNS} FROM meals"));
        push_filters(&mut qb, user_id, filter);
        qb.push(sort.order_by());
        qb.push(" LIMIT ").push_bind(page.limit);
        qb.push(" OFFSET ").push_bind(page.offset());
        let rows = qb
            .build_query_as::<MealRow>()
            .fetch_all(&self.db)
            .await
            .context("list meals")?;

        Ok((rows_into_meals(rows)?, total))
    }

    async fn recent(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
              FROM meals
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("recent meals")?;
        rows_into_meals(rows)
    }

    async fn in_range(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
              FROM meals
             WHERE user_id = $1 AND meal_date >= $2 AND meal_date <= $3
             ORDER BY meal_date ASC
            "#
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("meals in range")?;
        rows_into_meals(rows)
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete meal")?;
        Ok(res.rows_affected() > 0)
    }

    async fn awaiting_review(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
              FROM meals
             WHERE user_id = $1
               AND created_at >= $2
               AND doctor_review->>'status' IN ($3, $4)
             ORDER BY created_at DESC
             LIMIT $5
            "#
        ))
        .bind(user_id)
        .bind(since)
        .bind(ReviewStatus::Pending.as_str())
        .bind(ReviewStatus::RequiresAttention.as_str())
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("meals awaiting review")?;
        rows_into_meals(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_accepts_prefixed_fields() {
        assert_eq!(MealSort::parse("-createdAt"), Some(MealSort::CreatedAtDesc));
        assert_eq!(MealSort::parse("createdAt"), Some(MealSort::CreatedAtAsc));
        assert_eq!(MealSort::parse("-meal_date"), Some(MealSort::MealDateDesc));
        assert_eq!(MealSort::parse("calories"), Some(MealSort::CaloriesAsc));
        assert_eq!(MealSort::parse("password"), None);
        assert_eq!(MealSort::default(), MealSort::CreatedAtDesc);
    }

    #[test]
    fn page_request_clamps_inputs() {
        let p = PageRequest::new(0, 1000);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, PageRequest::MAX_LIMIT);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn huge_pages_do_not_overflow_the_offset() {
        let p = PageRequest::new(i64::MAX, 100);
        assert_eq!(p.page, PageRequest::MAX_PAGE);
        assert!(p.offset() >= 0);
        assert_eq!(p.offset(), (PageRequest::MAX_PAGE - 1) * 100);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("dal"), "dal");
    }

    #[test]
    fn only_pending_and_flagged_need_attention() {
        assert!(needs_attention(ReviewStatus::Pending));
        assert!(needs_attention(ReviewStatus::RequiresAttention));
        assert!(!needs_attention(ReviewStatus::Reviewed));
        assert!(!needs_attention(ReviewStatus::Approved));
    }
}
