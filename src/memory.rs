//! Process-local store backing the `memory` backend and the test suite.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::meals::repo::{needs_attention, MealFilter, MealRepo, MealSort, PageRequest};
use crate::meals::repo_types::Meal;
use crate::users::repo::{DuplicateEmail, UserRepo};
use crate::users::repo_types::{NewUser, Role, User, UserProfile};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    meals: RwLock<Vec<Meal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(DuplicateEmail.into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            profile: UserProfile::default(),
            is_active: true,
            last_login: None,
            doctor_id: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn list_patients_of(&self, doctor_id: Uuid) -> anyhow::Result<Vec<User>> {
        let mut patients: Vec<User> = self
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.role == Role::Patient && u.doctor_id == Some(doctor_id))
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(patients)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        profile: Option<UserProfile>,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(profile) = profile {
            user.profile = profile;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn assign_doctor(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        let Some(patient) = users
            .iter_mut()
            .find(|u| u.id == patient_id && u.role == Role::Patient)
        else {
            return Ok(None);
        };
        patient.doctor_id = Some(doctor_id);
        patient.updated_at = OffsetDateTime::now_utc();
        Ok(Some(patient.clone()))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.is_active = active;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl MealRepo for MemoryStore {
    async fn insert(&self, meal: &Meal) -> anyhow::Result<Meal> {
        let mut meals = self.meals.write().await;
        if meals.iter().any(|m| m.id == meal.id) {
            anyhow::bail!("duplicate meal id {}", meal.id);
        }
        meals.push(meal.clone());
        Ok(meal.clone())
    }

    async fn save(&self, meal: &Meal) -> anyhow::Result<Option<Meal>> {
        let mut meals = self.meals.write().await;
        let Some(slot) = meals.iter_mut().find(|m| m.id == meal.id) else {
            return Ok(None);
        };
        *slot = meal.clone();
        Ok(Some(meal.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Meal>> {
        Ok(self.meals.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Meal>> {
        Ok(self
            .meals
            .read()
            .await
            .iter()
            .find(|m| m.id == id && m.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: &MealFilter,
        sort: MealSort,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Meal>, i64)> {
        let mut matching: Vec<Meal> = self
            .meals
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id && filter.matches(m))
            .cloned()
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn recent(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Meal>> {
        let (items, _) = self
            .list(
                user_id,
                &MealFilter::default(),
                MealSort::CreatedAtDesc,
                PageRequest::new(1, limit),
            )
            .await?;
        Ok(items)
    }

    async fn in_range(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> anyhow::Result<Vec<Meal>> {
        let mut meals: Vec<Meal> = self
            .meals
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id && m.meal_date >= start && m.meal_date <= end)
            .cloned()
            .collect();
        meals.sort_by_key(|m| m.meal_date);
        Ok(meals)
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut meals = self.meals.write().await;
        let before = meals.len();
        meals.retain(|m| !(m.id == id && m.user_id == user_id));
        Ok(meals.len() != before)
    }

    async fn awaiting_review(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let mut meals: Vec<Meal> = self
            .meals
            .read()
            .await
            .iter()
            .filter(|m| {
                m.user_id == user_id
                    && m.created_at >= since
                    && needs_attention(m.doctor_review.status)
            })
            .cloned()
            .collect();
        meals.sort_by(|a, b| MealSort::CreatedAtDesc.compare(a, b));
        meals.truncate(limit.max(0) as usize);
        Ok(meals)
    }
}
