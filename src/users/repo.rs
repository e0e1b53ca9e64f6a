use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{NewUser, Role, User, UserProfile, UserRow};

/// Returned by [`UserRepo::create`] when the email is already taken.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct DuplicateEmail;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Every user, oldest first.
    async fn list_all(&self) -> anyhow::Result<Vec<User>>;
    /// Patients whose `doctor_id` is `doctor_id`, ordered by name.
    async fn list_patients_of(&self, doctor_id: Uuid) -> anyhow::Result<Vec<User>>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        profile: Option<UserProfile>,
    ) -> anyhow::Result<Option<User>>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()>;
    /// Sets the doctor of a patient; `None` when no patient has that id.
    async fn assign_doctor(&self, patient_id: Uuid, doctor_id: Uuid)
        -> anyhow::Result<Option<User>>;
    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, profile, is_active, \
                            last_login, doctor_id, created_at, updated_at";

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn rows_into_users(rows: Vec<UserRow>) -> anyhow::Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, profile)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(Json(UserProfile::default()))
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::Error::new(DuplicateEmail)
            } else {
                anyhow::Error::new(e).context("insert user")
            }
        })?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        rows_into_users(rows)
    }

    async fn list_patients_of(&self, doctor_id: Uuid) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE role = 'patient' AND doctor_id = $1
             ORDER BY name ASC
            "#
        ))
        .bind(doctor_id)
        .fetch_all(&self.db)
        .await
        .context("list patients of doctor")?;
        rows_into_users(rows)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        profile: Option<UserProfile>,
    ) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   profile = COALESCE($3, profile),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(profile.map(Json))
        .fetch_optional(&self.db)
        .await
        .context("update user profile")?;
        row.map(User::try_from).transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update password")?;
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("touch last_login")?;
        Ok(())
    }

    async fn assign_doctor(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET doctor_id = $2, updated_at = now()
             WHERE id = $1 AND role = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(patient_id)
        .bind(doctor_id)
        .bind(Role::Patient.as_str())
        .fetch_optional(&self.db)
        .await
        .context("assign doctor")?;
        row.map(User::try_from).transpose()
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET is_active = $2, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.db)
        .await
        .context("set user active flag")?;
        row.map(User::try_from).transpose()
    }
}
