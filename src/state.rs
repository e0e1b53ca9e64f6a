use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::hash_password,
    config::{AppConfig, JwtConfig, StoreKind},
    db,
    meals::repo::{MealRepo, PgMealRepo},
    memory::MemoryStore,
    nutrition::{LocalNutrition, NutritionAnalyzer, RemoteNutrition},
    storage::{MemoryStorage, Storage, StorageClient},
    users::{
        repo::{PgUserRepo, UserRepo},
        repo_types::{NewUser, Role},
    },
};

pub const DEMO_PASSWORD: &str = "password123";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub meals: Arc<dyn MealRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub nutrition: Arc<dyn NutritionAnalyzer>,
    /// Present only for the postgres store.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Self::from_config(config).await
    }

    pub async fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let (users, meals, db): (Arc<dyn UserRepo>, Arc<dyn MealRepo>, Option<PgPool>) =
            match (config.store, config.database_url.as_deref()) {
                (StoreKind::Postgres, Some(url)) => {
                    let pool = db::connect(url).await?;
                    db::migrate(&pool).await;
                    let users: Arc<dyn UserRepo> = Arc::new(PgUserRepo::new(pool.clone()));
                    let meals: Arc<dyn MealRepo> = Arc::new(PgMealRepo::new(pool.clone()));
                    (users, meals, Some(pool))
                }
                (StoreKind::Postgres, None) => {
                    anyhow::bail!("the postgres store needs DATABASE_URL")
                }
                (StoreKind::Memory, _) => {
                    let store = Arc::new(MemoryStore::new());
                    let users: Arc<dyn UserRepo> = store.clone();
                    let meals: Arc<dyn MealRepo> = store;
                    (users, meals, None)
                }
            };

        let storage: Arc<dyn StorageClient> = match &config.media {
            Some(media) => Arc::new(Storage::new(media).await?),
            None => {
                warn!("MINIO_ENDPOINT not set; uploads are kept in memory");
                Arc::new(MemoryStorage::new())
            }
        };

        let nutrition: Arc<dyn NutritionAnalyzer> = match &config.ai_service_url {
            Some(url) => {
                info!(%url, "using remote nutrition analysis");
                Arc::new(RemoteNutrition::new(url.clone())?)
            }
            None => Arc::new(LocalNutrition),
        };

        let state = Self {
            config,
            users,
            meals,
            storage,
            nutrition,
            db,
        };
        if state.config.seed_demo_users {
            state.seed_demo_users().await?;
        }
        info!(store = state.config.store.as_str(), "application state ready");
        Ok(state)
    }

    /// Creates the demo patient and doctor unless their emails are taken.
    pub async fn seed_demo_users(&self) -> anyhow::Result<()> {
        let demo = [
            ("Demo Patient", "patient@demo.com", Role::Patient),
            ("Demo Doctor", "doctor@demo.com", Role::Doctor),
        ];
        for (name, email, role) in demo {
            if self.users.find_by_email(email).await?.is_some() {
                continue;
            }
            self.users
                .create(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: hash_password(DEMO_PASSWORD)?,
                    role,
                })
                .await?;
            info!(%email, role = role.as_str(), "demo user seeded");
        }
        Ok(())
    }

    /// In-memory state for tests: memory store and storage, local nutrition, no demo users.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store: StoreKind::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            media: None,
            ai_service_url: None,
            seed_demo_users: false,
        });
        let store = Arc::new(MemoryStore::new());
        Self {
            config,
            users: store.clone(),
            meals: store,
            storage: Arc::new(MemoryStorage::new()),
            nutrition: Arc::new(LocalNutrition),
            db: None,
        }
    }

    /// Replaces the nutrition analyzer; used to point tests at a running stub.
    pub fn with_nutrition(mut self, nutrition: Arc<dyn NutritionAnalyzer>) -> Self {
        self.nutrition = nutrition;
        self
    }
}
