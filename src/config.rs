use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

const DEV_JWT_SECRET: &str = "ayora-dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// S3-compatible bucket holding uploaded images and voice recordings.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Postgres => "postgres",
            StoreKind::Memory => "memory",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" | "in-memory" => Ok(StoreKind::Memory),
            other => anyhow::bail!("unknown AYORA_STORE value: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub media: Option<MediaConfig>,
    pub ai_service_url: Option<String>,
    pub seed_demo_users: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let store = match get("AYORA_STORE") {
            Some(v) => StoreKind::parse(&v)?,
            None if database_url.is_some() => StoreKind::Postgres,
            None => {
                warn!("DATABASE_URL not set; running with the in-memory store");
                StoreKind::Memory
            }
        };
        if store == StoreKind::Postgres && database_url.is_none() {
            anyhow::bail!("AYORA_STORE=postgres requires DATABASE_URL");
        }

        let secret = match (get("JWT_SECRET"), store) {
            (Some(s), _) => s,
            (None, StoreKind::Postgres) => {
                anyhow::bail!("JWT_SECRET must be set when using the postgres store")
            }
            (None, StoreKind::Memory) => {
                warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "ayora".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "ayora-users".into()),
            ttl_minutes: parse_or(&get, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parse_or(&get, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };

        let media = match get("MINIO_ENDPOINT") {
            Some(endpoint) => Some(MediaConfig {
                endpoint,
                bucket: get("MINIO_BUCKET").context("MINIO_BUCKET must be set with MINIO_ENDPOINT")?,
                access_key: get("MINIO_ACCESS_KEY")
                    .context("MINIO_ACCESS_KEY must be set with MINIO_ENDPOINT")?,
                secret_key: get("MINIO_SECRET_KEY")
                    .context("MINIO_SECRET_KEY must be set with MINIO_ENDPOINT")?,
                region: get("MINIO_REGION").unwrap_or_else(|| "us-east-1".into()),
            }),
            None => None,
        };

        let seed_demo_users = match get("SEED_DEMO_USERS") {
            Some(v) => matches!(v.trim(), "1" | "true" | "yes"),
            None => store == StoreKind::Memory,
        };

        Ok(Self {
            store,
            database_url,
            jwt,
            media,
            ai_service_url: get("AI_SERVICE_URL").filter(|v| !v.trim().is_empty()),
            seed_demo_users,
        })
    }
}

fn parse_or<F>(get: &F, key: &str, default: i64) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{key} must be an integer, got {v:?}")),
        None => Ok(default),
    }
}
