use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

pub const MAX_CONNECTIONS: u32 = 10;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("connect to database")?;
    info!("database pool ready");
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(pool).await {
        warn!(error = %e, "migration failed; continuing");
    }
}

/// `connected`, `disconnected`, or `not_configured` for the health endpoint.
pub async fn status(pool: Option<&PgPool>) -> &'static str {
    match pool {
        None => "not_configured",
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "connected",
            Err(e) => {
                warn!(error = %e, "database ping failed");
                "disconnected"
            }
        },
    }
}
