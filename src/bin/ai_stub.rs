use std::net::SocketAddr;

use ayora::{nutrition::stub, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("ayora=debug,tower_http=info");

    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("AI_STUB_PORT").unwrap_or_else(|_| "8000".into())
    )
    .parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    stub::serve(listener).await
}
