use ayora::{app, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("ayora=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    let app = app::build_app(app_state);
    app::serve(app).await
}
