use std::time::Duration;

use anyhow::Context;

mod app;
mod auth;
mod catalog;
mod config;
mod db;
mod meals;
mod profile;
mod rollover;
mod search;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fitplan=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run migrations")?;

    // ночная архивация работает и без активных клиентов
    let archiver = app_state.archiver.clone();
    let tick = Duration::from_secs(app_state.config.rollover.tick_seconds);
    tokio::spawn(async move {
        archiver.run_periodic(tick).await;
    });

    let app = app::build_app(app_state);
    app::serve(app).await
}
