use std::sync::Arc;
use std::time::Duration;

use clap::Parser as _;
use color_eyre::eyre::Context as _;
use sqlx::postgres::PgPoolOptions;

use algo_arena::{
    config::Config, profile_client::HttpIdentityProvider, routes, state::AppState,
    store::PgStore, telemetry,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = Config::parse();
    telemetry::setup_tracing()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .wrap_err("Failed to connect to Postgres")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .wrap_err("Failed to run migrations")?;

    let identity = HttpIdentityProvider::new(
        config.identity_base_url.clone(),
        Duration::from_millis(config.identity_timeout_ms),
    )?;

    let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(identity));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "battle service listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Server exited with error")?;

    Ok(())
}
