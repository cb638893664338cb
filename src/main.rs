// src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use home_pulse_backend::{
    config::{settings::Settings, AppState},
    routes::create_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::load()?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!(environment = %settings.environment, "Configuration loaded");

    let (app_state, worker) = AppState::new(settings).await?;

    // Schema migrations run before any request is served
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("Database migrations applied");

    let worker = worker.spawn();
    let app = create_router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
