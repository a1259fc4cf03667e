use anyhow::Context;
use fithub_server::{create_router, models::SeedData, AppState, Config, Database};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path))?;

    if let Some(seed_path) = &config.seed_path {
        let raw = std::fs::read_to_string(seed_path)
            .with_context(|| format!("failed to read seed file {seed_path}"))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .with_context(|| format!("invalid seed file {seed_path}"))?;
        db.seed(seed)?;
    }

    let state = AppState { db: Arc::new(db) };

    let app = create_router(state).layer(config.cors_layer());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
