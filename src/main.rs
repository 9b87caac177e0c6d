use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::info;

use wallboard::{api, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config.env (or .env) if present
    let _ = dotenvy::from_filename("config.env").or_else(|_| dotenvy::dotenv());

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallboard=info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    info!("wallboard v{}", env!("CARGO_PKG_VERSION"));

    let addr = config.bind_addr();
    let state = AppState::build(config)
        .await
        .context("failed to initialize application state")?;

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running on http://{addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
