use application::UserApp;
use std::sync::Arc;
use tracing::info;

mod config;
mod error;
mod routes;

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    info!("Starting User Service API Server");
    info!("Using database: {}", config.database_path);

    let user_app = Arc::new(UserApp::new(&config.database_path)?);
    let app = routes::router(AppState { user_app });

    let bind_address = config.api_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("API Server listening on http://{}", bind_address);
    info!("   GET    /api/v1/users[?email=] - List users or search by email");
    info!("   POST   /api/v1/users          - Create user");
    info!("   GET    /api/v1/users/:id      - Get user");
    info!("   PUT    /api/v1/users/:id      - Replace user");
    info!("   PATCH  /api/v1/users/:id      - Partially update user");
    info!("   DELETE /api/v1/users/:id      - Delete user");
    info!("   GET    /health                - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down user service");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
