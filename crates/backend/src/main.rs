use pinmap_backend::{build_app, Config, Storage};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if let Some(parent) = config.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), error = %e, "Failed to create database directory");
            std::process::exit(1);
        }
    }
    let storage = match Storage::open(&config.db_path) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open storage");
            std::process::exit(1);
        }
    };

    let app = build_app(storage, config.max_blob_bytes);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(port = config.port, db = %config.db_path.display(), "Server running");
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server stopped");
    }
}
