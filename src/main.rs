use anyhow::Context;
use product_catalog::{
    app::router::{create_router, AppState},
    config::load_config,
    infrastructure::logger::Logger,
    DataSource,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (mut config, config_path) = load_config()?;
    config.apply_env()?;
    config.validate()?;

    let _log_guard = Logger::init(&config.logging)?;

    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let data_source = Arc::new(DataSource::init(config.database.prefer_remote, &config.database).await);

    let state = AppState::new(Arc::clone(&data_source), &config);
    state
        .uploads
        .ensure_dir()
        .await
        .with_context(|| format!("create uploads directory {}", config.uploads.dir.display()))?;

    let app = create_router(state.clone(), &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;

    info!("🚀 Server running on http://{} (hostname: {})", addr, state.hostname);
    info!("📦 Data source in use: {}", data_source.source_label());
    info!("📖 API endpoints:");
    info!("   GET    /                - Catalog page (?page=N)");
    info!("   GET    /products        - List products (?page=N&limit=M)");
    info!("   POST   /products        - Create product (JSON or multipart)");
    info!("   GET    /products/:id    - Get product");
    info!("   PUT    /products/:id    - Update product");
    info!("   PATCH  /products/:id    - Update product (partial)");
    info!("   DELETE /products/:id    - Delete product");
    info!("   GET    /health          - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
