use anyhow::{Context, Result};
use greenhouse::api::{create_app, AppContext};
use greenhouse::config::{load_or_default, new_runtime_config, RuntimeConfig};
use greenhouse::engine::DashboardEngine;
use greenhouse::store::SqliteStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenhouse=info".into()),
        )
        .init();

    info!("Greenhouse service starting...");

    let config_path =
        std::env::var("GREENHOUSE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = load_or_default(&config_path)?.apply_env();
    info!(
        config_path = %config_path,
        policy = ?config.status.policy,
        auth_enabled = config.auth.api_key.is_some(),
        "Configuration loaded"
    );

    let runtime = RuntimeConfig::from_config(&config).with_env();
    runtime.validate().context("Invalid runtime configuration")?;
    let runtime_config = new_runtime_config(runtime);

    let store = Arc::new(
        SqliteStore::open(&config.database.path).context("Failed to open greenhouse database")?,
    );

    let engine = DashboardEngine::new(store.clone(), store.clone(), runtime_config.clone())
        .with_policy(config.status.policy, config.status.heartbeat_window_seconds)
        .context("Invalid status policy configuration")?;
    info!(policy = ?engine.policy_kind(), "Dashboard engine ready");

    let app = create_app(AppContext {
        engine: Arc::new(engine),
        store,
        runtime_config,
        max_alert_limit: config.dashboard.max_alert_limit,
        api_key: config.auth.api_key.clone(),
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "HTTP server listening");

    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
