//! Fanout API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fanout_common::config::AppConfig;
use fanout_common::store::Store;
use fanout_notifier::{NotificationQueue, QueueConfig, SimulatedDelivery};

use fanout_api::routes::create_router;
use fanout_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("fanout_api=debug,fanout_engine=debug,fanout_notifier=info,tower_http=debug")
    });
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting Fanout API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    let store = Arc::new(Store::new());
    if config.seed_sample_data {
        store.seed_sample_data();
    }

    // Start delivery workers
    let backend = SimulatedDelivery::new(
        config.notifier_failure_rate,
        Duration::from_millis(config.notifier_max_latency_ms),
    );
    let mut queue = NotificationQueue::new(Arc::clone(&store), backend, QueueConfig::from(&config));
    queue.start()?;

    // Build application state
    let state = AppState::new(Arc::clone(&store), queue.handle(), queue.metrics());

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining notification queue...");
    queue.stop().await;

    tracing::info!("Fanout API server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, stopping gracefully...");
}
