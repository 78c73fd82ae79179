mod api;
mod config;
mod dispatch;
mod engine;
mod error;
mod formatter;
mod labels;
mod linear_engine;
mod network_engine;
mod openapi;
mod types;
mod validation;

#[cfg(test)]
mod test_fixtures;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use api::AppState;
use config::Config;
use dispatch::Engines;
use linear_engine::{LinearConfig, LinearEngine};
use network_engine::{NetworkConfig, NetworkEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);
    tracing::info!("Starting astromech with config: {:?}", config);

    let labels = config.label_registry()?;
    tracing::info!(labels = ?labels.as_slice(), "Labels loaded");

    tracing::info!("Loading linear model...");
    let linear = LinearEngine::new(LinearConfig::from(&config))?;

    tracing::info!("Loading network model...");
    let network = NetworkEngine::new(NetworkConfig::from(&config))?;

    let engines = Engines::new(Arc::new(linear), Arc::new(network));
    engines.check_labels(&labels)?;
    tracing::info!("Models loaded successfully");

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = api::router(AppState::new(engines, labels))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(prometheus_layer),
        );

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,astromech=debug".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
