mod bootstrap;
mod health;
mod hubspot;
mod quote;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use leadquote_core::config::{AppConfig, LoadOptions};
use leadquote_core::pipeline::SubmissionPipeline;
use leadquote_db::DbPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use leadquote_core::config::LogFormat::*;

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

fn app_router(db_pool: DbPool, pipeline: SubmissionPipeline) -> Router {
    let schema_version = pipeline.schema_version().to_string();
    Router::new()
        .merge(health::router(db_pool, schema_version))
        .merge(quote::router(pipeline))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits its events.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        schema_version = %app.pipeline.schema_version(),
        "leadquote-server listening"
    );

    let router = app_router(app.db_pool.clone(), app.pipeline);
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(grace)).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "leadquote-server stopping"
    );
    app.db_pool.close().await;

    Ok(())
}

/// Resolves on ctrl-c, then arms a hard exit once the grace period runs out.
async fn wait_for_shutdown(grace: Duration) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
    tracing::info!(
        event_name = "system.server.draining",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "draining in-flight requests"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(
            event_name = "system.server.forced_exit",
            correlation_id = "shutdown",
            "grace period elapsed with requests still in flight"
        );
        std::process::exit(1);
    });
}
