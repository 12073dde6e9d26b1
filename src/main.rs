use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use request_logger::{config::AppConfig, create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config)?;
    info!("Configuration loaded successfully");

    init_metrics(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(AppState::new(config));

    let listener = TcpListener::bind(&addr).await?;
    info!("Request logger demo listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let default_level = if config.logger.debug { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.logging.format.as_str() {
        "json" => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        _ => subscriber.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    Ok(())
}

fn init_metrics(config: &AppConfig) -> Result<()> {
    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()?;

        info!("Metrics exporter initialized on port {}", config.metrics.port);
    }

    Ok(())
}
