use std::{sync::Arc, time::Duration};

use axum::{
    middleware::from_fn_with_state,
    routing::{any, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;

use middleware::{request_logger, RequestLogger};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub logger: RequestLogger,
}

impl AppState {
    pub fn new(config: config::AppConfig) -> Self {
        let logger = RequestLogger::new(config.logger);
        Self::with_logger(config, logger)
    }

    pub fn with_logger(config: config::AppConfig, logger: RequestLogger) -> Self {
        Self {
            config: Arc::new(config),
            logger,
        }
    }
}

/// Demo application with the request logger mounted over every route.
pub fn create_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/echo", post(routes::echo::echo))
        .route("/status/:code", any(routes::echo::status))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(from_fn_with_state(state.logger.clone(), request_logger))
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}
