use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub logger: LoggerInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggerInfo {
    pub debug: bool,
    pub log_response_body: bool,
    pub pretty_print: bool,
}

/// Basic health check endpoint
///
/// Reports the service as running along with the active logger switches.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("Health check requested");

    let options = state.logger.options();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        logger: LoggerInfo {
            debug: options.debug,
            log_response_body: options.log_response_body,
            pretty_print: options.pretty_print,
        },
    })
}
