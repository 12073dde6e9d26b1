use axum::{
    body::Bytes,
    extract::Path,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use tracing::{info, warn};

use crate::middleware::RequestId;

/// Echoes the request body back with the caller's content type.
pub async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    info!(bytes = body.len(), "Echo requested");

    match headers.get(CONTENT_TYPE) {
        Some(content_type) => ([(CONTENT_TYPE, content_type.clone())], body).into_response(),
        None => body.into_response(),
    }
}

/// Responds with the status named in the path and a small JSON body.
pub async fn status(
    Path(code): Path<u16>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        warn!(code, "Refusing to answer with an invalid status code");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid status code", "code": code })),
        )
            .into_response();
    };

    (
        status,
        Json(json!({
            "status": status.as_u16(),
            "reason": status.canonical_reason(),
            "request_id": request_id.as_str(),
        })),
    )
        .into_response()
}
