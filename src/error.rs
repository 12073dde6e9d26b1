use thiserror::Error;

/// Failures the interceptor recovers from locally.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read request body after {captured} bytes: {source}")]
    BodyRead {
        captured: usize,
        #[source]
        source: axum::Error,
    },
}
