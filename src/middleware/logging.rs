use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::CONTENT_LENGTH, request::Parts, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, Instrument};

use super::{
    capture::{self, CaptureBody},
    correlation::{self, RequestId},
    severity::{self, LogEntry, Outcome, Severity},
    sink::{LogSink, TracingSink},
};
use crate::metrics;

/// Switches supplied when the middleware is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLoggerOptions {
    /// Emit success and redirection entries, which are trace-level.
    pub debug: bool,
    /// Capture and attach the response body.
    pub log_response_body: bool,
    /// Re-indent JSON bodies before attaching them.
    pub pretty_print: bool,
    /// Capture request bodies for every method, not only POST/PUT/PATCH/DELETE.
    pub capture_all_methods: bool,
}

impl RequestLoggerOptions {
    pub fn min_severity(&self) -> Severity {
        if self.debug {
            Severity::Trace
        } else {
            Severity::Info
        }
    }

    pub fn captures_request_body(&self, method: &Method) -> bool {
        self.capture_all_methods
            || matches!(
                *method,
                Method::POST | Method::PUT | Method::PATCH | Method::DELETE
            )
    }
}

/// Middleware state: options plus the sink finished entries go to.
#[derive(Clone)]
pub struct RequestLogger {
    options: RequestLoggerOptions,
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    pub fn new(options: RequestLoggerOptions) -> Self {
        Self::with_sink(options, TracingSink)
    }

    pub fn with_sink(options: RequestLoggerOptions, sink: impl LogSink + 'static) -> Self {
        Self {
            options,
            sink: Arc::new(sink),
        }
    }

    pub fn options(&self) -> &RequestLoggerOptions {
        &self.options
    }

    fn emit(&self, entry: &LogEntry) {
        if entry.severity < self.options.min_severity() {
            return;
        }
        metrics::record_entry(entry.tier);
        self.sink.emit(entry);
    }
}

/// Everything known about one request, from entry until its entry is emitted.
struct RequestContext {
    request_id: RequestId,
    client_ip: String,
    method: String,
    path: String,
    params: Option<String>,
    request_body: Option<Bytes>,
}

impl RequestContext {
    fn new(request_id: RequestId, parts: &Parts) -> Self {
        Self {
            request_id,
            client_ip: client_address(parts),
            method: parts.method.to_string(),
            path: parts.uri.path().to_owned(),
            params: parts.uri.query().and_then(format_params),
            request_body: None,
        }
    }

    fn entry(&self, status: StatusCode, response_body: Option<&[u8]>, pretty: bool) -> LogEntry {
        let outcome = Outcome {
            request_id: self.request_id.as_str(),
            client_ip: &self.client_ip,
            method: &self.method,
            path: &self.path,
            params: self.params.as_deref(),
            status: i32::from(status.as_u16()),
            request_body: self.request_body.as_deref(),
            response_body,
        };
        severity::build_entry(&outcome, pretty)
    }
}

/// Request/response logging middleware.
///
/// Mount with `axum::middleware::from_fn_with_state(logger, request_logger)`.
pub async fn request_logger(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::resolve(request.headers());
    let (mut parts, body) = request.into_parts();
    let mut ctx = RequestContext::new(request_id, &parts);

    let body = if logger.options.captures_request_body(&parts.method) {
        let captured = capture::capture_request(body).await;
        if let Some(err) = &captured.error {
            metrics::record_body_read_failure();
            error!(
                request_id = %ctx.request_id,
                client_ip = %ctx.client_ip,
                error = %err,
                "Error while reading request body"
            );
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(captured.bytes.len()));
        }
        metrics::record_captured_request(captured.bytes.len());

        let replay = captured.replay();
        ctx.request_body = Some(captured.bytes);
        replay
    } else {
        body
    };

    correlation::set_header(&mut parts.headers, &ctx.request_id);
    parts.extensions.insert(ctx.request_id.clone());

    let span = tracing::info_span!("request", request_id = %ctx.request_id);
    let mut response = next
        .run(Request::from_parts(parts, body))
        .instrument(span)
        .await;

    correlation::set_header(response.headers_mut(), &ctx.request_id);
    let status = response.status();
    let pretty = logger.options.pretty_print;

    let tier = severity::classify(i32::from(status.as_u16()));
    if tier.severity() < logger.options.min_severity() {
        return response;
    }

    if !logger.options.log_response_body {
        logger.emit(&ctx.entry(status, None, pretty));
        return response;
    }

    let (parts, body) = response.into_parts();
    let body = CaptureBody::new(body, move |captured| {
        logger.emit(&ctx.entry(status, Some(&captured[..]), pretty));
    });
    Response::from_parts(parts, Body::new(body))
}

/// Client address as reported by a fronting proxy, else the peer address.
fn client_address(parts: &Parts) -> String {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    let real_ip = parts
        .headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_owned();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |info| info.0.ip().to_string())
}

/// `a=1&b=2` becomes `a=1, b=2`. Pairs are kept exactly as sent.
fn format_params(query: &str) -> Option<String> {
    let pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn params_are_joined_in_order() {
        assert_eq!(
            format_params("param1=value1&param2=value2").as_deref(),
            Some("param1=value1, param2=value2")
        );
        assert_eq!(format_params("flag&&x=%20y").as_deref(), Some("flag, x=%20y"));
        assert_eq!(format_params(""), None);
        assert_eq!(format_params("&"), None);
    }

    #[test]
    fn client_address_prefers_forwarded_headers() {
        let forwarded = parts(
            axum::http::Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.2")
                .header("x-real-ip", "198.51.100.1"),
        );
        assert_eq!(client_address(&forwarded), "203.0.113.7");

        let real_ip = parts(axum::http::Request::builder().header("x-real-ip", "198.51.100.1"));
        assert_eq!(client_address(&real_ip), "198.51.100.1");
    }

    #[test]
    fn client_address_falls_back_to_peer() {
        let mut peer = parts(axum::http::Request::builder());
        assert_eq!(client_address(&peer), "unknown");

        let addr: SocketAddr = "192.0.2.10:45000".parse().unwrap();
        peer.extensions.insert(ConnectInfo(addr));
        assert_eq!(client_address(&peer), "192.0.2.10");
    }

    #[test]
    fn body_capture_policy_by_method() {
        let options = RequestLoggerOptions::default();
        assert!(options.captures_request_body(&Method::POST));
        assert!(options.captures_request_body(&Method::DELETE));
        assert!(!options.captures_request_body(&Method::GET));
        assert!(!options.captures_request_body(&Method::HEAD));

        let uniform = RequestLoggerOptions {
            capture_all_methods: true,
            ..RequestLoggerOptions::default()
        };
        assert!(uniform.captures_request_body(&Method::GET));
    }

    #[test]
    fn debug_lowers_threshold() {
        assert_eq!(RequestLoggerOptions::default().min_severity(), Severity::Info);
        let debug = RequestLoggerOptions {
            debug: true,
            ..RequestLoggerOptions::default()
        };
        assert_eq!(debug.min_severity(), Severity::Trace);
    }
}
