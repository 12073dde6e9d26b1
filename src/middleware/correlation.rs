//! Per-request correlation id: propagated from `X-Request-ID` or freshly
//! generated.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id of the request being processed.
///
/// Inserted into request extensions, so handlers can take
/// `Extension<RequestId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Reuses a non-empty inbound `X-Request-ID` verbatim, otherwise
    /// generates a UUID v4.
    pub fn resolve(headers: &HeaderMap) -> Self {
        headers
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or_else(Self::generate, |value| Self(value.to_owned()))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writes the id into `headers`, replacing any previous value.
pub fn set_header(headers: &mut HeaderMap, id: &RequestId) {
    if let Some(value) = id.header_value() {
        headers.insert(X_REQUEST_ID.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_header_is_reused_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static("abc-123"));
        assert_eq!(RequestId::resolve(&headers).as_str(), "abc-123");
    }

    #[test]
    fn missing_or_empty_header_generates() {
        let generated = RequestId::resolve(&HeaderMap::new());
        assert!(Uuid::parse_str(generated.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static(""));
        assert!(Uuid::parse_str(RequestId::resolve(&headers).as_str()).is_ok());
    }

    #[test]
    fn whitespace_id_is_kept_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static("a b"));
        assert_eq!(RequestId::resolve(&headers).as_str(), "a b");
    }

    #[test]
    fn non_utf8_header_generates() {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_bytes(&[0xfa, 0xfb]).expect("opaque header value");
        headers.insert(X_REQUEST_ID.clone(), value);
        assert!(Uuid::parse_str(RequestId::resolve(&headers).as_str()).is_ok());
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn set_header_overwrites() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static("old"));
        set_header(&mut headers, &RequestId("new".to_owned()));
        assert_eq!(headers.get(&X_REQUEST_ID).unwrap(), "new");
        assert_eq!(headers.get_all(&X_REQUEST_ID).iter().count(), 1);
    }
}
