//! Body capture for both directions of a request.
//!
//! The request body is drained once into memory and replayed to the handler.
//! The response body is wrapped in [`CaptureBody`], which copies every data
//! frame as it passes through to the transport.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

use crate::error::CaptureError;

/// Bytes read from a request body, plus the error that stopped reading early.
#[derive(Debug)]
pub struct CapturedRequest {
    pub bytes: Bytes,
    pub error: Option<CaptureError>,
}

impl CapturedRequest {
    /// A body for the downstream handler, byte-identical to what was captured.
    pub fn replay(&self) -> Body {
        Body::from(self.bytes.clone())
    }
}

/// Reads `body` to the end.
///
/// A transport error ends the read; whatever arrived before it is kept.
/// Trailers are discarded.
pub async fn capture_request(mut body: Body) -> CapturedRequest {
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    buf.extend_from_slice(&data);
                }
            }
            Err(source) => {
                let captured = buf.len();
                return CapturedRequest {
                    bytes: buf.freeze(),
                    error: Some(CaptureError::BodyRead { captured, source }),
                };
            }
        }
    }

    CapturedRequest {
        bytes: buf.freeze(),
        error: None,
    }
}

type OnComplete = Box<dyn FnOnce(Bytes) + Send>;

/// Pass-through response body that keeps a copy of every data frame.
///
/// `on_complete` receives the captured bytes exactly once: at end of stream,
/// on a body error, or when the body is dropped before either.
///
/// The whole stream is kept in memory. A streaming or SSE response that never
/// ends grows the buffer without limit and never reaches `on_complete` until
/// the client disconnects.
pub struct CaptureBody {
    inner: Body,
    captured: BytesMut,
    on_complete: Option<OnComplete>,
}

impl CaptureBody {
    pub fn new(inner: Body, on_complete: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            inner,
            captured: BytesMut::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    fn record(&mut self, chunk: &[u8]) {
        self.captured.extend_from_slice(chunk);
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(std::mem::take(&mut self.captured).freeze());
        }
    }
}

impl HttpBody for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.record(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.complete();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        self.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, sync::mpsc};

    fn chunked(chunks: Vec<Result<&'static str, io::Error>>) -> Body {
        Body::from_stream(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn request_capture_is_byte_identical() {
        let captured = capture_request(Body::from("{\"id\":1}")).await;
        assert!(captured.error.is_none());
        assert_eq!(captured.bytes, Bytes::from_static(b"{\"id\":1}"));

        let replayed = captured.replay().collect().await.unwrap().to_bytes();
        assert_eq!(replayed, captured.bytes);
    }

    #[tokio::test]
    async fn request_capture_joins_chunks() {
        let body = chunked(vec![Ok("ab"), Ok(""), Ok("cd")]);
        let captured = capture_request(body).await;
        assert_eq!(captured.bytes, Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn request_capture_keeps_partial_bytes_on_error() {
        let body = chunked(vec![
            Ok("part"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok("never"),
        ]);
        let captured = capture_request(body).await;
        assert_eq!(captured.bytes, Bytes::from_static(b"part"));
        assert!(matches!(
            captured.error,
            Some(CaptureError::BodyRead { captured: 4, .. })
        ));
    }

    #[tokio::test]
    async fn response_capture_passes_bytes_through() {
        let (tx, rx) = mpsc::channel();
        let body = CaptureBody::new(chunked(vec![Ok("hel"), Ok(""), Ok("lo")]), move |bytes| {
            tx.send(bytes).unwrap();
        });

        let delivered = Body::new(body).collect().await.unwrap().to_bytes();
        assert_eq!(delivered, Bytes::from_static(b"hello"));
        assert_eq!(rx.try_recv().unwrap(), delivered);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn response_capture_completes_on_error() {
        let (tx, rx) = mpsc::channel();
        let inner = chunked(vec![
            Ok("partial"),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        ]);
        let body = CaptureBody::new(inner, move |bytes| tx.send(bytes).unwrap());

        assert!(Body::new(body).collect().await.is_err());
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"partial"));
    }

    #[test]
    fn dropped_body_still_completes_once() {
        let (tx, rx) = mpsc::channel();
        let body = CaptureBody::new(Body::from("unread"), move |bytes| tx.send(bytes).unwrap());
        drop(body);
        assert_eq!(rx.try_recv().unwrap(), Bytes::new());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn hints_are_forwarded() {
        let body = CaptureBody::new(Body::from("four"), |_| {});
        assert_eq!(body.size_hint().exact(), Some(4));
        assert!(!body.is_end_stream());
    }
}
