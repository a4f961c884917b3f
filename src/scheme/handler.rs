//! The embedder-facing handler capabilities.
//!
//! A [`SchemeHandlerFactory`] is registered per (scheme, domain) and
//! produces one [`SchemeHandler`] per matching request. The handler
//! services the request end to end: it is asked to process the request,
//! to supply response headers, and then to fill read buffers until the
//! body is complete. Completion is signaled asynchronously through the
//! continuation tokens the bridge hands to each call.

use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::job::token::{BytesAvailable, HeadersAvailable};
use crate::urlrequest::request::NetRequest;
use crate::urlrequest::response::NetResponse;
use std::sync::Arc;

/// The outcome of a single `read_response` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRead {
    /// `n` bytes were copied into the buffer. Must be non-zero.
    Ready(usize),
    /// No data yet. The handler must invoke the bytes token once data
    /// arrives; the same buffer will be offered again.
    Pending,
    /// The response body is complete. Clean end of stream, not an error.
    Complete,
}

/// Response header information supplied by a handler.
pub struct ResponseHead {
    /// The synthesized response.
    pub response: NetResponse,
    /// Body length in bytes; -1 when unknown in advance.
    pub content_length: i64,
    /// When set (non-empty), the request is answered with a synthetic
    /// 303 redirect to this URL instead of a body, regardless of
    /// `content_length`.
    pub redirect_url: Option<String>,
}

/// An embedder-supplied object servicing one request end to end.
///
/// All methods are invoked on the designated network thread. Handlers
/// that work asynchronously resume the pipeline through the provided
/// tokens, which may be invoked from any thread.
pub trait SchemeHandler: Send + Sync {
    /// Begin processing the request. Invoke `token` once response
    /// headers are available (immediately is fine). Return false to
    /// cancel the request at once.
    fn process_request(&self, request: &NetRequest, token: HeadersAvailable) -> bool;

    /// Supply response headers. Called exactly once, after the headers
    /// token fires.
    fn response_head(&self) -> ResponseHead;

    /// Copy response body bytes into `buf`.
    ///
    /// A handler reporting [`ResponseRead::Pending`] must invoke `token`
    /// after this call returns; invoking it from within the call is
    /// ignored, since the pending state is only recorded on return.
    fn read_response(&self, buf: &mut [u8], token: &BytesAvailable) -> ResponseRead;

    /// Per-cookie read gate: whether `cookie` may be sent with this
    /// request. Consulted after the bulk policy check.
    fn can_get_cookie(&self, _cookie: &CanonicalCookie) -> bool {
        true
    }

    /// Per-cookie write gate: whether `cookie` from the response may be
    /// saved.
    fn can_set_cookie(&self, _cookie: &CanonicalCookie) -> bool {
        true
    }

    /// The request is being canceled. Drop any pending work; tokens are
    /// already detached when this is called.
    fn cancel(&self) {}
}

/// An embedder-supplied object producing handlers for a registered
/// (scheme, domain) key.
///
/// Factories may be invoked reentrantly for many concurrently-active
/// requests and must not assume single in-flight use.
pub trait SchemeHandlerFactory: Send + Sync {
    /// Produce a handler for `request`, or `None` to decline it (the
    /// request then falls through to built-in handling, if any).
    fn create(&self, scheme: &str, request: &NetRequest) -> Option<Arc<dyn SchemeHandler>>;
}
