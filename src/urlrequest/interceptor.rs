//! Extension points for requests the host would otherwise handle
//! itself.
//!
//! Interceptors apply to requests resolved to a host-handled
//! (non-custom) scheme. They communicate only through return values;
//! none may perform the fetch themselves.

use crate::scheme::handler::SchemeHandler;
use crate::urlrequest::request::NetRequest;
use std::sync::Arc;
use url::Url;

/// The embedder's reaction to a redirect the host decided on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    /// Let the redirect proceed unchanged.
    Follow,
    /// Abandon the redirect (and with it the request).
    Veto,
    /// Follow, but to this URL instead.
    Rewrite(Url),
}

/// Optional hooks around host-handled requests. All methods default to
/// "not interested" and are invoked on the designated network thread.
pub trait RequestInterceptor: Send + Sync {
    /// Supply a handler that takes over the entire request instead of
    /// the host's own fetch.
    fn intercept(&self, _request: &NetRequest) -> Option<Arc<dyn SchemeHandler>> {
        None
    }

    /// Inspect or rewrite the destination URL before any job starts.
    fn rewrite_url(&self, _request: &NetRequest) -> Option<Url> {
        None
    }

    /// React to a redirect the host decided on its own.
    fn on_redirect(&self, _request: &NetRequest, _location: &Url, _status: u16) -> RedirectAction {
        RedirectAction::Follow
    }
}
