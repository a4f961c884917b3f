//! The network context: central configuration and dispatch for the
//! scheme handler layer.
//!
//! Replaces the process-wide singleton of classic embedding APIs with
//! an explicit object whose lifetime the embedder controls. Construct
//! it on the designated network thread; every registry, dispatch, and
//! cookie operation then happens on that thread.

use crate::base::runner::NetTaskRunner;
use crate::cookies::monster::CookieMonster;
use crate::cookies::store::{AllowAllCookies, CookieAccessPolicy, CookieStore};
use crate::job::bridge::{JobDelegate, SchemeJob};
use crate::scheme::handler::{SchemeHandler, SchemeHandlerFactory};
use crate::scheme::registry::{is_builtin_scheme, SchemeLookup, SchemeRegistry};
use crate::urlrequest::interceptor::{RedirectAction, RequestInterceptor};
use crate::urlrequest::request::NetRequest;
use std::sync::{Arc, Mutex};
use url::Url;

/// Configuration options for [`NetContext`].
#[derive(Clone)]
pub struct NetContextConfig {
    /// User-Agent string merged into requests that lack one.
    pub user_agent: String,

    /// Accept-Language header value merged into requests that lack one.
    pub accept_language: Option<String>,

    /// Accept-Charset header value merged into requests that lack one.
    pub accept_charset: Option<String>,

    /// Cookie storage (None = in-memory [`CookieMonster`]).
    pub cookie_store: Option<Arc<dyn CookieStore>>,

    /// Bulk cookie access policy (None = allow everything).
    pub cookie_policy: Option<Arc<dyn CookieAccessPolicy>>,
}

impl Default for NetContextConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: Some("en-US,en;q=0.9".to_string()),
            accept_charset: Some("ISO-8859-1,utf-8;q=0.7,*;q=0.3".to_string()),
            cookie_store: None,
            cookie_policy: None,
        }
    }
}

impl std::fmt::Debug for NetContextConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetContextConfig")
            .field("user_agent", &self.user_agent)
            .field("accept_language", &self.accept_language)
            .field("accept_charset", &self.accept_charset)
            .field("custom_cookie_store", &self.cookie_store.is_some())
            .field("custom_cookie_policy", &self.cookie_policy.is_some())
            .finish()
    }
}

/// The result of dispatching a request.
pub enum JobDispatch {
    /// An embedder handler took the request; drive the returned job.
    Custom(SchemeJob),
    /// The host's own scheme handling applies.
    Builtin,
    /// Nobody handles this scheme; the request is not intercepted.
    NotHandled,
}

impl std::fmt::Debug for JobDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobDispatch::Custom(_) => f.write_str("Custom(..)"),
            JobDispatch::Builtin => f.write_str("Builtin"),
            JobDispatch::NotHandled => f.write_str("NotHandled"),
        }
    }
}

/// Central object tying the scheme handler layer together: the
/// designated-thread task runner, the scheme registry, the cookie
/// store and access policy, and any request interceptors.
pub struct NetContext {
    runner: NetTaskRunner,
    registry: SchemeRegistry,
    cookie_store: Arc<dyn CookieStore>,
    cookie_policy: Arc<dyn CookieAccessPolicy>,
    interceptors: Mutex<Vec<Arc<dyn RequestInterceptor>>>,
    config: NetContextConfig,
}

impl NetContext {
    /// Create a context with default configuration, bound to the
    /// current thread as the designated network thread.
    pub fn new() -> Arc<Self> {
        Self::with_config(NetContextConfig::default())
    }

    /// Create a context with custom configuration, bound to the
    /// current thread.
    pub fn with_config(config: NetContextConfig) -> Arc<Self> {
        Self::with_config_on(NetTaskRunner::new(), config)
    }

    /// Create a context around an existing task runner.
    ///
    /// Use this when a collaborator (a custom cookie store, say) needs
    /// the runner before the context exists.
    pub fn with_config_on(runner: NetTaskRunner, config: NetContextConfig) -> Arc<Self> {
        let cookie_store = config
            .cookie_store
            .clone()
            .unwrap_or_else(|| Arc::new(CookieMonster::new(runner.clone())));
        let cookie_policy = config
            .cookie_policy
            .clone()
            .unwrap_or_else(|| Arc::new(AllowAllCookies));
        Arc::new(Self {
            registry: SchemeRegistry::new(runner.clone()),
            runner,
            cookie_store,
            cookie_policy,
            interceptors: Mutex::new(Vec::new()),
            config,
        })
    }

    pub fn runner(&self) -> &NetTaskRunner {
        &self.runner
    }

    pub fn cookie_store(&self) -> &Arc<dyn CookieStore> {
        &self.cookie_store
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    /// Register `factory` for (scheme, domain); `None` unregisters that
    /// exact key.
    pub fn register_scheme_handler_factory(
        &self,
        scheme: &str,
        domain: &str,
        factory: Option<Arc<dyn SchemeHandlerFactory>>,
    ) {
        self.registry.register(scheme, domain, factory);
    }

    /// Remove every factory registration. Idempotent.
    pub fn clear_scheme_handler_factories(&self) {
        self.registry.clear();
    }

    /// Append a request interceptor. Interceptors are consulted in
    /// registration order.
    pub fn add_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) {
        self.runner.assert_currently_on();
        self.interceptors.lock().unwrap().push(interceptor);
    }

    /// Resolve a request to a job.
    ///
    /// A registered factory wins first. Otherwise the request is
    /// host-handled and the interceptors get their turn: a full-replace
    /// handler, then a URL rewrite (which triggers a single registry
    /// re-resolution). Whatever remains is built-in or not handled.
    pub fn create_job(
        &self,
        request: NetRequest,
        delegate: Arc<dyn JobDelegate>,
    ) -> JobDispatch {
        self.runner.assert_currently_on();
        let mut request = request;
        self.add_default_headers(&mut request);

        // Step 1: the registry.
        if let SchemeLookup::Factory(factory) = self.registry.lookup(request.url()) {
            let scheme = request.url().scheme().to_ascii_lowercase();
            if let Some(handler) = factory.create(&scheme, &request) {
                return JobDispatch::Custom(self.make_job(request, handler, delegate));
            }
            // A declining factory is treated like a registry miss; the
            // request is host-handled from here on.
        }

        // Step 2: host-handled; interceptors may replace the fetch.
        let interceptors = self.interceptors.lock().unwrap().clone();
        for interceptor in &interceptors {
            if let Some(handler) = interceptor.intercept(&request) {
                return JobDispatch::Custom(self.make_job(request, handler, delegate));
            }
        }

        // Step 3: a pre-redirect rewrite, then one re-resolution.
        for interceptor in &interceptors {
            if let Some(new_url) = interceptor.rewrite_url(&request) {
                tracing::debug!(from = %request.url(), to = %new_url, "interceptor rewrote request URL");
                request.set_url(new_url);
                if let SchemeLookup::Factory(factory) = self.registry.lookup(request.url()) {
                    let scheme = request.url().scheme().to_ascii_lowercase();
                    if let Some(handler) = factory.create(&scheme, &request) {
                        return JobDispatch::Custom(self.make_job(request, handler, delegate));
                    }
                }
                break;
            }
        }

        self.builtin_or_not_handled(&request.url().scheme().to_ascii_lowercase())
    }

    /// Drive the post-redirect extension point for a redirect the host
    /// decided on its own. The first interceptor with an opinion wins.
    pub fn notify_redirect(
        &self,
        request: &NetRequest,
        location: &Url,
        status: u16,
    ) -> RedirectAction {
        self.runner.assert_currently_on();
        let interceptors = self.interceptors.lock().unwrap().clone();
        for interceptor in &interceptors {
            match interceptor.on_redirect(request, location, status) {
                RedirectAction::Follow => continue,
                action => {
                    tracing::debug!(location = %location, ?action, "interceptor acted on redirect");
                    return action;
                }
            }
        }
        RedirectAction::Follow
    }

    fn builtin_or_not_handled(&self, scheme: &str) -> JobDispatch {
        if is_builtin_scheme(scheme) {
            JobDispatch::Builtin
        } else {
            JobDispatch::NotHandled
        }
    }

    fn make_job(
        &self,
        request: NetRequest,
        handler: Arc<dyn SchemeHandler>,
        delegate: Arc<dyn JobDelegate>,
    ) -> SchemeJob {
        SchemeJob::new(
            self.runner.clone(),
            Arc::clone(&self.cookie_store),
            Arc::clone(&self.cookie_policy),
            request,
            handler,
            delegate,
        )
    }

    /// Add default headers if not already specified.
    fn add_default_headers(&self, request: &mut NetRequest) {
        if let Some(accept_language) = &self.config.accept_language {
            request.set_header_if_missing("accept-language", accept_language);
        }
        if let Some(accept_charset) = &self.config.accept_charset {
            request.set_header_if_missing("accept-charset", accept_charset);
        }
        request.set_header_if_missing("user-agent", &self.config.user_agent);
    }
}
