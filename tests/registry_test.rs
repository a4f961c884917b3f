use schemenet::job::{HeadersAvailable, JobDelegate};
use schemenet::scheme::{
    ResponseHead, ResponseRead, SchemeHandler, SchemeHandlerFactory, SchemeLookup,
};
use schemenet::urlrequest::{JobDispatch, NetContext, NetRequest, NetResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

struct NullHandler;

impl SchemeHandler for NullHandler {
    fn process_request(&self, _request: &NetRequest, token: HeadersAvailable) -> bool {
        token.notify();
        true
    }

    fn response_head(&self) -> ResponseHead {
        ResponseHead {
            response: NetResponse::ok("text/plain"),
            content_length: 0,
            redirect_url: None,
        }
    }

    fn read_response(
        &self,
        _buf: &mut [u8],
        _token: &schemenet::job::BytesAvailable,
    ) -> ResponseRead {
        ResponseRead::Complete
    }
}

/// Counts how often it was asked for a handler.
struct CountingFactory {
    creates: AtomicUsize,
    decline: bool,
}

impl CountingFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            creates: AtomicUsize::new(0),
            decline: false,
        })
    }

    fn declining() -> Arc<Self> {
        Arc::new(Self {
            creates: AtomicUsize::new(0),
            decline: true,
        })
    }

    fn count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl SchemeHandlerFactory for CountingFactory {
    fn create(
        &self,
        _scheme: &str,
        _request: &NetRequest,
    ) -> Option<Arc<dyn SchemeHandler>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.decline {
            None
        } else {
            Some(Arc::new(NullHandler))
        }
    }
}

struct NullDelegate;
impl JobDelegate for NullDelegate {}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_exact_domain_match_wins_over_wildcard() {
    let context = NetContext::new();
    let exact = CountingFactory::new();
    let wildcard = CountingFactory::new();
    context.register_scheme_handler_factory("https", "example.com", Some(exact.clone()));
    context.register_scheme_handler_factory("https", "", Some(wildcard.clone()));

    let request = NetRequest::new(url("https://example.com/page"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::Custom(_)
    ));
    assert_eq!(exact.count(), 1);
    assert_eq!(wildcard.count(), 0);
}

#[test]
fn test_wildcard_domain_fallback() {
    let context = NetContext::new();
    let exact = CountingFactory::new();
    let wildcard = CountingFactory::new();
    context.register_scheme_handler_factory("https", "example.com", Some(exact.clone()));
    context.register_scheme_handler_factory("https", "", Some(wildcard.clone()));

    let request = NetRequest::new(url("https://other.org/page"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::Custom(_)
    ));
    assert_eq!(exact.count(), 0);
    assert_eq!(wildcard.count(), 1);
}

#[test]
fn test_non_standard_scheme_ignores_domain() {
    let context = NetContext::new();
    // Domain-scoped registration of a non-standard scheme can never
    // match: the domain step only applies to standard schemes.
    let factory = CountingFactory::new();
    context.register_scheme_handler_factory("custom", "example.com", Some(factory.clone()));

    let request = NetRequest::new(url("custom://example.com/page"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::NotHandled
    ));
    assert_eq!(factory.count(), 0);

    // The any-domain registration is what matches.
    context.register_scheme_handler_factory("custom", "", Some(factory.clone()));
    let request = NetRequest::new(url("custom://example.com/page"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::Custom(_)
    ));
    assert_eq!(factory.count(), 1);
}

#[test]
fn test_registration_keys_are_case_insensitive() {
    let context = NetContext::new();
    let factory = CountingFactory::new();
    context.register_scheme_handler_factory("CUSTOM", "", Some(factory.clone()));

    let request = NetRequest::new(url("custom://x/"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::Custom(_)
    ));
    assert_eq!(factory.count(), 1);
}

#[test]
fn test_builtin_fallback_for_unregistered_scheme() {
    let context = NetContext::new();
    let request = NetRequest::new(url("https://example.com/"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::Builtin
    ));

    let request = NetRequest::new(url("weird://example.com/"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::NotHandled
    ));
}

#[test]
fn test_unregister_with_none_factory() {
    let context = NetContext::new();
    let factory = CountingFactory::new();
    context.register_scheme_handler_factory("custom", "", Some(factory.clone()));
    context.register_scheme_handler_factory("custom", "", None);

    let request = NetRequest::new(url("custom://x/"));
    assert!(matches!(
        context.create_job(request, Arc::new(NullDelegate)),
        JobDispatch::NotHandled
    ));
    assert_eq!(factory.count(), 0);
}

#[test]
fn test_clear_is_idempotent_and_removes_all() {
    let context = NetContext::new();
    let custom = CountingFactory::new();
    let https = CountingFactory::new();
    context.register_scheme_handler_factory("custom", "", Some(custom.clone()));
    context.register_scheme_handler_factory("https", "example.com", Some(https.clone()));

    context.clear_scheme_handler_factories();
    context.clear_scheme_handler_factories();

    assert!(matches!(
        context.create_job(NetRequest::new(url("custom://x/")), Arc::new(NullDelegate)),
        JobDispatch::NotHandled
    ));
    assert!(matches!(
        context.create_job(
            NetRequest::new(url("https://example.com/")),
            Arc::new(NullDelegate)
        ),
        JobDispatch::Builtin
    ));
    assert_eq!(custom.count(), 0);
    assert_eq!(https.count(), 0);
}

#[test]
fn test_declining_factory_falls_through() {
    let context = NetContext::new();

    // Built-in scheme: a declined request uses host handling.
    let declining = CountingFactory::declining();
    context.register_scheme_handler_factory("https", "", Some(declining.clone()));
    assert!(matches!(
        context.create_job(
            NetRequest::new(url("https://example.com/")),
            Arc::new(NullDelegate)
        ),
        JobDispatch::Builtin
    ));
    assert_eq!(declining.count(), 1);

    // Custom scheme: nothing to fall through to.
    let declining = CountingFactory::declining();
    context.register_scheme_handler_factory("custom", "", Some(declining.clone()));
    assert!(matches!(
        context.create_job(NetRequest::new(url("custom://x/")), Arc::new(NullDelegate)),
        JobDispatch::NotHandled
    ));
    assert_eq!(declining.count(), 1);
}

#[test]
fn test_registry_lookup_directly() {
    let context = NetContext::new();
    let factory = CountingFactory::new();
    context.register_scheme_handler_factory("custom", "", Some(factory));

    assert!(matches!(
        context.registry().lookup(&url("custom://anything/")),
        SchemeLookup::Factory(_)
    ));
    assert!(matches!(
        context.registry().lookup(&url("about:blank")),
        SchemeLookup::Builtin
    ));
    assert!(matches!(
        context.registry().lookup(&url("weird://x/")),
        SchemeLookup::NotHandled
    ));
}

#[test]
fn test_default_headers_populated_on_dispatch() {
    struct HeaderSniffer {
        seen_user_agent: Mutex<Option<String>>,
        seen_accept_language: Mutex<Option<String>>,
    }

    impl SchemeHandler for HeaderSniffer {
        fn process_request(&self, request: &NetRequest, token: HeadersAvailable) -> bool {
            *self.seen_user_agent.lock().unwrap() =
                request.header("user-agent").map(|s| s.to_string());
            *self.seen_accept_language.lock().unwrap() =
                request.header("accept-language").map(|s| s.to_string());
            token.notify();
            true
        }

        fn response_head(&self) -> ResponseHead {
            ResponseHead {
                response: NetResponse::ok("text/plain"),
                content_length: 0,
                redirect_url: None,
            }
        }

        fn read_response(
            &self,
            _buf: &mut [u8],
            _token: &schemenet::job::BytesAvailable,
        ) -> ResponseRead {
            ResponseRead::Complete
        }
    }

    struct SnifferFactory(Arc<HeaderSniffer>);
    impl SchemeHandlerFactory for SnifferFactory {
        fn create(&self, _scheme: &str, _request: &NetRequest) -> Option<Arc<dyn SchemeHandler>> {
            Some(self.0.clone())
        }
    }

    let sniffer = Arc::new(HeaderSniffer {
        seen_user_agent: Mutex::new(None),
        seen_accept_language: Mutex::new(None),
    });
    let context = NetContext::new();
    context.register_scheme_handler_factory("custom", "", Some(Arc::new(SnifferFactory(sniffer.clone()))));

    let JobDispatch::Custom(job) =
        context.create_job(NetRequest::new(url("custom://x/")), Arc::new(NullDelegate))
    else {
        panic!("expected a custom job");
    };
    job.start();
    context.runner().run_until_idle();

    assert_eq!(
        sniffer.seen_user_agent.lock().unwrap().as_deref(),
        Some(context.user_agent())
    );
    assert_eq!(
        sniffer.seen_accept_language.lock().unwrap().as_deref(),
        Some("en-US,en;q=0.9")
    );
}
