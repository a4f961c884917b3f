use schemenet::base::status::RequestStatus;
use schemenet::job::{BytesAvailable, HeadersAvailable, IoBuffer, JobDelegate, JobState, ReadOutcome};
use schemenet::scheme::{ResponseHead, ResponseRead, SchemeHandler, SchemeHandlerFactory};
use schemenet::urlrequest::{
    JobDispatch, NetContext, NetRequest, NetResponse, RedirectAction, RequestInterceptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Serves a fixed body and remembers the URL it was asked for.
struct BodyHandler {
    body: &'static [u8],
    seen_url: Mutex<Option<Url>>,
    cursor: AtomicUsize,
}

impl BodyHandler {
    fn new(body: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            body,
            seen_url: Mutex::new(None),
            cursor: AtomicUsize::new(0),
        })
    }
}

impl SchemeHandler for BodyHandler {
    fn process_request(&self, request: &NetRequest, token: HeadersAvailable) -> bool {
        *self.seen_url.lock().unwrap() = Some(request.url().clone());
        token.notify();
        true
    }

    fn response_head(&self) -> ResponseHead {
        ResponseHead {
            response: NetResponse::ok("text/plain"),
            content_length: self.body.len() as i64,
            redirect_url: None,
        }
    }

    fn read_response(&self, buf: &mut [u8], _token: &BytesAvailable) -> ResponseRead {
        let cursor = self.cursor.load(Ordering::SeqCst);
        let n = (self.body.len() - cursor).min(buf.len());
        if n == 0 {
            return ResponseRead::Complete;
        }
        buf[..n].copy_from_slice(&self.body[cursor..cursor + n]);
        self.cursor.store(cursor + n, Ordering::SeqCst);
        ResponseRead::Ready(n)
    }
}

struct BodyFactory(Arc<BodyHandler>);

impl SchemeHandlerFactory for BodyFactory {
    fn create(&self, _scheme: &str, _request: &NetRequest) -> Option<Arc<dyn SchemeHandler>> {
        Some(self.0.clone())
    }
}

struct NullDelegate;
impl JobDelegate for NullDelegate {}

#[derive(Default)]
struct DoneDelegate {
    done: Mutex<Vec<RequestStatus>>,
}
impl JobDelegate for DoneDelegate {
    fn on_done(&self, status: RequestStatus) {
        self.done.lock().unwrap().push(status);
    }
}

struct ReplacingInterceptor {
    handler: Arc<BodyHandler>,
    match_host: &'static str,
}

impl RequestInterceptor for ReplacingInterceptor {
    fn intercept(&self, request: &NetRequest) -> Option<Arc<dyn SchemeHandler>> {
        if request.url().host_str() == Some(self.match_host) {
            Some(self.handler.clone() as Arc<dyn SchemeHandler>)
        } else {
            None
        }
    }
}

struct RewritingInterceptor {
    from_host: &'static str,
    to: &'static str,
}

impl RequestInterceptor for RewritingInterceptor {
    fn rewrite_url(&self, request: &NetRequest) -> Option<Url> {
        if request.url().host_str() == Some(self.from_host) {
            Some(Url::parse(self.to).unwrap())
        } else {
            None
        }
    }
}

struct RedirectWatcher {
    action: RedirectAction,
    calls: AtomicUsize,
}

impl RequestInterceptor for RedirectWatcher {
    fn on_redirect(&self, _request: &NetRequest, _location: &Url, _status: u16) -> RedirectAction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.action.clone()
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_full_replace_takes_over_host_request() {
    let handler = BodyHandler::new(b"intercepted");
    let context = NetContext::new();
    context.add_interceptor(Arc::new(ReplacingInterceptor {
        handler: handler.clone(),
        match_host: "intercept.me",
    }));

    // Non-matching host: host handling applies.
    assert!(matches!(
        context.create_job(
            NetRequest::new(url("https://example.com/")),
            Arc::new(NullDelegate)
        ),
        JobDispatch::Builtin
    ));

    // Matching host: the interceptor's handler replaces the fetch.
    let delegate = Arc::new(DoneDelegate::default());
    let JobDispatch::Custom(job) = context.create_job(
        NetRequest::new(url("https://intercept.me/page")),
        delegate.clone(),
    ) else {
        panic!("expected a custom job");
    };

    job.start();
    context.runner().run_until_idle();
    assert_eq!(job.state(), JobState::Streaming);

    let buf = IoBuffer::with_capacity(32);
    assert_eq!(job.read_raw(&buf, 32), ReadOutcome::Read(11));
    assert_eq!(buf.copy_to_vec(11), b"intercepted");
    assert_eq!(job.read_raw(&buf, 32), ReadOutcome::Eof);
    assert_eq!(*delegate.done.lock().unwrap(), vec![RequestStatus::Success]);
}

#[test]
fn test_registered_factory_wins_over_interceptor() {
    let factory_handler = BodyHandler::new(b"from factory");
    let interceptor_handler = BodyHandler::new(b"from interceptor");

    let context = NetContext::new();
    context.register_scheme_handler_factory(
        "custom",
        "",
        Some(Arc::new(BodyFactory(factory_handler.clone()))),
    );
    context.add_interceptor(Arc::new(ReplacingInterceptor {
        handler: interceptor_handler.clone(),
        match_host: "x",
    }));

    let JobDispatch::Custom(job) =
        context.create_job(NetRequest::new(url("custom://x/")), Arc::new(NullDelegate))
    else {
        panic!("expected a custom job");
    };
    job.start();
    context.runner().run_until_idle();

    // The registry match means interceptors never saw the request.
    assert!(factory_handler.seen_url.lock().unwrap().is_some());
    assert!(interceptor_handler.seen_url.lock().unwrap().is_none());
}

#[test]
fn test_rewrite_into_registered_scheme() {
    let handler = BodyHandler::new(b"rewritten");
    let context = NetContext::new();
    context.register_scheme_handler_factory("custom", "", Some(Arc::new(BodyFactory(handler.clone()))));
    context.add_interceptor(Arc::new(RewritingInterceptor {
        from_host: "legacy.example",
        to: "custom://replacement/",
    }));

    let JobDispatch::Custom(job) = context.create_job(
        NetRequest::new(url("https://legacy.example/old")),
        Arc::new(NullDelegate),
    ) else {
        panic!("expected a custom job after rewrite");
    };
    job.start();
    context.runner().run_until_idle();

    // The handler saw the rewritten destination.
    assert_eq!(
        handler.seen_url.lock().unwrap().as_ref().map(|u| u.as_str()),
        Some("custom://replacement/")
    );
}

#[test]
fn test_rewrite_to_host_scheme_stays_builtin() {
    let context = NetContext::new();
    context.add_interceptor(Arc::new(RewritingInterceptor {
        from_host: "old.example",
        to: "https://new.example/",
    }));

    assert!(matches!(
        context.create_job(
            NetRequest::new(url("https://old.example/")),
            Arc::new(NullDelegate)
        ),
        JobDispatch::Builtin
    ));
}

#[test]
fn test_redirect_veto_and_rewrite() {
    let context = NetContext::new();
    let follower = Arc::new(RedirectWatcher {
        action: RedirectAction::Follow,
        calls: AtomicUsize::new(0),
    });
    let vetoer = Arc::new(RedirectWatcher {
        action: RedirectAction::Veto,
        calls: AtomicUsize::new(0),
    });
    context.add_interceptor(follower.clone());
    context.add_interceptor(vetoer.clone());

    let request = NetRequest::new(url("https://example.com/"));
    let action = context.notify_redirect(&request, &url("https://example.com/next"), 302);

    // The first interceptor declined to act; the second vetoed.
    assert_eq!(action, RedirectAction::Veto);
    assert_eq!(follower.calls.load(Ordering::SeqCst), 1);
    assert_eq!(vetoer.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_redirect_rewrite_wins_in_registration_order() {
    let context = NetContext::new();
    let rewriter = Arc::new(RedirectWatcher {
        action: RedirectAction::Rewrite(url("https://elsewhere.example/")),
        calls: AtomicUsize::new(0),
    });
    let vetoer = Arc::new(RedirectWatcher {
        action: RedirectAction::Veto,
        calls: AtomicUsize::new(0),
    });
    context.add_interceptor(rewriter.clone());
    context.add_interceptor(vetoer.clone());

    let request = NetRequest::new(url("https://example.com/"));
    let action = context.notify_redirect(&request, &url("https://example.com/next"), 303);

    assert_eq!(
        action,
        RedirectAction::Rewrite(url("https://elsewhere.example/"))
    );
    // The later interceptor was never consulted.
    assert_eq!(vetoer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_no_interceptors_follows_redirects() {
    let context = NetContext::new();
    let request = NetRequest::new(url("https://example.com/"));
    assert_eq!(
        context.notify_redirect(&request, &url("https://example.com/next"), 302),
        RedirectAction::Follow
    );
}
