//! The per-request job bridging a scheme handler to the host's
//! pull-based job interface.
//!
//! The host drives a [`SchemeJob`] the way it drives any network job:
//! `start()`, then `read_raw()` in a loop once headers are complete,
//! with `kill()` possible at any point. The handler underneath is
//! push-style and asynchronous; the bridge adapts between the two with
//! continuation tokens and an explicit state machine.

use crate::base::runner::NetTaskRunner;
use crate::base::status::RequestStatus;
use crate::cookies::store::{CookieAccessPolicy, CookieStore};
use crate::job::cookie_pipeline;
use crate::job::token::{BytesAvailable, HeadersAvailable, IoBuffer};
use crate::scheme::handler::{ResponseRead, SchemeHandler};
use crate::urlrequest::request::NetRequest;
use crate::urlrequest::response::NetResponse;
use std::sync::{Arc, Mutex};
use url::Url;

/// Lifecycle states of a [`SchemeJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    NotStarted,
    /// Started; cookie read phase and the handler's headers are pending.
    HeadersPending,
    /// Headers complete; body bytes are being pulled.
    Streaming,
    Completed,
    Canceled,
}

/// The outcome of a single `read_raw` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were delivered into the buffer.
    Read(usize),
    /// No bytes yet; `on_read_complete` follows once the handler
    /// signals its bytes token.
    Pending,
    /// Clean end of stream.
    Eof,
}

/// Host-side notifications, delivered on the network thread.
///
/// Note that a notification may arrive from within a host-invoked
/// operation: a fully synchronous handler completes headers before
/// `start()` returns.
pub trait JobDelegate: Send + Sync {
    /// Response headers (and the cookie write phase) are complete;
    /// `response_info()` is now meaningful and reads may begin.
    fn on_headers_complete(&self) {}

    /// A previously-pending read completed with `nread` bytes in the
    /// buffer originally passed to `read_raw`.
    fn on_read_complete(&self, _nread: usize) {}

    /// Terminal notification: the job completed, failed, or was
    /// canceled. Delivered at most once.
    fn on_done(&self, _status: RequestStatus) {}
}

pub(crate) struct JobCore {
    pub(crate) state: JobState,
    pub(crate) status: RequestStatus,
    pub(crate) request: NetRequest,
    pub(crate) response: Option<NetResponse>,
    /// Body bytes left to deliver; -1 = unknown.
    pub(crate) remaining: i64,
    pub(crate) redirect_url: Option<Url>,
    pub(crate) headers_token: Option<HeadersAvailable>,
    pub(crate) bytes_token: Option<BytesAvailable>,
    pub(crate) response_cookies: Vec<String>,
    pub(crate) cookie_save_index: usize,
    /// Guards the one-shot header pull against reentrant token fires.
    pub(crate) headers_pulled: bool,
    /// Set while read_response is on the stack; a bytes token fired
    /// from inside it is a protocol violation.
    pub(crate) read_in_flight: bool,
    pub(crate) done_notified: bool,
}

pub(crate) struct JobShared {
    pub(crate) runner: NetTaskRunner,
    pub(crate) cookie_store: Arc<dyn CookieStore>,
    pub(crate) cookie_policy: Arc<dyn CookieAccessPolicy>,
    pub(crate) handler: Arc<dyn SchemeHandler>,
    pub(crate) delegate: Arc<dyn JobDelegate>,
    pub(crate) core: Mutex<JobCore>,
}

/// A request job backed by an embedder-supplied [`SchemeHandler`].
///
/// All methods must be called on the designated network thread.
pub struct SchemeJob {
    shared: Arc<JobShared>,
}

impl SchemeJob {
    pub(crate) fn new(
        runner: NetTaskRunner,
        cookie_store: Arc<dyn CookieStore>,
        cookie_policy: Arc<dyn CookieAccessPolicy>,
        request: NetRequest,
        handler: Arc<dyn SchemeHandler>,
        delegate: Arc<dyn JobDelegate>,
    ) -> Self {
        Self {
            shared: Arc::new(JobShared {
                runner,
                cookie_store,
                cookie_policy,
                handler,
                delegate,
                core: Mutex::new(JobCore {
                    state: JobState::NotStarted,
                    status: RequestStatus::Success,
                    request,
                    response: None,
                    remaining: 0,
                    redirect_url: None,
                    headers_token: None,
                    bytes_token: None,
                    response_cookies: Vec::new(),
                    cookie_save_index: 0,
                    headers_pulled: false,
                    read_in_flight: false,
                    done_notified: false,
                }),
            }),
        }
    }

    /// Begin the request: cookie read phase, then the handler.
    pub fn start(&self) {
        self.shared.runner.assert_currently_on();
        let url = {
            let mut core = self.shared.core.lock().unwrap();
            assert_eq!(core.state, JobState::NotStarted, "job started twice");
            core.state = JobState::HeadersPending;
            core.request.url().clone()
        };
        tracing::debug!(url = %url, "starting scheme handler job");
        cookie_pipeline::add_cookie_header_and_start(&self.shared);
    }

    /// Cancel the request. The handler is told, live continuation
    /// tokens are synchronously detached, and the delegate is notified
    /// once.
    pub fn kill(&self) {
        self.shared.runner.assert_currently_on();
        kill_shared(&self.shared);
    }

    /// Pull up to `dest_size` body bytes into `dest`.
    ///
    /// On [`ReadOutcome::Pending`] the destination is retained; the
    /// delegate's `on_read_complete` reports the eventual byte count in
    /// the same buffer.
    pub fn read_raw(&self, dest: &IoBuffer, dest_size: usize) -> ReadOutcome {
        self.shared.runner.assert_currently_on();
        debug_assert!(dest_size > 0);
        {
            let core = self.shared.core.lock().unwrap();
            if core.state != JobState::Streaming {
                return ReadOutcome::Eof;
            }
        }
        match do_read(&self.shared, dest, dest_size) {
            ReadOutcome::Eof => {
                notify_done(&self.shared, RequestStatus::Success);
                ReadOutcome::Eof
            }
            outcome => outcome,
        }
    }

    /// The synthesized response, once headers are complete.
    pub fn response_info(&self) -> Option<NetResponse> {
        self.shared.runner.assert_currently_on();
        self.shared.core.lock().unwrap().response.clone()
    }

    /// Whether this job answers with a redirect.
    ///
    /// A handler-supplied redirect URL reports as a synthetic 303,
    /// regardless of any content length also supplied. Absent that, a
    /// 302/303 response status with a Location header reports with the
    /// response's own status.
    pub fn is_redirect(&self) -> Option<(Url, u16)> {
        self.shared.runner.assert_currently_on();
        let core = self.shared.core.lock().unwrap();

        if let Some(url) = &core.redirect_url {
            return Some((url.clone(), 303));
        }

        if let Some(response) = &core.response {
            let status = response.status();
            if status == 302 || status == 303 {
                if let Some(location) = response.header("location") {
                    match core.request.url().join(location) {
                        Ok(url) => return Some((url, status)),
                        Err(err) => {
                            tracing::warn!(location = %location, error = %err,
                                "ignoring unparseable Location header");
                        }
                    }
                }
            }
        }

        None
    }

    pub fn mime_type(&self) -> Option<String> {
        self.shared.runner.assert_currently_on();
        let core = self.shared.core.lock().unwrap();
        core.response
            .as_ref()
            .map(|r| r.mime_type().to_string())
            .filter(|m| !m.is_empty())
    }

    /// Every Set-Cookie line of the response, in response order.
    pub fn response_cookies(&self) -> Vec<String> {
        self.shared.runner.assert_currently_on();
        let core = self.shared.core.lock().unwrap();
        core.response
            .as_ref()
            .map(|r| r.set_cookie_lines())
            .unwrap_or_default()
    }

    pub fn status(&self) -> RequestStatus {
        self.shared.runner.assert_currently_on();
        self.shared.core.lock().unwrap().status
    }

    pub fn state(&self) -> JobState {
        self.shared.runner.assert_currently_on();
        self.shared.core.lock().unwrap().state
    }
}

impl Drop for SchemeJob {
    fn drop(&mut self) {
        // The host released the request; sever token back-references so
        // late continuations cannot act on the dying job.
        let (headers_token, bytes_token) = {
            let mut core = self.shared.core.lock().unwrap();
            (core.headers_token.take(), core.bytes_token.take())
        };
        if let Some(token) = headers_token {
            token.detach();
        }
        if let Some(token) = bytes_token {
            token.detach();
        }
    }
}

/// Kill the job from either the host (`kill()`) or a token's `cancel()`.
pub(crate) fn kill_shared(shared: &Arc<JobShared>) {
    // Notify the handler that the request has been canceled.
    shared.handler.cancel();

    // Sever token back-references synchronously: a callback arriving
    // after this point is a no-op instead of touching dead state.
    let (headers_token, bytes_token) = {
        let mut core = shared.core.lock().unwrap();
        (core.headers_token.take(), core.bytes_token.take())
    };
    if let Some(token) = headers_token {
        token.detach();
    }
    if let Some(token) = bytes_token {
        token.detach();
    }

    notify_canceled(shared);
}

/// The headers token fired: pull headers from the handler once, then
/// run the cookie write phase.
pub(crate) fn send_headers(shared: &Arc<JobShared>) {
    {
        let mut core = shared.core.lock().unwrap();
        // The one-shot token is used up either way.
        core.headers_token = None;
        if core.state != JobState::HeadersPending || core.headers_pulled {
            return;
        }
        core.headers_pulled = true;
    }

    let head = shared.handler.response_head();

    {
        let mut core = shared.core.lock().unwrap();
        if core.state != JobState::HeadersPending {
            // Killed while the handler was assembling headers.
            return;
        }

        let mut response = head.response;
        core.remaining = head.content_length;

        if let Some(redirect) = head.redirect_url.filter(|s| !s.is_empty()) {
            match Url::parse(&redirect) {
                Ok(url) => core.redirect_url = Some(url),
                Err(err) => {
                    tracing::warn!(url = %redirect, error = %err,
                        "ignoring unparseable redirect URL from handler");
                }
            }
        }

        if core.remaining > 0 {
            response.set_expected_content_size(core.remaining);
        }
        core.response = Some(response);
    }

    cookie_pipeline::save_cookies_and_notify_headers_complete(shared);
}

/// A bytes token fired: retry the recorded pending read.
pub(crate) fn retry_pending_read(shared: &Arc<JobShared>, token: &BytesAvailable) {
    {
        let core = shared.core.lock().unwrap();
        // Honored only while streaming with a read pending.
        if core.state != JobState::Streaming || !core.status.is_io_pending() {
            return;
        }
        if core.read_in_flight {
            debug_assert!(false, "bytes token fired from within read_response");
            return;
        }
    }
    let Some((dest, dest_size)) = token.destination() else {
        return;
    };

    match do_read(shared, &dest, dest_size) {
        ReadOutcome::Read(n) => {
            {
                let mut core = shared.core.lock().unwrap();
                // Clear the IO-pending status.
                core.status = RequestStatus::Success;
            }
            token.clear_destination();
            shared.delegate.on_read_complete(n);
        }
        ReadOutcome::Eof => {
            // All done.
            token.detach();
            shared.core.lock().unwrap().bytes_token = None;
            notify_done(shared, RequestStatus::Success);
        }
        ReadOutcome::Pending => {
            // Still pending; the destination stays recorded and the
            // next token invocation retries again.
        }
    }
}

/// One read attempt against the handler, shared by the synchronous pull
/// path and the token retry path. Terminal notifications are the
/// caller's responsibility.
fn do_read(shared: &Arc<JobShared>, dest: &IoBuffer, dest_size: usize) -> ReadOutcome {
    let (handler, token, read_size) = {
        let mut core = shared.core.lock().unwrap();

        if core.remaining == 0 {
            // No more data to read.
            return ReadOutcome::Eof;
        }
        let mut read_size = dest_size;
        if core.remaining > 0 && (core.remaining as usize) < read_size {
            // The handler knows the content size beforehand.
            read_size = core.remaining as usize;
        }

        // The bytes token is created lazily and used until the request
        // is completed.
        let token = core
            .bytes_token
            .get_or_insert_with(|| {
                BytesAvailable::new(Arc::downgrade(shared), shared.runner.clone())
            })
            .clone();
        core.read_in_flight = true;
        (Arc::clone(&shared.handler), token, read_size)
    };

    let outcome = dest.with_slice(|buf| {
        let take = read_size.min(buf.len());
        handler.read_response(&mut buf[..take], &token)
    });

    let mut core = shared.core.lock().unwrap();
    core.read_in_flight = false;
    match outcome {
        ResponseRead::Complete => ReadOutcome::Eof,
        ResponseRead::Ready(n) if n > 0 => {
            let n = n.min(read_size);
            if core.remaining > 0 {
                core.remaining -= n as i64;
            }
            ReadOutcome::Read(n)
        }
        ResponseRead::Ready(_) => {
            debug_assert!(false, "read_response returned Ready(0); report Pending instead");
            record_pending(&mut core, token, dest, read_size)
        }
        ResponseRead::Pending => record_pending(&mut core, token, dest, read_size),
    }
}

fn record_pending(
    core: &mut JobCore,
    token: BytesAvailable,
    dest: &IoBuffer,
    read_size: usize,
) -> ReadOutcome {
    if !core.status.is_io_pending() {
        core.status = RequestStatus::IoPending;
        token.set_destination(dest.clone(), read_size);
    }
    ReadOutcome::Pending
}

pub(crate) fn notify_canceled(shared: &Arc<JobShared>) {
    notify_done(shared, RequestStatus::Canceled);
}

/// Terminal transition; the delegate hears about it at most once.
pub(crate) fn notify_done(shared: &Arc<JobShared>, status: RequestStatus) {
    let tokens = {
        let mut core = shared.core.lock().unwrap();
        if core.done_notified {
            return;
        }
        core.done_notified = true;
        core.status = status;
        core.state = if status.is_canceled() {
            JobState::Canceled
        } else {
            JobState::Completed
        };
        (core.headers_token.take(), core.bytes_token.take())
    };
    if let Some(token) = tokens.0 {
        token.detach();
    }
    if let Some(token) = tokens.1 {
        token.detach();
    }

    tracing::debug!(?status, "scheme handler job done");
    shared.delegate.on_done(status);
}
