//! Continuation tokens and the shared read buffer.
//!
//! A handler that works asynchronously resumes the pipeline through a
//! token: the one-shot [`HeadersAvailable`] token passed to
//! `process_request`, or the repeatable [`BytesAvailable`] token passed
//! to `read_response`. Tokens hold a weak back-reference to their job
//! that is severed when the token is used up or the job is killed, so a
//! stale invocation never touches dead job state. Invocations from
//! other threads are re-posted onto the network thread.

use crate::base::runner::NetTaskRunner;
use crate::job::bridge::{self, JobShared};
use std::sync::{Arc, Mutex, Weak};

/// A refcounted read destination, the buffer offered to
/// `read_response`.
///
/// Shared so that a pending read's destination can be retained by the
/// bytes token and offered to the handler again when it signals
/// readiness.
#[derive(Clone)]
pub struct IoBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl IoBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0; capacity])),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    /// Run `f` with mutable access to the buffer contents.
    pub fn with_slice<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data.lock().unwrap();
        f(&mut data)
    }

    /// Copy out the first `n` bytes.
    pub fn copy_to_vec(&self, n: usize) -> Vec<u8> {
        let data = self.data.lock().unwrap();
        data[..n.min(data.len())].to_vec()
    }
}

impl std::fmt::Debug for IoBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// State shared by both token flavors: the severable job back-reference
/// and, for bytes tokens, the recorded pending-read destination.
struct TokenShared {
    job: Mutex<Option<Weak<JobShared>>>,
    runner: NetTaskRunner,
    dest: Mutex<Option<(IoBuffer, usize)>>,
}

impl TokenShared {
    fn new(job: Weak<JobShared>, runner: NetTaskRunner) -> Arc<Self> {
        Arc::new(Self {
            job: Mutex::new(Some(job)),
            runner,
            dest: Mutex::new(None),
        })
    }

    /// The owning job, unless the token was detached or the job is gone.
    fn upgrade(&self) -> Option<Arc<JobShared>> {
        self.job.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }

    /// Sever the back-reference. Later invocations become no-ops.
    fn detach(&self) {
        self.job.lock().unwrap().take();
        self.dest.lock().unwrap().take();
    }
}

/// One-shot continuation handed to `process_request`.
///
/// The handler invokes it once response headers can be supplied. The
/// first invocation consumes the token; repeat invocations are no-ops.
#[derive(Clone)]
pub struct HeadersAvailable {
    inner: Arc<TokenShared>,
}

impl HeadersAvailable {
    pub(crate) fn new(job: Weak<JobShared>, runner: NetTaskRunner) -> Self {
        Self {
            inner: TokenShared::new(job, runner),
        }
    }

    /// Signal that response headers are available.
    ///
    /// Callable from any thread; off-thread invocations are re-posted.
    pub fn notify(&self) {
        if !self.inner.runner.currently_on() {
            let token = self.clone();
            self.inner.runner.post(move || token.notify());
            return;
        }
        let Some(job) = self.inner.upgrade() else {
            return;
        };
        // One-shot: sever before acting so a reentrant invocation from
        // inside response_head() finds the token already dead.
        self.inner.detach();
        bridge::send_headers(&job);
    }

    /// Cancel the request instead of continuing it.
    pub fn cancel(&self) {
        if !self.inner.runner.currently_on() {
            let token = self.clone();
            self.inner.runner.post(move || token.cancel());
            return;
        }
        if let Some(job) = self.inner.upgrade() {
            bridge::kill_shared(&job);
        }
    }

    pub(crate) fn detach(&self) {
        self.inner.detach();
    }
}

/// Repeatable continuation handed to `read_response`.
///
/// After reporting a pending read, the handler invokes this token each
/// time bytes become available. It stays valid until the body completes
/// or the job is killed.
#[derive(Clone)]
pub struct BytesAvailable {
    inner: Arc<TokenShared>,
}

impl BytesAvailable {
    pub(crate) fn new(job: Weak<JobShared>, runner: NetTaskRunner) -> Self {
        Self {
            inner: TokenShared::new(job, runner),
        }
    }

    /// Signal that response bytes are available.
    ///
    /// Honored only while the job is streaming with a read pending;
    /// anything else is a no-op. Callable from any thread.
    pub fn notify(&self) {
        if !self.inner.runner.currently_on() {
            let token = self.clone();
            self.inner.runner.post(move || token.notify());
            return;
        }
        let Some(job) = self.inner.upgrade() else {
            return;
        };
        bridge::retry_pending_read(&job, self);
    }

    /// Cancel the request instead of continuing it.
    pub fn cancel(&self) {
        if !self.inner.runner.currently_on() {
            let token = self.clone();
            self.inner.runner.post(move || token.cancel());
            return;
        }
        if let Some(job) = self.inner.upgrade() {
            bridge::kill_shared(&job);
        }
    }

    pub(crate) fn set_destination(&self, dest: IoBuffer, dest_size: usize) {
        *self.inner.dest.lock().unwrap() = Some((dest, dest_size));
    }

    pub(crate) fn destination(&self) -> Option<(IoBuffer, usize)> {
        self.inner.dest.lock().unwrap().clone()
    }

    pub(crate) fn clear_destination(&self) {
        self.inner.dest.lock().unwrap().take();
    }

    pub(crate) fn detach(&self) {
        self.inner.detach();
    }
}
