//! The designated network-processing thread.
//!
//! Every registry, job, and cookie operation in this crate is affine to
//! one thread. [`NetTaskRunner`] is that thread's task queue: any thread
//! may [`post`](NetTaskRunner::post) work onto it, but only the thread
//! that created the runner may drain it. Public entry points enforce the
//! affinity with runtime assertions instead of locking.

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the designated network thread's task queue.
///
/// Cloning produces another handle to the same queue. The runner binds
/// to the thread that constructs it; [`run_until_idle`](Self::run_until_idle)
/// must be called from that thread.
#[derive(Clone)]
pub struct NetTaskRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
    thread: ThreadId,
}

impl NetTaskRunner {
    /// Create a runner bound to the current thread.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(RunnerInner {
                tx,
                rx: Mutex::new(rx),
                thread: thread::current().id(),
            }),
        }
    }

    /// True if called from the designated network thread.
    pub fn currently_on(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Panic unless called from the designated network thread.
    ///
    /// Callers on other threads must [`post`](Self::post) their call
    /// instead.
    pub fn assert_currently_on(&self) {
        assert!(
            self.currently_on(),
            "called off the network task runner thread; post the call instead"
        );
    }

    /// Queue a task for execution on the designated thread.
    ///
    /// Callable from any thread. Tasks run in post order the next time
    /// the network thread drains the queue.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // A closed receiver means the runner is being torn down; late
        // posts are dropped on the floor like any other stale callback.
        let _ = self.inner.tx.send(Box::new(task));
    }

    /// Run queued tasks until the queue is empty, including tasks posted
    /// by the tasks themselves. Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        self.assert_currently_on();
        let mut ran = 0;
        loop {
            let task = {
                let mut rx = self.inner.rx.lock().unwrap();
                match rx.try_recv() {
                    Ok(task) => task,
                    Err(_) => break,
                }
            };
            task();
            ran += 1;
        }
        ran
    }
}

impl Default for NetTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NetTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetTaskRunner")
            .field("thread", &self.inner.thread)
            .finish()
    }
}
