// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Cooperative cancellation shared by every stage of a run.
//!
//! A [`Context`] is a cheap, cloneable token. Canceling it disconnects an
//! internal channel, which wakes every `select!` that includes it, so a stage
//! blocked on a hand-off unblocks promptly instead of waiting forever.
//! Deadlines are enforced the same way through a `crossbeam_channel::at` timer.
//!
//! Contexts form a tree: [`Context::child`] derives a token that is canceled
//! whenever its parent is, while canceling the child leaves the parent alone.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};

use crossbeam_channel::{at, bounded, never, select, Receiver, Sender};

use super::error::{PipelineError, Result};

/// Outcome of a cancellation-guarded channel operation.
#[derive(Debug)]
pub enum Flow<T> {
    /// The operation completed.
    Ready(T),
    /// The other side of the channel is gone.
    Closed,
    /// The context was canceled or its deadline expired first.
    Canceled(PipelineError),
}

/// Cancellation token with an optional deadline.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    deadline: Option<Instant>,
    /// First cancellation cause; set exactly once.
    cause: OnceLock<PipelineError>,
    /// Dropping this sender disconnects `done`.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        let (trigger, done) = bounded(0);
        Self {
            deadline,
            cause: OnceLock::new(),
            trigger: Mutex::new(Some(trigger)),
            done,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self, cause: PipelineError) {
        if self.cause.set(cause.clone()).is_err() {
            return;
        }
        drop(lock(&self.trigger).take());

        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(cause.clone());
        }
    }
}

impl Context {
    /// A root context that is never canceled on its own and has no deadline.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    /// A root context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner::new(Instant::now().checked_add(timeout))),
        }
    }

    /// A root context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(Inner::new(Some(deadline))),
        }
    }

    /// Derive a context that is canceled together with this one.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a child whose deadline is the earlier of the parent's and `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Instant::now().checked_add(timeout))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        let child = Arc::new(Inner::new(deadline));

        // `cancel` sets the cause before draining, so check it under the lock.
        let mut children = lock(&self.inner.children);
        match self.inner.cause.get() {
            Some(cause) => child.cancel(cause.clone()),
            None => {
                children.retain(|c| c.strong_count() > 0);
                children.push(Arc::downgrade(&child));
            }
        }
        drop(children);

        Self { inner: child }
    }

    /// Cancel this context and all of its descendants.
    pub fn cancel(&self) {
        self.cancel_with(PipelineError::Canceled);
    }

    /// Cancel with a specific cause. Only the first cause is kept.
    pub fn cancel_with(&self, cause: PipelineError) {
        self.inner.cancel(cause);
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<PipelineError> {
        if let Some(cause) = self.inner.cause.get() {
            return Some(cause.clone());
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(PipelineError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Check whether the context has been canceled or has expired.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Channel that disconnects once the context is canceled.
    ///
    /// Deadline expiry is not reflected here; pair it with [`Context::timer`].
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// One-shot timer firing at the deadline (never fires without one).
    ///
    /// Each call creates a fresh timer, since a timer delivers a single tick.
    pub fn timer(&self) -> Receiver<Instant> {
        match self.inner.deadline {
            Some(deadline) => at(deadline),
            None => never(),
        }
    }

    fn cause_or_canceled(&self) -> PipelineError {
        self.inner
            .cause
            .get()
            .cloned()
            .unwrap_or(PipelineError::Canceled)
    }

    /// Send `value`, giving up if the context finishes first.
    pub fn send<T>(&self, tx: &Sender<T>, value: T) -> Flow<()> {
        if let Some(err) = self.err() {
            return Flow::Canceled(err);
        }
        let done = self.done();
        let timer = self.timer();
        select! {
            send(tx, value) -> res => match res {
                Ok(()) => Flow::Ready(()),
                Err(_) => Flow::Closed,
            },
            recv(done) -> _ => Flow::Canceled(self.cause_or_canceled()),
            recv(timer) -> _ => Flow::Canceled(PipelineError::DeadlineExceeded),
        }
    }

    /// Receive a value, giving up if the context finishes first.
    pub fn recv<T>(&self, rx: &Receiver<T>) -> Flow<T> {
        if let Some(err) = self.err() {
            return Flow::Canceled(err);
        }
        let done = self.done();
        let timer = self.timer();
        select! {
            recv(rx) -> msg => match msg {
                Ok(value) => Flow::Ready(value),
                Err(_) => Flow::Closed,
            },
            recv(done) -> _ => Flow::Canceled(self.cause_or_canceled()),
            recv(timer) -> _ => Flow::Canceled(PipelineError::DeadlineExceeded),
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let done = self.done();
        let timer = self.timer();
        select! {
            recv(done) -> _ => Err(self.cause_or_canceled()),
            recv(timer) -> _ => Err(PipelineError::DeadlineExceeded),
            default(duration) => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("cause", &self.inner.cause.get())
            .finish()
    }
}
