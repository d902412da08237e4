// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stage contracts and terminal signaling.
//!
//! A run is a chain `source -> valve* -> sink` connected by rendezvous
//! channels. Output channels are handed to stages by value, so a stage closes
//! its output simply by returning (dropping the `Sender`).
//!
//! Terminal outcomes travel on a separate, unbounded side channel. Stages get
//! a single-use handle onto it ([`Reporter`] or [`Completion`]) whose reporting
//! method consumes the handle, so a stage cannot report twice and a late
//! report never blocks.

use std::sync::Arc;
use std::thread::Scope;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::warn;

use crate::core::{Context, Flow, PipelineError, Result};
use crate::types::Region;

/// Producer role: emits regions onto `sink`, then closes it.
///
/// Implementations drop `sink` when they return, which signals end-of-data
/// downstream. On an unrecoverable failure they report through `errs` and
/// stop. Every blocking send must go through [`Context::send`] so the stage
/// notices cancellation.
pub trait Source: Send + Sync {
    /// Produce regions until exhausted, failed, or canceled.
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter);
}

/// Consumer role: drains regions from `source` and reports exactly once.
pub trait Sink: Send + Sync {
    /// Consume regions until the channel closes or the context is canceled.
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion);
}

/// Transform role: an in-line stage between two channels.
///
/// `open` must not block. It is given the stage's output and returns the
/// sender its upstream writes into; the forwarding work runs on a thread
/// spawned on `scope`, which must close (drop) `sink` when its input is
/// exhausted, exactly like a [`Source`].
pub trait Valve: Send + Sync {
    /// Start the valve and return its input channel.
    fn open<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        ctx: &Context,
        sink: Sender<Region>,
        errs: Reporter,
    ) -> Sender<Region>;
}

/// Single-use failure report for sources and valves.
#[derive(Debug)]
pub struct Reporter {
    tx: Sender<Result<()>>,
}

impl Reporter {
    /// Another handle onto the same terminal channel, for nested stages.
    pub fn fork(&self) -> Reporter {
        Reporter {
            tx: self.tx.clone(),
        }
    }

    /// Report an unrecoverable failure. Consumes the handle.
    pub fn fail(self, err: PipelineError) {
        if !err.is_cancellation() {
            warn!(error = %err, fields = ?err.log_fields(), "stage failed");
        }
        // The run may already be resolved; nobody listening is fine.
        let _ = self.tx.send(Err(err));
    }
}

/// Single-use terminal outcome for sinks.
#[derive(Debug)]
#[must_use = "a sink must report its outcome"]
pub struct Completion {
    tx: Sender<Result<()>>,
}

impl Completion {
    /// Report the sink's outcome. Consumes the handle.
    pub fn complete(self, result: Result<()>) {
        if let Err(err) = &result {
            if !err.is_cancellation() {
                warn!(error = %err, fields = ?err.log_fields(), "sink failed");
            }
        }
        let _ = self.tx.send(result);
    }
}

/// Shared terminal side channel for one run.
#[derive(Debug)]
pub struct TerminalSignal {
    tx: Sender<Result<()>>,
    rx: Receiver<Result<()>>,
}

impl TerminalSignal {
    /// Create an empty terminal channel.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Handle for a source or valve.
    pub fn reporter(&self) -> Reporter {
        Reporter {
            tx: self.tx.clone(),
        }
    }

    /// Handle for a sink.
    pub fn completion(&self) -> Completion {
        Completion {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the first terminal value, or for `ctx` to finish.
    ///
    /// Returns [`PipelineError::Incomplete`] if every handle is dropped
    /// without reporting.
    pub fn wait(self, ctx: &Context) -> Result<()> {
        let TerminalSignal { tx, rx } = self;
        drop(tx);
        match ctx.recv(&rx) {
            Flow::Ready(result) => result,
            Flow::Closed => Err(PipelineError::Incomplete),
            Flow::Canceled(err) => Err(err),
        }
    }
}

impl Default for TerminalSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Source + ?Sized> Source for Box<T> {
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter) {
        (**self).write(ctx, sink, errs)
    }
}

impl<T: Source + ?Sized> Source for Arc<T> {
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter) {
        (**self).write(ctx, sink, errs)
    }
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion) {
        (**self).read(ctx, source, done)
    }
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion) {
        (**self).read(ctx, source, done)
    }
}

impl<T: Valve + ?Sized> Valve for Box<T> {
    fn open<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        ctx: &Context,
        sink: Sender<Region>,
        errs: Reporter,
    ) -> Sender<Region> {
        (**self).open(scope, ctx, sink, errs)
    }
}
