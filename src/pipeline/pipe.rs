// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Pipeline orchestrator.

use std::thread::{self, Scope};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use super::stage::{Sink, Source, TerminalSignal, Valve};
use crate::core::{Context, Result};
use crate::types::Region;

/// A source, an optional chain of valves, and a sink.
///
/// Every hop is a rendezvous channel, so at most one region is in flight
/// between two adjacent stages and a slow sink throttles everything upstream:
///
/// ```text
/// [Source] --> chan a --> [Valve] --> chan b --> [Valve] --> chan c --> [Sink]
/// ```
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::fs::File;
/// use regionpipe::{BufferPool, Context, Pipe, ReaderSource, WriterSink};
///
/// let pool = BufferPool::new(64 * 1024, 8);
/// let source = ReaderSource::new(File::open("in.bin")?, 0, pool)?;
/// let sink = WriterSink::new(File::create("out.bin")?);
///
/// Pipe::new(source, sink).run(&Context::background())?;
/// # Ok(())
/// # }
/// ```
pub struct Pipe {
    source: Box<dyn Source>,
    sink: Box<dyn Sink>,
    valves: Vec<Box<dyn Valve>>,
}

impl Pipe {
    /// Connect `source` directly to `sink`.
    pub fn new(source: impl Source + 'static, sink: impl Sink + 'static) -> Self {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
            valves: Vec::new(),
        }
    }

    /// Append a valve. Regions pass through valves in the order they are added.
    pub fn with_valve(mut self, valve: impl Valve + 'static) -> Self {
        self.valves.push(Box::new(valve));
        self
    }

    /// Append several valves, in order.
    pub fn with_valves(mut self, valves: impl IntoIterator<Item = Box<dyn Valve>>) -> Self {
        self.valves.extend(valves);
        self
    }

    /// Number of valves between source and sink.
    pub fn valve_count(&self) -> usize {
        self.valves.len()
    }

    /// Run the pipe to completion.
    ///
    /// Wires the stages together, runs all of them concurrently and resolves
    /// to the first terminal signal: the sink's outcome, the first stage
    /// failure, or cancellation/deadline expiry of `ctx`. As soon as that
    /// signal is seen every remaining stage is canceled. The call returns
    /// once all stage threads have exited.
    pub fn run(&self, ctx: &Context) -> Result<()> {
        let ctx = ctx.child();
        let signal = TerminalSignal::new();
        let started = Instant::now();

        debug!(valves = self.valves.len(), "starting pipe");

        let result = thread::scope(|s| {
            let (first, last) = self.open(s, &ctx, &signal);
            let ctx = &ctx;

            let errs = signal.reporter();
            s.spawn(move || self.source.write(ctx, first, errs));

            let done = signal.completion();
            s.spawn(move || self.sink.read(ctx, last, done));

            let result = signal.wait(ctx);
            match &result {
                Err(err) if err.is_cancellation() => ctx.cancel_with(err.clone()),
                _ => ctx.cancel(),
            }
            result
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => debug!(elapsed_ms, "pipe completed"),
            Err(err) => warn!(elapsed_ms, error = %err, "pipe failed"),
        }
        result
    }

    /// Create the hand-off channels, starting from the sink side.
    ///
    /// Each valve needs its output before it can hand back its input, so the
    /// chain is built back to front. Returns the sender the source writes
    /// into and the receiver the sink reads from.
    fn open<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        ctx: &Context,
        signal: &TerminalSignal,
    ) -> (Sender<Region>, Receiver<Region>) {
        let (mut out, last) = bounded(0);
        for valve in self.valves.iter().rev() {
            out = valve.open(scope, ctx, out, signal.reporter());
        }
        (out, last)
    }
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("valves", &self.valves.len())
            .finish()
    }
}
