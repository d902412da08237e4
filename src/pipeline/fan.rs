// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Fan-out / fan-in over several independent sources.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, trace};

use super::stage::{Reporter, Source};
use crate::core::{Context, Flow};
use crate::types::Region;

/// Composite source running every nested source concurrently.
///
/// Each nested source writes into its own private channel; one forwarding
/// thread per source copies regions onto the shared output, which is closed
/// only after every forwarder has finished. Regions from one nested source
/// keep their relative order; the interleaving between sources is unspecified.
pub struct Fan {
    sources: Vec<Box<dyn Source>>,
}

impl Fan {
    /// Combine `sources` into one.
    pub fn new<S>(sources: impl IntoIterator<Item = S>) -> Self
    where
        S: Source + 'static,
    {
        Self {
            sources: sources
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Source>)
                .collect(),
        }
    }

    /// Combine already boxed sources.
    pub fn from_boxed(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }

    /// Number of nested sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if there are no nested sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Source for Fan {
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter) {
        debug!(sources = self.sources.len(), "fanning in sources");

        thread::scope(|s| {
            for (index, source) in self.sources.iter().enumerate() {
                let (tx, rx) = bounded(0);

                let nested = errs.fork();
                s.spawn(move || source.write(ctx, tx, nested));

                let out = sink.clone();
                s.spawn(move || pass(ctx, index, rx, out));
            }
        });
        // Every forwarder has exited; dropping `sink` closes the shared output.
    }
}

/// Forward regions from one private channel onto the shared output.
fn pass(ctx: &Context, index: usize, rx: Receiver<Region>, out: Sender<Region>) {
    let mut forwarded = 0u64;
    while let Flow::Ready(region) = ctx.recv(&rx) {
        if !matches!(ctx.send(&out, region), Flow::Ready(())) {
            break;
        }
        forwarded += 1;
    }
    trace!(source = index, forwarded, "fan branch drained");
}

impl std::fmt::Debug for Fan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fan")
            .field("sources", &self.sources.len())
            .finish()
    }
}
