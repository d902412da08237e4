// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Closure-backed valves.
//!
//! ```
//! use regionpipe::pipeline::valve;
//!
//! // Upper-case every region in place.
//! let upper = valve::map(|mut region: regionpipe::Region| {
//!     region.data.as_mut_slice().make_ascii_uppercase();
//!     Ok(region)
//! });
//! # let _ = upper;
//! ```

use std::sync::{Mutex, PoisonError};
use std::thread::Scope;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::stage::{Reporter, Valve};
use crate::core::{Context, Flow, Result};
use crate::types::Region;

/// Valve applying a closure to every region.
///
/// A closure error drops the failing region, is reported once, and stops the
/// valve; its output is then closed.
pub struct FnValve<F> {
    f: Mutex<F>,
}

/// Build a valve that transforms each region with `f`.
pub fn map<F>(f: F) -> FnValve<F>
where
    F: FnMut(Region) -> Result<Region> + Send,
{
    FnValve { f: Mutex::new(f) }
}

/// Build a valve that observes each region and forwards it unchanged.
pub fn inspect<F>(mut f: F) -> FnValve<impl FnMut(Region) -> Result<Region> + Send>
where
    F: FnMut(&Region) -> Result<()> + Send,
{
    map(move |region| f(&region).map(|()| region))
}

impl<F> FnValve<F>
where
    F: FnMut(Region) -> Result<Region> + Send,
{
    fn pump(&self, ctx: &Context, input: Receiver<Region>, sink: Sender<Region>, errs: Reporter) {
        while let Flow::Ready(region) = ctx.recv(&input) {
            let result = {
                let mut f = self.f.lock().unwrap_or_else(PoisonError::into_inner);
                f(region)
            };
            let region = match result {
                Ok(region) => region,
                Err(err) => {
                    errs.fail(err);
                    return;
                }
            };
            if !matches!(ctx.send(&sink, region), Flow::Ready(())) {
                return;
            }
        }
    }
}

impl<F> Valve for FnValve<F>
where
    F: FnMut(Region) -> Result<Region> + Send,
{
    fn open<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
        ctx: &Context,
        sink: Sender<Region>,
        errs: Reporter,
    ) -> Sender<Region> {
        let (tx, rx) = bounded(0);
        let ctx = ctx.clone();
        scope.spawn(move || self.pump(&ctx, rx, sink, errs));
        tx
    }
}

impl<F> std::fmt::Debug for FnValve<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnValve").finish_non_exhaustive()
    }
}
