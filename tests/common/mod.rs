// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use regionpipe::{Completion, Context, Flow, PipelineError, Region, Reporter, Result, Sink, Source};

// ============================================================================
// Test Stages
// ============================================================================

/// Emits fixed regions in order, then optionally fails.
pub struct VecSource {
    pub regions: Vec<(i64, &'static str)>,
    pub err: Option<&'static str>,
}

impl VecSource {
    pub fn new(regions: &[(i64, &'static str)]) -> Self {
        Self {
            regions: regions.to_vec(),
            err: None,
        }
    }

    pub fn failing(regions: &[(i64, &'static str)], err: &'static str) -> Self {
        Self {
            regions: regions.to_vec(),
            err: Some(err),
        }
    }
}

impl Source for VecSource {
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter) {
        for &(offset, data) in &self.regions {
            if !matches!(ctx.send(&sink, Region::from_vec(offset, data)), Flow::Ready(())) {
                return;
            }
        }
        if let Some(err) = self.err {
            errs.fail(PipelineError::other(err));
        }
    }
}

/// Emits 16-byte regions forever (until canceled or the sink goes away).
pub struct EndlessSource;

impl Source for EndlessSource {
    fn write(&self, ctx: &Context, sink: Sender<Region>, _errs: Reporter) {
        let mut offset = 0;
        while let Flow::Ready(()) = ctx.send(&sink, Region::from_vec(offset, vec![7u8; 16])) {
            offset += 16;
        }
    }
}

/// Hands every region to a closure; the first error ends the sink.
pub struct FnSink<F> {
    f: Mutex<F>,
}

impl<F> FnSink<F>
where
    F: FnMut(Region) -> Result<()> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f: Mutex::new(f) }
    }
}

impl<F> Sink for FnSink<F>
where
    F: FnMut(Region) -> Result<()> + Send,
{
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion) {
        let mut f = self.f.lock().unwrap();
        let result = loop {
            match ctx.recv(&source) {
                Flow::Ready(region) => {
                    if let Err(err) = f(region) {
                        break Err(err);
                    }
                }
                Flow::Closed => break Ok(()),
                Flow::Canceled(err) => break Err(err),
            }
        };
        done.complete(result);
    }
}

/// Sink collecting (offset, bytes) pairs into shared storage.
pub fn collector() -> (
    FnSink<impl FnMut(Region) -> Result<()> + Send>,
    Arc<Mutex<Vec<(i64, Vec<u8>)>>>,
) {
    let read = Arc::new(Mutex::new(Vec::new()));
    let sink_read = Arc::clone(&read);
    let sink = FnSink::new(move |region: Region| {
        sink_read
            .lock()
            .unwrap()
            .push((region.offset, region.as_slice().to_vec()));
        Ok(())
    });
    (sink, read)
}

/// Owned copy of test regions for comparisons.
pub fn owned(regions: &[(i64, &'static str)]) -> Vec<(i64, Vec<u8>)> {
    regions
        .iter()
        .map(|&(offset, data)| (offset, data.as_bytes().to_vec()))
        .collect()
}

// ============================================================================
// Scratch Files
// ============================================================================

/// Path under the system temp dir unique to this process and test.
pub fn scratch_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("regionpipe_tests_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

/// Deterministic pseudo-random bytes (xorshift), so failures are reproducible.
pub fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Write `len` pseudo-random bytes to a fresh scratch file.
pub fn fill_file(name: &str, len: usize, seed: u64) -> PathBuf {
    let path = scratch_path(name);
    fs::write(&path, pseudo_random(len, seed)).unwrap();
    path
}

/// Assert two files are byte-for-byte identical, naming the first difference.
pub fn assert_same_contents(expected: &Path, actual: &Path) {
    let expected = fs::read(expected).unwrap();
    let actual = fs::read(actual).unwrap();
    assert_eq!(expected.len(), actual.len(), "file sizes differ");
    if let Some(pos) = expected.iter().zip(&actual).position(|(a, b)| a != b) {
        panic!("files differ at offset {pos}");
    }
}

/// Remove scratch files, ignoring ones that are already gone.
pub fn cleanup(paths: &[&Path]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}
