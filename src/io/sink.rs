// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Positional-write sinks.
//!
//! Buffers carry a handle to the pool they came from, so releasing a region
//! after it is written is just dropping it.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, trace};

use super::write_at::{write_region, WriteAt};
use crate::core::{Context, Flow, PipelineError, Result};
use crate::pipeline::{Completion, Sink};
use crate::types::Region;

fn write_error(region: &Region, err: std::io::Error) -> PipelineError {
    PipelineError::io(
        format!("writing {} bytes at offset {}", region.len(), region.offset),
        err,
    )
}

/// Sink writing every region through a single positional writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    target: W,
}

impl<W: WriteAt + Send + Sync> WriterSink<W> {
    /// Write regions into `target`.
    pub fn new(target: W) -> Self {
        Self { target }
    }

    /// The underlying target.
    pub fn target(&self) -> &W {
        &self.target
    }
}

impl<W: WriteAt + Send + Sync> Sink for WriterSink<W> {
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion) {
        let mut written = 0u64;
        let result = loop {
            let region = match ctx.recv(&source) {
                Flow::Ready(region) => region,
                Flow::Closed => break Ok(()),
                Flow::Canceled(err) => break Err(err),
            };

            if let Err(e) = write_region(&self.target, &region) {
                break Err(write_error(&region, e));
            }
            trace!(offset = region.offset, len = region.len(), "region written");
            written += region.len() as u64;
            region.release();
        };

        debug!(bytes = written, ok = result.is_ok(), "writer sink finished");
        done.complete(result);
    }
}

/// Sink spreading writes over a fixed pool of interchangeable targets.
///
/// Each incoming region is written on its own thread using an idle target;
/// when all targets are busy the sink waits for one to come back, which is
/// the pool's only blocking point. A target is never used by two writes at
/// once. Writes can finish out of order, so regions must cover disjoint byte
/// ranges; this is not checked.
pub struct WriterPool<W> {
    idle_tx: Sender<W>,
    idle_rx: Receiver<W>,
    size: usize,
}

impl<W: WriteAt + Send> WriterPool<W> {
    /// Pool the given targets. At least one is required.
    pub fn new(targets: impl IntoIterator<Item = W>) -> Result<Self> {
        let targets: Vec<W> = targets.into_iter().collect();
        if targets.is_empty() {
            return Err(PipelineError::invalid_config(
                "writers",
                "at least one write target is required",
            ));
        }

        let size = targets.len();
        let (idle_tx, idle_rx) = bounded(size);
        for target in targets {
            idle_tx
                .try_send(target)
                .map_err(|_| PipelineError::other("writer pool overflow"))?;
        }

        Ok(Self {
            idle_tx,
            idle_rx,
            size,
        })
    }

    /// Number of targets in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of targets not currently writing.
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }
}

impl WriterPool<File> {
    /// Open `writers` independent handles onto the file at `path`.
    ///
    /// The file is created if missing and never truncated.
    pub fn open_file(path: impl AsRef<Path>, writers: usize) -> Result<Self> {
        let path = path.as_ref();
        let handles = (0..writers)
            .map(|_| {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .map_err(|e| PipelineError::io(format!("opening {}", path.display()), e))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(handles)
    }
}

impl<W: WriteAt + Send> Sink for WriterPool<W> {
    fn read(&self, ctx: &Context, source: Receiver<Region>, done: Completion) {
        // Canceled by the first failing write so the intake loop stops early.
        let local = ctx.child();
        let failure: OnceLock<PipelineError> = OnceLock::new();
        let mut submitted = 0u64;

        thread::scope(|s| loop {
            let region = match local.recv(&source) {
                Flow::Ready(region) => region,
                Flow::Closed | Flow::Canceled(_) => break,
            };
            let target = match local.recv(&self.idle_rx) {
                Flow::Ready(target) => target,
                Flow::Closed | Flow::Canceled(_) => break,
            };

            let (local, failure, idle) = (&local, &failure, &self.idle_tx);
            s.spawn(move || {
                let result = write_region(&target, &region);
                // Release the target before anything else, even on failure.
                let _ = idle.send(target);
                if let Err(e) = result {
                    let err = write_error(&region, e);
                    let _ = failure.set(err.clone());
                    local.cancel_with(err);
                }
            });
            submitted += 1;
        });

        // All in-flight writes have been joined by the scope.
        let result = match failure.into_inner() {
            Some(err) => Err(err),
            None => ctx.err().map_or(Ok(()), Err),
        };
        debug!(regions = submitted, ok = result.is_ok(), "writer pool finished");
        done.complete(result);
    }
}

impl<W> std::fmt::Debug for WriterPool<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterPool")
            .field("size", &self.size)
            .field("idle", &self.idle_rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TerminalSignal;
    use crate::types::BufferPool;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn drain(sink: &impl Sink, regions: Vec<Region>) -> Result<()> {
        let ctx = Context::background();
        let signal = TerminalSignal::new();
        let (tx, rx) = bounded(0);
        let done = signal.completion();

        thread::scope(|s| {
            s.spawn(|| sink.read(&ctx, rx, done));
            for region in regions {
                if tx.send(region).is_err() {
                    break;
                }
            }
            drop(tx);
        });
        signal.wait(&ctx)
    }

    fn regions(n: usize, len: usize) -> Vec<Region> {
        (0..n)
            .map(|i| Region::from_vec((i * len) as i64, vec![b'a' + i as u8; len]))
            .collect()
    }

    #[test]
    fn test_writer_sink_writes_all_regions() {
        let sink = WriterSink::new(Mutex::new(Vec::new()));
        drain(&sink, regions(3, 4)).unwrap();
        assert_eq!(&*sink.target().lock().unwrap(), b"aaaabbbbcccc");
    }

    /// Fails every write at or beyond `fail_at`.
    struct FailAt {
        fail_at: u64,
        inner: Mutex<Vec<u8>>,
    }

    impl WriteAt for FailAt {
        fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
            if offset >= self.fail_at {
                return Err(io::Error::other("disk full"));
            }
            self.inner.write_at(buf, offset)
        }
    }

    #[test]
    fn test_writer_sink_reports_first_failure() {
        let sink = WriterSink::new(FailAt {
            fail_at: 4,
            inner: Mutex::new(Vec::new()),
        });
        let err = drain(&sink, regions(3, 4)).unwrap_err();
        assert!(err.to_string().contains("offset 4"));
        assert_eq!(&*sink.target().inner.lock().unwrap(), b"aaaa");
    }

    #[test]
    fn test_pool_requires_targets() {
        let res = WriterPool::<Mutex<Vec<u8>>>::new(Vec::new());
        assert!(matches!(res, Err(PipelineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_pool_writes_disjoint_regions() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let pool = WriterPool::new((0..3).map(|_| Arc::clone(&shared))).unwrap();

        drain(&pool, regions(8, 16)).unwrap();

        let data = shared.lock().unwrap();
        assert_eq!(data.len(), 8 * 16);
        for (i, chunk) in data.chunks(16).enumerate() {
            assert!(chunk.iter().all(|&b| b == b'a' + i as u8));
        }
        assert_eq!(pool.idle(), 3);
    }

    struct Counting {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl WriteAt for Counting {
        fn write_at(&self, buf: &[u8], _offset: u64) -> io::Result<usize> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(buf.len())
        }
    }

    #[test]
    fn test_pool_never_exceeds_target_count() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pool = WriterPool::new((0..2).map(|_| Counting {
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
        }))
        .unwrap();

        drain(&pool, regions(10, 8)).unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_pool_failure_returns_target_and_reports() {
        let pool = WriterPool::new(vec![FailAt {
            fail_at: 8,
            inner: Mutex::new(Vec::new()),
        }])
        .unwrap();

        let err = drain(&pool, regions(4, 4)).unwrap_err();
        assert!(err.is_io());
        assert_eq!(pool.idle(), 1);
    }

    fn pooled_regions(buffers: &BufferPool, n: usize) -> Vec<Region> {
        (0..n)
            .map(|i| {
                let mut data = buffers.get();
                data.as_mut_slice().fill(b'a' + i as u8);
                Region::new((i * buffers.buffer_size()) as i64, data)
            })
            .collect()
    }

    #[test]
    fn test_pool_recycles_written_buffers() {
        let buffers = BufferPool::new(4, 8);
        let shared = Arc::new(Mutex::new(Vec::new()));
        let pool = WriterPool::new((0..3).map(|_| Arc::clone(&shared))).unwrap();

        let batch = pooled_regions(&buffers, 6);
        assert_eq!(buffers.total_allocations(), 6);
        assert_eq!(buffers.pool_size(), 0);

        drain(&pool, batch).unwrap();

        assert_eq!(&*shared.lock().unwrap(), b"aaaabbbbccccddddeeeeffff");
        assert_eq!(buffers.pool_size(), 6);
        assert_eq!(buffers.total_allocations(), 6);
        assert_eq!(pool.idle(), 3);
    }

    #[test]
    fn test_pool_recycles_buffers_after_failure() {
        let buffers = BufferPool::new(4, 8);
        let pool = WriterPool::new(vec![FailAt {
            fail_at: 8,
            inner: Mutex::new(Vec::new()),
        }])
        .unwrap();

        let err = drain(&pool, pooled_regions(&buffers, 4)).unwrap_err();

        assert!(err.is_io());
        // Written, failed and never-submitted regions all gave their buffers back
        assert_eq!(buffers.pool_size(), 4);
        assert_eq!(buffers.total_allocations(), 4);
        assert_eq!(pool.idle(), 1);
    }
}
