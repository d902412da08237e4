// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reader-backed source.

use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::core::{Context, Flow, PipelineError, Result};
use crate::pipeline::{Reporter, Source};
use crate::types::{BufferPool, Region};

/// Source that reads a sequential byte stream into pooled buffers.
///
/// Each read becomes one region anchored at `base_offset` plus the bytes
/// read so far. End of stream closes the output; any other read failure is
/// reported and stops the source.
pub struct ReaderSource<R> {
    reader: Mutex<R>,
    base_offset: i64,
    pool: BufferPool,
}

impl<R: Read + Send> ReaderSource<R> {
    /// Read from `reader`, labelling the first byte with `base_offset`.
    ///
    /// Fails if `pool` hands out zero-byte buffers, which could never make
    /// progress.
    pub fn new(reader: R, base_offset: i64, pool: BufferPool) -> Result<Self> {
        if pool.buffer_size() == 0 {
            return Err(PipelineError::invalid_config(
                "buffer_size",
                "must be at least 1 byte",
            ));
        }
        Ok(Self {
            reader: Mutex::new(reader),
            base_offset,
            pool,
        })
    }

    /// Offset of the first byte this source emits.
    pub fn base_offset(&self) -> i64 {
        self.base_offset
    }
}

fn read_some<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

impl<R: Read + Send> Source for ReaderSource<R> {
    fn write(&self, ctx: &Context, sink: Sender<Region>, errs: Reporter) {
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let mut offset = self.base_offset;
        let mut regions = 0u64;

        while !ctx.is_done() {
            let mut buffer = self.pool.get();

            let n = match read_some(&mut *reader, buffer.as_mut_slice()) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    errs.fail(PipelineError::io(format!("reading at offset {offset}"), e));
                    return;
                }
            };

            buffer.truncate(n);
            let region = Region::new(offset, buffer);
            offset += n as i64;

            if !matches!(ctx.send(&sink, region), Flow::Ready(())) {
                return;
            }
            regions += 1;
        }

        debug!(
            base_offset = self.base_offset,
            bytes = offset - self.base_offset,
            regions,
            "reader source exhausted"
        );
    }
}

impl<R> std::fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSource")
            .field("base_offset", &self.base_offset)
            .field("buffer_size", &self.pool.buffer_size())
            .finish()
    }
}
