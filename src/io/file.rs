// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File-to-file copies assembled from the stream adapters.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use tracing::info;

use super::shard::shard_file;
use super::sink::{WriterPool, WriterSink};
use super::source::ReaderSource;
use crate::config::PipeConfig;
use crate::core::{Context, PipelineError, Result};
use crate::pipeline::{Pipe, Sink, Source, Valve};

/// Copy `src` to `dst` through a pipe shaped by `config`.
///
/// One reader reads sequentially; more readers shard the source and fan in.
/// One writer writes through a single handle; more writers use a pool of
/// independently opened handles. `dst` is created (or truncated) and sized to
/// the source before any region is written. Returns the number of bytes copied.
pub fn copy_file(
    ctx: &Context,
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    config: &PipeConfig,
) -> Result<u64> {
    copy_file_with_valves(ctx, src, dst, config, Vec::new())
}

/// Like [`copy_file`], passing every region through `valves` on the way.
pub fn copy_file_with_valves(
    ctx: &Context,
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    config: &PipeConfig,
    valves: Vec<Box<dyn Valve>>,
) -> Result<u64> {
    config.validate()?;
    let (src, dst) = (src.as_ref(), dst.as_ref());

    let total = fs::metadata(src)
        .map_err(|e| PipelineError::io(format!("inspecting {}", src.display()), e))?
        .len();
    let pool = config.buffer_pool();

    let source: Box<dyn Source> = if config.readers == 1 {
        let file = File::open(src)
            .map_err(|e| PipelineError::io(format!("opening {}", src.display()), e))?;
        Box::new(ReaderSource::new(file, 0, pool)?)
    } else {
        Box::new(shard_file(src, config.readers, &pool)?)
    };

    let out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)
        .map_err(|e| PipelineError::io(format!("creating {}", dst.display()), e))?;
    out.set_len(total)
        .map_err(|e| PipelineError::io(format!("sizing {}", dst.display()), e))?;

    let sink: Box<dyn Sink> = if config.writers == 1 {
        Box::new(WriterSink::new(out))
    } else {
        drop(out);
        Box::new(WriterPool::open_file(dst, config.writers)?)
    };

    let ctx = config.context(ctx);
    Pipe::new(source, sink).with_valves(valves).run(&ctx)?;

    info!(
        src = %src.display(),
        dst = %dst.display(),
        bytes = total,
        readers = config.readers,
        writers = config.writers,
        "file copied"
    );
    Ok(total)
}
