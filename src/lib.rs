// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Regionpipe
//!
//! In-process streaming pipeline for large byte streams.
//!
//! Data moves as [`Region`]s (a pooled buffer plus its absolute offset) from
//! a [`Source`], through zero or more [`Valve`]s, into a [`Sink`]. Stages run
//! on their own threads and hand regions over rendezvous channels, so a slow
//! stage throttles everything upstream instead of letting a queue grow.
//!
//! ## Architecture
//!
//! - `core/` - error taxonomy and cancellation [`Context`]
//! - `types/` - [`Region`] and the lock-free [`BufferPool`]
//! - `pipeline/` - stage traits, the [`Pipe`] orchestrator, [`Fan`]
//! - `io/` - reader-backed sources, sharding, positional-write sinks
//! - `config` - [`PipeConfig`] resource knobs
//!
//! ## Example: sharded file copy
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use regionpipe::{BufferPool, Context, Pipe, WriterPool, MIB};
//! use regionpipe::io::shard_file;
//!
//! let pool = BufferPool::new(MIB, 16);
//! let source = shard_file("in.bin", 4, &pool)?;
//! let sink = WriterPool::open_file("out.bin", 4)?;
//!
//! Pipe::new(source, sink).run(&Context::background())?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use crate::core::{Context, Flow, PipelineError, Result};

// Regions and buffers
pub mod types;

pub use types::{BufferPool, PooledBuffer, Region};

// Stages and orchestration
pub mod pipeline;

pub use pipeline::{Completion, Fan, Pipe, Reporter, Sink, Source, Valve};

// Stream adapters
pub mod io;

pub use io::{ReaderSource, WriteAt, WriterPool, WriterSink};

// Configuration
pub mod config;

pub use config::{PipeConfig, PipeConfigBuilder, GIB, KIB, MIB};
