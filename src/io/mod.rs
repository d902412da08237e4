// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stream adapters over real storage.
//!
//! - [`ReaderSource`] - sequential reader as a source
//! - [`shard`] - parallel readers over a random-access source
//! - [`WriterSink`] / [`WriterPool`] - positional writers as sinks
//! - [`file`] - ready-made file-to-file copies

pub mod file;
pub mod shard;
pub mod sink;
pub mod source;
pub mod write_at;

pub use file::{copy_file, copy_file_with_valves};
pub use shard::{shard_file, shard as shard_reader};
pub use sink::{WriterPool, WriterSink};
pub use source::ReaderSource;
pub use write_at::{write_region, WriteAt};
