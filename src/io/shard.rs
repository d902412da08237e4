// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Split a fixed-size random-access source into parallel readers.
//!
//! The source is cut into `k` contiguous shards of `ceil(total / k)` bytes
//! (the last ones may be shorter or empty). Each shard gets its own reader
//! handle, seeked to the shard start and limited to the shard length, wrapped
//! as a [`ReaderSource`], and the shards are combined with a [`Fan`].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use tracing::debug;

use super::source::ReaderSource;
use crate::core::{PipelineError, Result};
use crate::pipeline::Fan;
use crate::types::BufferPool;

/// Byte ranges of `shards` shards over a source of `total` bytes.
pub fn plan(total: u64, shards: usize) -> Result<Vec<Range<u64>>> {
    if shards == 0 {
        return Err(PipelineError::invalid_config(
            "readers",
            "shard count must be at least 1",
        ));
    }

    let size = total.div_ceil(shards as u64);
    Ok((0..shards as u64)
        .map(|i| {
            let start = (i * size).min(total);
            let end = (start + size).min(total);
            start..end
        })
        .collect())
}

/// Build a sharded source over `total` bytes, opening one reader per shard.
pub fn shard<R, F>(total: u64, shards: usize, pool: &BufferPool, mut open: F) -> Result<Fan>
where
    R: Read + Seek + Send + 'static,
    F: FnMut() -> std::io::Result<R>,
{
    let ranges = plan(total, shards)?;
    debug!(total, shards, shard_size = ranges[0].end - ranges[0].start, "sharding source");

    let mut sources = Vec::with_capacity(ranges.len());
    for range in ranges {
        let mut reader = open().map_err(|e| PipelineError::io("opening shard reader", e))?;
        reader
            .seek(SeekFrom::Start(range.start))
            .map_err(|e| PipelineError::io(format!("seeking to shard at {}", range.start), e))?;

        let base = i64::try_from(range.start).map_err(|_| {
            PipelineError::invalid_config("size", "source larger than i64::MAX bytes")
        })?;
        sources.push(ReaderSource::new(
            reader.take(range.end - range.start),
            base,
            pool.clone(),
        )?);
    }

    Ok(Fan::new(sources))
}

/// Shard the file at `path` into `shards` independently opened readers.
pub fn shard_file(path: impl AsRef<Path>, shards: usize, pool: &BufferPool) -> Result<Fan> {
    let path = path.as_ref();
    let total = std::fs::metadata(path)
        .map_err(|e| PipelineError::io(format!("inspecting {}", path.display()), e))?
        .len();

    shard(total, shards, pool, || File::open(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_plan_even_split() {
        assert_eq!(plan(12, 3).unwrap(), vec![0..4, 4..8, 8..12]);
    }

    #[test]
    fn test_plan_uneven_split() {
        assert_eq!(plan(10, 4).unwrap(), vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_plan_more_shards_than_bytes() {
        assert_eq!(plan(2, 4).unwrap(), vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn test_plan_empty_source() {
        assert_eq!(plan(0, 2).unwrap(), vec![0..0, 0..0]);
    }

    #[test]
    fn test_plan_rejects_zero_shards() {
        assert!(matches!(
            plan(10, 0),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_shard_opens_one_reader_per_shard() {
        let data = b"0123456789".to_vec();
        let mut opened = 0;
        let fan = shard(10, 3, &BufferPool::new(4, 2), || {
            opened += 1;
            Ok(Cursor::new(data.clone()))
        })
        .unwrap();

        assert_eq!(fan.len(), 3);
        assert_eq!(opened, 3);
    }

    #[test]
    fn test_shard_rejects_zero_sized_buffers() {
        let res = shard(10, 2, &BufferPool::new(0, 2), || {
            Ok(Cursor::new(b"0123456789".to_vec()))
        });
        assert!(matches!(res, Err(PipelineError::InvalidConfig { .. })));
    }
}
