// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Positional write targets.

use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::Region;

/// Write at an absolute offset without a shared cursor.
///
/// Takes `&self` so several threads can write disjoint ranges of the same
/// destination through one handle, or through independently opened handles.
pub trait WriteAt {
    /// Write some prefix of `buf` at `offset`, returning how many bytes were written.
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

#[cfg(unix)]
impl WriteAt for File {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl WriteAt for File {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_write(self, buf, offset)
    }
}

/// In-memory destination that grows as needed.
impl WriteAt for Mutex<Vec<u8>> {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        let end = start + buf.len();

        let mut data = self.lock().unwrap_or_else(PoisonError::into_inner);
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }
}

impl<T: WriteAt + ?Sized> WriteAt for &T {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for Box<T> {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for Arc<T> {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

/// Flush a whole region to `target` at its offset.
///
/// Short writes are continued at `offset + written` until every byte lands.
/// A write that makes no progress fails with `WriteZero`; negative offsets
/// fail with `InvalidInput`.
pub fn write_region<W: WriteAt + ?Sized>(target: &W, region: &Region) -> io::Result<()> {
    let base = u64::try_from(region.offset).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("negative region offset {}", region.offset),
        )
    })?;

    let data = region.as_slice();
    let mut written = 0;
    while written < data.len() {
        match target.write_at(&data[written..], base + written as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole region",
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
