// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Region: a contiguous extent of the stream tagged with its absolute offset.

use std::fmt;

use super::buffer_pool::PooledBuffer;

/// A piece of contiguous data with its offset in the overall stream.
///
/// The data buffer has exactly one owner. Sending a Region over a channel
/// moves the buffer with it; dropping the Region (or calling
/// [`Region::release`]) hands the buffer back to its pool.
pub struct Region {
    /// Region bytes, usually borrowed from a [`BufferPool`](super::BufferPool)
    pub data: PooledBuffer,
    /// Absolute offset of the first byte
    pub offset: i64,
}

impl Region {
    /// Create a region over a pooled buffer.
    pub fn new(offset: i64, data: PooledBuffer) -> Self {
        Self { data, offset }
    }

    /// Create a region over bytes that do not belong to any pool.
    pub fn from_vec(offset: i64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(offset, PooledBuffer::from_vec(data.into()))
    }

    /// Region bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Number of bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the region carries no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset one past the last byte, or `None` if it does not fit in an `i64`.
    #[inline]
    pub fn end(&self) -> Option<i64> {
        i64::try_from(self.len())
            .ok()
            .and_then(|len| self.offset.checked_add(len))
    }

    /// Give the buffer back to its pool.
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.as_slice() == other.as_slice()
    }
}

impl Eq for Region {}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("offset", &self.offset)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BufferPool;

    #[test]
    fn test_region_extent() {
        let region = Region::from_vec(90, "JJJJJJJJJJ");
        assert_eq!(region.len(), 10);
        assert_eq!(region.end(), Some(100));
        assert_eq!(region.as_slice(), b"JJJJJJJJJJ");
    }

    #[test]
    fn test_region_end_past_i64_max() {
        let region = Region::from_vec(i64::MAX - 4, "0123456789");
        assert_eq!(region.end(), None);
        assert_eq!(Region::from_vec(i64::MAX - 10, "0123456789").end(), Some(i64::MAX));
    }

    #[test]
    fn test_region_equality_by_offset_and_bytes() {
        assert_eq!(Region::from_vec(0, "AB"), Region::from_vec(0, "AB"));
        assert_ne!(Region::from_vec(0, "AB"), Region::from_vec(1, "AB"));
        assert_ne!(Region::from_vec(0, "AB"), Region::from_vec(0, "AC"));
    }

    #[test]
    fn test_release_returns_buffer() {
        let pool = BufferPool::new(8, 1);
        let mut data = pool.get();
        data.truncate(3);
        let region = Region::new(0, data);
        assert_eq!(region.len(), 3);

        region.release();
        assert_eq!(pool.pool_size(), 1);
    }
}
