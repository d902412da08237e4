// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lock-free buffer pool for region data.
//!
//! This module provides a bounded, non-blocking cache of fixed-size byte
//! buffers built on crossbeam::queue::ArrayQueue. Producers take buffers with
//! [`BufferPool::get`] and consumers hand them back with [`BufferPool::put`]
//! (or simply drop them).
//!
//! The pool size is a soft bound on reuse, not a cap on live memory: when the
//! queue is empty `get` allocates, and when it is full `put` frees the buffer.
//! Neither call ever blocks.

use crossbeam_queue::ArrayQueue;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default buffer size (4MB)
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default number of idle buffers kept for reuse
pub const DEFAULT_POOL_SIZE: usize = 10;

/// A buffer that returns itself to its pool when dropped.
///
/// The backing vector always spans at least the pool's buffer size; `len`
/// tracks how much of it is filled with region data.
pub struct PooledBuffer {
    /// Backing storage
    data: Vec<u8>,
    /// Number of meaningful bytes at the front of `data`
    len: usize,
    /// Pool to return to (detached buffers have none)
    pool: Option<Arc<BufferPoolInner>>,
}

impl PooledBuffer {
    /// Wrap a plain vector that does not belong to any pool.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            len: data.len(),
            data,
            pool: None,
        }
    }

    /// Filled bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Filled bytes, writable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Number of filled bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no bytes are filled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total usable size of the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Shrink the filled length to `len` (no-op if already shorter).
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Check whether this buffer will go back to a pool on drop.
    #[inline]
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// Take the filled bytes out, preventing return to the pool.
    pub fn into_inner(mut self) -> Vec<u8> {
        self.pool = None;
        let mut data = std::mem::take(&mut self.data);
        data.truncate(self.len);
        data
    }
}

impl Drop for PooledBuffer {
    #[inline]
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.return_buffer(std::mem::take(&mut self.data));
        }
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for PooledBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for PooledBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

/// Inner buffer pool state (shared via Arc).
#[derive(Debug)]
struct BufferPoolInner {
    /// Idle buffers; `None` when the pool size is zero
    queue: Option<ArrayQueue<Vec<u8>>>,
    /// Size of every buffer handed out
    buffer_size: usize,
    /// Total number of fresh allocations (for metrics)
    total_allocations: AtomicUsize,
}

impl BufferPoolInner {
    /// Queue a buffer for reuse, or drop it if the queue is full.
    #[inline]
    fn return_buffer(&self, mut buffer: Vec<u8>) -> bool {
        if buffer.capacity() < self.buffer_size {
            return false;
        }
        // Within capacity, so this never reallocates.
        buffer.resize(self.buffer_size.max(buffer.len()), 0);

        match &self.queue {
            Some(queue) => queue.push(buffer).is_ok(),
            None => false,
        }
    }

    /// Take a queued buffer, or allocate a new one.
    #[inline]
    fn take_buffer(&self) -> Vec<u8> {
        if let Some(buffer) = self.queue.as_ref().and_then(ArrayQueue::pop) {
            return buffer;
        }

        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        vec![0; self.buffer_size]
    }
}

/// Lock-free pool of fixed-size region buffers.
///
/// Cloning is cheap; every clone shares the same queue, so one pool can back
/// every stage of a run (or several runs) without external locking.
///
/// # Example
///
/// ```
/// use regionpipe::types::buffer_pool::BufferPool;
///
/// let pool = BufferPool::new(4096, 4);
/// let mut buf = pool.get();
/// assert_eq!(buf.len(), 4096);
/// buf.as_mut_slice()[0] = 42;
/// pool.put(buf);
/// assert_eq!(pool.pool_size(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

impl BufferPool {
    /// Create a pool of `buffer_size`-byte buffers keeping at most `pool_size` idle.
    ///
    /// A `pool_size` of zero disables reuse: every `get` allocates.
    pub fn new(buffer_size: usize, pool_size: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                queue: (pool_size > 0).then(|| ArrayQueue::new(pool_size)),
                buffer_size,
                total_allocations: AtomicUsize::new(0),
            }),
        }
    }

    /// Get a buffer of exactly `buffer_size` filled bytes, ready for overwrite.
    ///
    /// Reuses an idle buffer when one is queued, otherwise allocates. Never blocks.
    #[inline]
    pub fn get(&self) -> PooledBuffer {
        let data = self.inner.take_buffer();
        PooledBuffer {
            len: self.inner.buffer_size,
            data,
            pool: Some(Arc::clone(&self.inner)),
        }
    }

    /// Return a buffer. Never blocks; the buffer is freed if the pool is full.
    ///
    /// Equivalent to dropping it; spelled out for call sites that release
    /// ownership explicitly.
    #[inline]
    pub fn put(&self, buffer: PooledBuffer) {
        drop(buffer);
    }

    /// Directly offer a raw vector to the pool.
    ///
    /// Vectors whose capacity is below the buffer size are dropped. Returns
    /// whether the vector was queued.
    pub fn return_buffer(&self, buffer: Vec<u8>) -> bool {
        self.inner.return_buffer(buffer)
    }

    /// Pre-warm the pool with up to `count` buffers.
    pub fn warmup(&self, count: usize) {
        for _ in 0..count.min(self.capacity()) {
            if !self.inner.return_buffer(vec![0; self.inner.buffer_size]) {
                break;
            }
        }
    }

    /// Get the current number of idle buffers.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.inner.queue.as_ref().map_or(0, ArrayQueue::len)
    }

    /// Maximum number of idle buffers kept for reuse.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.queue.as_ref().map_or(0, ArrayQueue::capacity)
    }

    /// Get the total number of fresh allocations (excluding reuses).
    #[inline]
    pub fn total_allocations(&self) -> usize {
        self.inner.total_allocations.load(Ordering::Relaxed)
    }

    /// Size of every buffer handed out.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, DEFAULT_POOL_SIZE)
    }
}
