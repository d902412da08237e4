// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data carried through a pipeline: regions and the pool their buffers come from.

pub mod buffer_pool;
pub mod region;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use region::Region;
