// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout regionpipe.
//!
//! - [`PipelineError`] - Error taxonomy for runs and construction
//! - [`Context`] - Cancellation token with optional deadline
//! - [`Flow`] - Result of a cancellation-guarded channel operation

pub mod context;
pub mod error;

pub use context::{Context, Flow};
pub use error::{PipelineError, Result};
