// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Pipeline stages and the orchestrator that runs them.
//!
//! - [`Source`], [`Sink`], [`Valve`] - the three stage roles
//! - [`Pipe`] - wires a chain together and arbitrates its outcome
//! - [`Fan`] - runs several sources concurrently as one
//! - [`valve`] - closure-backed valves

pub mod fan;
pub mod pipe;
pub mod stage;
pub mod valve;

pub use fan::Fan;
pub use pipe::Pipe;
pub use stage::{Completion, Reporter, Sink, Source, TerminalSignal, Valve};
pub use valve::FnValve;
