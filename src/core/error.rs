// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for regionpipe.
//!
//! Every failure a pipeline run can resolve to falls into one of three groups:
//! - I/O failures from the underlying reader or positional writer
//! - Cancellation, either explicit or because a deadline expired
//! - Construction errors, raised synchronously before any stage starts

use std::io;
use std::sync::Arc;

/// Errors that can occur while building or running a pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// An underlying read or positional write failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the stage was doing when the failure happened
        context: String,
        /// Underlying error (shared so the error stays cloneable)
        #[source]
        source: Arc<io::Error>,
    },

    /// The run was canceled by the caller or by another stage.
    #[error("pipeline canceled")]
    Canceled,

    /// The run's deadline expired before a terminal signal arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A configuration value was rejected during construction.
    #[error("invalid configuration '{field}': {reason}")]
    InvalidConfig {
        /// Name of the offending setting
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Every stage went away without reporting an outcome.
    #[error("pipeline stages exited without reporting an outcome")]
    Incomplete,

    /// Failure raised by a caller-defined stage.
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// Create a construction error for an invalid setting.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a stage failure from a message.
    pub fn other(message: impl Into<String>) -> Self {
        PipelineError::Other(message.into())
    }

    /// True for `Canceled` and `DeadlineExceeded`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Canceled | PipelineError::DeadlineExceeded)
    }

    /// True for I/O failures.
    pub fn is_io(&self) -> bool {
        matches!(self, PipelineError::Io { .. })
    }

    /// Kind of the underlying I/O error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            PipelineError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            PipelineError::Io { context, source } => {
                vec![("context", context.clone()), ("cause", source.to_string())]
            }
            PipelineError::Canceled => vec![("cause", "canceled".to_string())],
            PipelineError::DeadlineExceeded => vec![("cause", "deadline".to_string())],
            PipelineError::InvalidConfig { field, reason } => {
                vec![("field", field.clone()), ("reason", reason.clone())]
            }
            PipelineError::Incomplete => vec![("cause", "incomplete".to_string())],
            PipelineError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::io("performing I/O", err)
    }
}

/// Result type for regionpipe operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
