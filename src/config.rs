// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Run configuration.
//!
//! All knobs are resource/throughput settings chosen by the caller; none of
//! them changes what a pipeline does. They can be set in code through
//! [`PipeConfigBuilder`] or loaded from TOML:
//!
//! ```toml
//! buffer_size = 65536
//! pool_size = 16
//! readers = 4
//! writers = 4
//! timeout_ms = 30000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Context, PipelineError, Result};
use crate::types::buffer_pool::{BufferPool, DEFAULT_BUFFER_SIZE, DEFAULT_POOL_SIZE};

/// One kibibyte.
pub const KIB: usize = 1024;
/// One mebibyte.
pub const MIB: usize = 1024 * KIB;
/// One gibibyte.
pub const GIB: usize = 1024 * MIB;

/// Resource settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    /// Size of every region buffer in bytes
    pub buffer_size: usize,
    /// Soft bound on idle buffers kept for reuse
    pub pool_size: usize,
    /// Number of reader shards
    pub readers: usize,
    /// Number of positional writers
    pub writers: usize,
    /// Overall deadline for a run, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            readers: 1,
            writers: 1,
            timeout_ms: None,
        }
    }
}

impl PipeConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> PipeConfigBuilder {
        PipeConfigBuilder::new()
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipeConfig =
            toml::from_str(s).map_err(|e| PipelineError::invalid_config("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io(format!("reading {}", path.display()), e))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PipelineError::invalid_config("toml", e.to_string()))
    }

    /// Reject settings that would make a run impossible.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(PipelineError::invalid_config(
                "buffer_size",
                "must be at least 1 byte",
            ));
        }
        if self.readers == 0 {
            return Err(PipelineError::invalid_config("readers", "must be at least 1"));
        }
        if self.writers == 0 {
            return Err(PipelineError::invalid_config("writers", "must be at least 1"));
        }
        if self.timeout_ms == Some(0) {
            return Err(PipelineError::invalid_config(
                "timeout_ms",
                "must be positive when set",
            ));
        }
        Ok(())
    }

    /// The run deadline as a duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// A fresh buffer pool sized by this configuration.
    pub fn buffer_pool(&self) -> BufferPool {
        BufferPool::new(self.buffer_size, self.pool_size)
    }

    /// Derive a run context from `parent`, applying the timeout if set.
    pub fn context(&self, parent: &Context) -> Context {
        match self.timeout() {
            Some(timeout) => parent.child_with_timeout(timeout),
            None => parent.child(),
        }
    }
}

/// Builder for [`PipeConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipeConfigBuilder {
    config: PipeConfig,
}

impl PipeConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buffer size in bytes.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Set how many idle buffers the pool keeps.
    pub fn pool_size(mut self, buffers: usize) -> Self {
        self.config.pool_size = buffers;
        self
    }

    /// Set the number of reader shards.
    pub fn readers(mut self, count: usize) -> Self {
        self.config.readers = count;
        self
    }

    /// Set the number of positional writers.
    pub fn writers(mut self, count: usize) -> Self {
        self.config.writers = count;
        self
    }

    /// Set the overall run deadline, rounded up to whole milliseconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let ms = timeout.as_nanos().div_ceil(1_000_000);
        self.config.timeout_ms = Some(u64::try_from(ms).unwrap_or(u64::MAX));
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<PipeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_size, 4 * MIB);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_builder_fluent() {
        let config = PipeConfig::builder()
            .buffer_size(4 * KIB)
            .pool_size(10)
            .readers(4)
            .writers(2)
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.readers, 4);
        assert_eq!(config.writers, 2);
        assert_eq!(config.timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_builder_rounds_timeout_up() {
        let config = PipeConfig::builder()
            .timeout(Duration::from_micros(500))
            .build()
            .unwrap();
        assert_eq!(config.timeout_ms, Some(1));

        let config = PipeConfig::builder()
            .timeout(Duration::from_micros(1500))
            .build()
            .unwrap();
        assert_eq!(config.timeout_ms, Some(2));

        let config = PipeConfig::builder().timeout(Duration::MAX).build().unwrap();
        assert_eq!(config.timeout_ms, Some(u64::MAX));
        // Deriving a far-future deadline must not overflow
        assert!(!config.context(&Context::background()).is_done());
    }

    #[test]
    fn test_builder_rejects_zero_writers() {
        let err = PipeConfig::builder().writers(0).build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { ref field, .. } if field == "writers"));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PipeConfig::from_toml_str("readers = 8\ntimeout_ms = 50\n").unwrap();
        assert_eq!(config.readers, 8);
        assert_eq!(config.writers, 1);
        assert_eq!(config.timeout(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = PipeConfig::from_toml_str("shards = 2\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { ref field, .. } if field == "toml"));
    }

    #[test]
    fn test_from_toml_validates() {
        assert!(PipeConfig::from_toml_str("buffer_size = 0\n").is_err());
    }

    #[test]
    fn test_to_toml_string() {
        let text = PipeConfig::builder().readers(3).build().unwrap().to_toml_string().unwrap();
        assert!(text.contains("readers = 3"));
        assert!(!text.contains("timeout_ms"));
    }

    #[test]
    fn test_context_applies_timeout() {
        let parent = Context::background();
        let config = PipeConfig::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        assert!(config.context(&parent).deadline().is_some());
        assert!(PipeConfig::default().context(&parent).deadline().is_none());
    }
}
