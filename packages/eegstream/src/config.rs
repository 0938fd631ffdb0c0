use crate::error::{EegError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for the window streamer and its cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Maximum number of transformed windows held in the cache
    #[serde(default = "default_max_cached_windows")]
    pub max_cached_windows: usize,

    /// Upper bound on the summed sample payload of cached windows
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: usize,

    /// Extra seconds read past the requested window for filter context and
    /// small pans. Not part of the cache key.
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f64,

    /// Butterworth order of the display filter
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
}

fn default_max_cached_windows() -> usize {
    5
}
fn default_max_cache_bytes() -> usize {
    512 * 1024 * 1024
}
fn default_buffer_seconds() -> f64 {
    2.0
}
fn default_filter_order() -> usize {
    4
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            max_cached_windows: default_max_cached_windows(),
            max_cache_bytes: default_max_cache_bytes(),
            buffer_seconds: default_buffer_seconds(),
            filter_order: default_filter_order(),
        }
    }
}

impl StreamerConfig {
    /// Load overrides from a YAML file; missing fields keep their defaults
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: StreamerConfig = serde_yaml::from_str(&content).map_err(|e| {
            EegError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cached_windows == 0 {
            return Err(EegError::Config(
                "max_cached_windows must be at least 1".to_string(),
            ));
        }
        if !self.buffer_seconds.is_finite() || self.buffer_seconds < 0.0 {
            return Err(EegError::Config(format!(
                "buffer_seconds must be a non-negative number, got {}",
                self.buffer_seconds
            )));
        }
        if self.filter_order == 0 {
            return Err(EegError::Config("filter_order must be at least 1".to_string()));
        }
        Ok(())
    }
}
