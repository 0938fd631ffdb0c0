//! Window streamer: the single entry point for display windows.
//!
//! A request is checked against the cache first. On a miss the streamer reads
//! the requested range plus a trailing buffer from the open recording, applies
//! the montage and then the filter, caches the result and hands back a shared
//! snapshot.

use crate::cache::{CacheStats, WindowCache};
use crate::config::StreamerConfig;
use crate::error::{EegError, Result};
use crate::file_readers::RecordingReader;
use crate::montage::MontageCatalog;
use crate::signal_processing::TransformPipeline;
use crate::source::SignalSource;
use crate::types::{FilterSpec, RecordingMetadata, WindowData, WindowKey};
use std::path::Path;
use std::sync::Arc;

pub struct EEGDataStreamer {
    catalog: Arc<MontageCatalog>,
    config: StreamerConfig,
    source: Option<SignalSource>,
    cache: WindowCache,
    pipeline: TransformPipeline,
}

impl EEGDataStreamer {
    pub fn new(catalog: Arc<MontageCatalog>, config: StreamerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: WindowCache::new(config.max_cached_windows, config.max_cache_bytes),
            pipeline: TransformPipeline::new(config.filter_order),
            catalog,
            config,
            source: None,
        })
    }

    /// Open a recording, closing any previous one and dropping its cached windows
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<RecordingMetadata> {
        self.close();
        let source = SignalSource::open(path)?;
        let metadata = source.metadata()?;
        self.source = Some(source);
        Ok(metadata)
    }

    /// Install an already opened reader in place of the current recording
    pub fn open_reader(&mut self, reader: Box<dyn RecordingReader>) -> Result<RecordingMetadata> {
        self.close();
        let source = SignalSource::attach(reader);
        let metadata = source.metadata()?;
        self.source = Some(source);
        Ok(metadata)
    }

    /// Transformed samples for `[start_time, start_time + duration)` under the
    /// named montage and filter, plus a trailing buffer of
    /// `buffer_seconds`, all clamped to the recording.
    ///
    /// Identical requests are served from the cache without touching the file.
    pub fn get_window(
        &self,
        start_time: f64,
        duration: f64,
        montage_name: &str,
        filter: &FilterSpec,
    ) -> Result<Arc<WindowData>> {
        if !start_time.is_finite() || !duration.is_finite() || duration < 0.0 {
            return Err(EegError::InvalidWindow(format!(
                "start={} duration={}",
                start_time, duration
            )));
        }
        let source = self.source.as_ref().ok_or(EegError::NoRecordingOpen)?;
        let montage = self.catalog.get(montage_name)?;

        let key = WindowKey::new(start_time, duration, montage_name, *filter);
        if let Some(window) = self.cache.get(&key) {
            log::debug!(
                "Cache hit: start={} duration={} montage={}",
                start_time,
                duration,
                montage_name
            );
            return Ok(window);
        }

        let metadata = source.metadata()?;
        let (read_start, read_end) = metadata.clamp_range(
            start_time,
            start_time + duration + self.config.buffer_seconds,
        );
        log::debug!(
            "Cache miss: start={} duration={} montage={}, reading {:.3}..{:.3} s",
            start_time,
            duration,
            montage_name,
            read_start,
            read_end
        );

        let raw = source.read_range(read_start, read_end)?;
        let (block, filter_status) =
            self.pipeline
                .run(raw, montage, filter, metadata.sample_rate)?;

        let window = WindowData::new(
            key,
            block,
            metadata.sample_rate,
            read_start,
            read_end,
            filter_status,
        );
        Ok(self.cache.put(window))
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        log::debug!("Window cache cleared");
    }

    pub fn get_metadata(&self) -> Result<RecordingMetadata> {
        self.source
            .as_ref()
            .ok_or(EegError::NoRecordingOpen)?
            .metadata()
    }

    pub fn is_open(&self) -> bool {
        self.source.as_ref().map(|s| s.is_open()).unwrap_or(false)
    }

    /// Release the recording and drop every cached window. Safe to repeat.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            source.close();
        }
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn catalog(&self) -> &Arc<MontageCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }
}
