use crate::error::{EegError, Result};
use crate::file_readers::{ReaderFactory, RecordingReader};
use crate::types::{RecordingMetadata, SignalBlock};
use parking_lot::Mutex;
use std::path::Path;

/// Open recording handle with random-access reads.
///
/// Holds at most one reader. All reads go through a mutex so the source can be
/// shared between threads.
pub struct SignalSource {
    reader: Mutex<Option<Box<dyn RecordingReader>>>,
}

impl SignalSource {
    /// Open a recording by path, picking the backend from the extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = ReaderFactory::create_reader(path.as_ref())?;
        Ok(Self::attach(reader))
    }

    /// Wrap an already opened reader
    pub fn attach(reader: Box<dyn RecordingReader>) -> Self {
        let meta = reader.metadata();
        log::info!(
            "Opened {} recording {} ({} channels, {} Hz, {:.1} s)",
            reader.format_name(),
            meta.file_path,
            meta.num_channels(),
            meta.sample_rate,
            meta.duration
        );
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.reader.lock().is_some()
    }

    pub fn metadata(&self) -> Result<RecordingMetadata> {
        self.reader
            .lock()
            .as_ref()
            .map(|r| r.metadata().clone())
            .ok_or(EegError::NoRecordingOpen)
    }

    /// Read all channels for `[t0, t1)`, clamped to `[0, duration]`.
    /// A range that clamps to nothing yields zero samples per channel.
    pub fn read_range(&self, t0: f64, t1: f64) -> Result<SignalBlock> {
        let mut guard = self.reader.lock();
        let reader = guard.as_mut().ok_or(EegError::NoRecordingOpen)?;

        let (start, end) = reader.metadata().clamp_range(t0, t1);
        if end <= start {
            let names = reader.metadata().channel_names.clone();
            let samples = vec![Vec::new(); names.len()];
            return Ok(SignalBlock::new(names, samples));
        }

        log::trace!("Reading {:.3}..{:.3} s", start, end);
        reader.read_range(start, end)
    }

    /// Release the reader. Closing twice is a no-op.
    pub fn close(&self) {
        if let Some(reader) = self.reader.lock().take() {
            log::debug!("Closed recording {}", reader.metadata().file_path);
        }
    }
}

impl std::fmt::Debug for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.reader.lock();
        f.debug_struct("SignalSource")
            .field("file", &guard.as_ref().map(|r| r.metadata().file_path.clone()))
            .finish()
    }
}
