//! File Readers Module
//!
//! A recording backend implements [`RecordingReader`]: metadata up front,
//! then random-access reads of a time range at the native sample rate.
//! New formats plug in by implementing the trait and adding an extension to
//! [`ReaderFactory`].

use crate::error::{EegError, Result};
use crate::types::{RecordingMetadata, SignalBlock};
use std::path::Path;

pub mod edf_reader;

pub use edf_reader::EdfRecordingReader;

/// Trait that all recording backends implement
pub trait RecordingReader: Send {
    /// Metadata captured at open time, without reading samples
    fn metadata(&self) -> &RecordingMetadata;

    /// Read all channels for `[t0, t1)` seconds.
    ///
    /// Callers pass a range already clamped to `[0, duration]`. Returns a
    /// channel-major block in `metadata().channel_names` order.
    fn read_range(&mut self, t0: f64, t1: f64) -> Result<SignalBlock>;

    /// Format name (e.g. "EDF")
    fn format_name(&self) -> &str;
}

/// Factory for creating recording readers based on file extension
pub struct ReaderFactory;

impl ReaderFactory {
    pub fn create_reader(path: &Path) -> Result<Box<dyn RecordingReader>> {
        if !path.exists() {
            return Err(EegError::NotFound(format!(
                "Recording not found: {}",
                path.display()
            )));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension.to_lowercase().as_str() {
            "edf" => Ok(Box::new(EdfRecordingReader::open(path)?)),
            _ => Err(EegError::Format(format!(
                "Unsupported file extension: '{}'",
                extension
            ))),
        }
    }

    pub fn supported_extensions() -> Vec<&'static str> {
        vec!["edf"]
    }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| Self::supported_extensions().contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(ReaderFactory::is_supported(Path::new("night.edf")));
        assert!(ReaderFactory::is_supported(Path::new("NIGHT.EDF")));
        assert!(!ReaderFactory::is_supported(Path::new("night.vhdr")));
        assert!(!ReaderFactory::is_supported(Path::new("night")));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = ReaderFactory::create_reader(Path::new("/nonexistent/rec.edf"));
        assert!(matches!(result, Err(EegError::NotFound(_))));
    }

    #[test]
    fn test_unsupported_extension_is_format_error() {
        let file = tempfile::Builder::new().suffix(".xyz").tempfile().unwrap();
        let result = ReaderFactory::create_reader(file.path());
        assert!(matches!(result, Err(EegError::Format(_))));
    }
}
