pub mod annotations;
pub mod cache;
pub mod config;
pub mod error;
pub mod file_readers;
pub mod montage;
pub mod signal_processing;
pub mod source;
pub mod streamer;
pub mod types;

pub use annotations::{consolidate, expand, Annotation, AnnotationRow, AnnotationStore};
pub use cache::{CacheStats, WindowCache};
pub use config::StreamerConfig;
pub use error::{EegError, Result};
pub use file_readers::{ReaderFactory, RecordingReader};
pub use montage::{BipolarPair, MontageCatalog, MontageDefinition, MontageKind};
pub use source::SignalSource;
pub use streamer::EEGDataStreamer;
pub use types::*;
