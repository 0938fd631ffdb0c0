use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// Recording metadata, fixed for as long as the recording stays open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub file_path: String,
    /// Samples per second per channel
    pub sample_rate: f64,
    /// Total duration in seconds
    pub duration: f64,
    pub num_samples: usize,
    pub channel_names: Vec<String>,
}

impl RecordingMetadata {
    pub fn num_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// Clamp a requested time range to `[0, duration]` with `t0 <= t1`
    pub fn clamp_range(&self, t0: f64, t1: f64) -> (f64, f64) {
        let start = t0.max(0.0).min(self.duration);
        let end = t1.min(self.duration).max(start);
        (start, end)
    }
}

/// Band limits for the display filter.
///
/// `low_cutoff` alone is a high-pass, `high_cutoff` alone a low-pass, both a
/// band-pass. Neither set means no filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub low_cutoff: Option<f64>,
    pub high_cutoff: Option<f64>,
}

impl FilterSpec {
    pub fn new(low_cutoff: Option<f64>, high_cutoff: Option<f64>) -> Self {
        Self {
            low_cutoff,
            high_cutoff,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.low_cutoff.is_none() && self.high_cutoff.is_none()
    }

    fn bits(&self) -> (Option<u64>, Option<u64>) {
        (
            self.low_cutoff.map(f64::to_bits),
            self.high_cutoff.map(f64::to_bits),
        )
    }
}

/// Cache fingerprint: the caller-visible window request.
///
/// Floats compare and hash by bit pattern, so two keys are equal only when
/// every field holds exactly the same value.
#[derive(Debug, Clone, Serialize)]
pub struct WindowKey {
    pub start_time: f64,
    pub duration: f64,
    pub montage: String,
    pub filter: FilterSpec,
}

impl WindowKey {
    pub fn new(start_time: f64, duration: f64, montage: &str, filter: FilterSpec) -> Self {
        Self {
            start_time,
            duration,
            montage: montage.to_string(),
            filter,
        }
    }
}

impl PartialEq for WindowKey {
    fn eq(&self, other: &Self) -> bool {
        self.start_time.to_bits() == other.start_time.to_bits()
            && self.duration.to_bits() == other.duration.to_bits()
            && self.montage == other.montage
            && self.filter.bits() == other.filter.bits()
    }
}

impl Eq for WindowKey {}

impl Hash for WindowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start_time.to_bits().hash(state);
        self.duration.to_bits().hash(state);
        self.montage.hash(state);
        self.filter.bits().hash(state);
    }
}

/// Outcome of the filter stage for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FilterStatus {
    /// Both cutoffs unset
    NotRequested,
    Filtered,
    /// The filter could not be built for this window; samples are raw
    PassedThroughUnfiltered { reason: String },
}

impl FilterStatus {
    pub fn is_filtered(&self) -> bool {
        matches!(self, FilterStatus::Filtered)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FilterStatus::PassedThroughUnfiltered { .. })
    }
}

/// Channel-major block of samples as produced by a reader or a transform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalBlock {
    pub channel_names: Vec<String>,
    pub samples: Vec<Vec<f64>>,
}

impl SignalBlock {
    pub fn new(channel_names: Vec<String>, samples: Vec<Vec<f64>>) -> Self {
        Self {
            channel_names,
            samples,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.samples.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|c| c == name)
    }
}

/// A materialized, transformed window as stored in the cache
#[derive(Debug, Clone, Serialize)]
pub struct WindowData {
    pub key: WindowKey,
    pub channel_names: Vec<String>,
    pub samples: Vec<Vec<f64>>,
    pub sample_rate: f64,
    /// Start of the range actually read (seconds from recording start)
    pub start_time: f64,
    /// End of the range actually read, buffer margin included
    pub end_time: f64,
    pub filter_status: FilterStatus,
    pub num_samples: usize,
    #[serde(skip)]
    pub size_bytes: usize,
}

impl WindowData {
    pub fn new(
        key: WindowKey,
        block: SignalBlock,
        sample_rate: f64,
        start_time: f64,
        end_time: f64,
        filter_status: FilterStatus,
    ) -> Self {
        let num_samples = block.num_samples();
        let size_bytes = block.samples.len() * num_samples * std::mem::size_of::<f64>();
        Self {
            key,
            channel_names: block.channel_names,
            samples: block.samples,
            sample_rate,
            start_time,
            end_time,
            filter_status,
            num_samples,
            size_bytes,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channel_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Time in seconds of sample `index`
    pub fn time_at(&self, index: usize) -> f64 {
        self.start_time + index as f64 / self.sample_rate
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.num_samples).map(|i| self.time_at(i)).collect()
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_names
            .iter()
            .position(|c| c == name)
            .map(|idx| self.samples[idx].as_slice())
    }

    /// Sample indices covering the caller's requested `[start, start + duration)`,
    /// excluding the trailing buffer margin
    pub fn visible_range(&self) -> Range<usize> {
        let to_index = |t: f64| -> usize {
            let offset = ((t - self.start_time) * self.sample_rate).round();
            if offset <= 0.0 {
                0
            } else {
                (offset as usize).min(self.num_samples)
            }
        };
        let start = to_index(self.key.start_time);
        let end = to_index(self.key.start_time + self.key.duration).max(start);
        start..end
    }
}
