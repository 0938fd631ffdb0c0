//! Signal Processing Module
//!
//! Montage application and Butterworth display filters for EEG windows.
//! All filters use second-order sections (biquads) for numerical stability
//! and run zero-phase.

mod filters;
mod pipeline;

pub use filters::{
    create_filter, BiquadCoeffs, BiquadFilter, ButterworthFilter, FilterConfig, FilterType,
    SosFilter,
};
pub use pipeline::{apply_filter, apply_montage, filter_config_for, TransformPipeline};
