//! Window Transform Pipeline
//!
//! Turns a raw block read from a recording into display samples:
//! 1. Montage (identity or bipolar differences)
//! 2. Zero-phase Butterworth filter
//!
//! A filter that cannot be built for the window never fails the request. The
//! samples pass through and the returned [`FilterStatus`] says why.

use super::filters::{create_filter, FilterConfig, FilterType};
use crate::error::{EegError, Result};
use crate::montage::{MontageDefinition, MontageKind};
use crate::types::{FilterSpec, FilterStatus, SignalBlock};
use rayon::prelude::*;

/// Map a requested band onto a filter configuration, `None` when no cutoff is set
pub fn filter_config_for(spec: &FilterSpec, sample_rate: f64, order: usize) -> Option<FilterConfig> {
    let (filter_type, frequency, frequency_high) = match (spec.low_cutoff, spec.high_cutoff) {
        (None, None) => return None,
        (Some(low), None) => (FilterType::Highpass, low, None),
        (None, Some(high)) => (FilterType::Lowpass, high, None),
        (Some(low), Some(high)) => (FilterType::Bandpass, low, Some(high)),
    };

    Some(FilterConfig {
        filter_type,
        frequency,
        frequency_high,
        order,
        sample_rate,
    })
}

/// Apply a montage to a raw block.
///
/// Identity returns the block unchanged. Bipolar produces one channel per
/// pair, in declaration order, as `anode - cathode`. Every referenced
/// electrode must exist in the block.
pub fn apply_montage(block: SignalBlock, montage: &MontageDefinition) -> Result<SignalBlock> {
    let pairs = match &montage.kind {
        MontageKind::Identity => return Ok(block),
        MontageKind::Bipolar { pairs } => pairs,
    };

    let lookup = |name: &str| {
        block
            .channel_index(name)
            .ok_or_else(|| EegError::MissingChannel {
                channel: name.to_string(),
                montage: montage.name.clone(),
            })
    };

    let mut indices = Vec::with_capacity(pairs.len());
    for pair in pairs {
        indices.push((lookup(&pair.anode)?, lookup(&pair.cathode)?));
    }

    let samples: Vec<Vec<f64>> = indices
        .par_iter()
        .map(|&(anode, cathode)| {
            block.samples[anode]
                .iter()
                .zip(&block.samples[cathode])
                .map(|(a, c)| a - c)
                .collect()
        })
        .collect();

    let channel_names = pairs.iter().map(|p| p.output.clone()).collect();
    Ok(SignalBlock::new(channel_names, samples))
}

/// Zero-phase filter every channel.
///
/// Returns the input untouched with `NotRequested` when no cutoff is set or
/// there are no samples, and
/// untouched with `PassedThroughUnfiltered` when the filter cannot be built
/// for this sample rate or the window is too short to pad.
pub fn apply_filter(
    samples: Vec<Vec<f64>>,
    spec: &FilterSpec,
    sample_rate: f64,
    order: usize,
) -> (Vec<Vec<f64>>, FilterStatus) {
    let config = match filter_config_for(spec, sample_rate, order) {
        Some(config) => config,
        None => return (samples, FilterStatus::NotRequested),
    };

    // Nothing to filter, e.g. a window past the end of the recording
    let num_samples = samples.first().map(|c| c.len()).unwrap_or(0);
    if num_samples == 0 {
        return (samples, FilterStatus::NotRequested);
    }

    let filter = match create_filter(&config) {
        Ok(filter) => filter,
        Err(reason) => return pass_through(samples, reason),
    };

    if num_samples <= filter.padlen() {
        let reason = format!(
            "window of {} samples is too short for zero-phase filtering (needs more than {})",
            num_samples,
            filter.padlen()
        );
        return pass_through(samples, reason);
    }

    let filtered: std::result::Result<Vec<Vec<f64>>, String> = samples
        .par_iter()
        .map(|channel| filter.clone().filtfilt(channel))
        .collect();

    match filtered {
        Ok(filtered) => (filtered, FilterStatus::Filtered),
        Err(reason) => pass_through(samples, reason),
    }
}

fn pass_through(samples: Vec<Vec<f64>>, reason: String) -> (Vec<Vec<f64>>, FilterStatus) {
    log::warn!("Filter not applied: {}", reason);
    (samples, FilterStatus::PassedThroughUnfiltered { reason })
}

/// Montage then filter, with a fixed filter order
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    filter_order: usize,
}

impl TransformPipeline {
    pub fn new(filter_order: usize) -> Self {
        Self { filter_order }
    }

    pub fn filter_order(&self) -> usize {
        self.filter_order
    }

    pub fn run(
        &self,
        block: SignalBlock,
        montage: &MontageDefinition,
        filter: &FilterSpec,
        sample_rate: f64,
    ) -> Result<(SignalBlock, FilterStatus)> {
        let montaged = apply_montage(block, montage)?;
        let (samples, status) =
            apply_filter(montaged.samples, filter, sample_rate, self.filter_order);
        Ok((SignalBlock::new(montaged.channel_names, samples), status))
    }
}
