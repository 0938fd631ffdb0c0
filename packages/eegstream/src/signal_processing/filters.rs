//! Digital Filter Implementations
//!
//! IIR filters as cascaded second-order sections (biquads). Butterworth
//! low-pass, high-pass and band-pass designs, applied either causally or
//! zero-phase (forward-backward).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Filter type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Configuration for a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Cutoff frequency in Hz (low edge for bandpass)
    pub frequency: f64,
    /// High cutoff for bandpass
    pub frequency_high: Option<f64>,
    /// Filter order (typically 2-8 for Butterworth)
    pub order: usize,
    /// Sampling rate in Hz
    pub sample_rate: f64,
}

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Gain at z = 1
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
pub struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    /// Load the state this section settles into under a constant `input`.
    /// Returns the constant output.
    pub fn set_steady_state(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = input * c.dc_gain();
        self.state.z1 = output - c.b0 * input;
        self.state.z2 = c.b2 * input - c.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
    gain: f64,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>, gain: f64) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
            gain,
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Edge padding used by [`SosFilter::filtfilt`]
    pub fn padlen(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Process a single sample through all sections
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input * self.gain;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process an entire signal array in-place
    pub fn process_signal(&mut self, signal: &mut [f64]) {
        for sample in signal.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Causal filtering; returns a new array and leaves the input unchanged
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    /// Put every section in the state it would hold after a long run of `input`
    pub fn set_steady_state(&mut self, input: f64) {
        let mut x = input * self.gain;
        for section in &mut self.sections {
            x = section.set_steady_state(x);
        }
    }

    /// Zero-phase filtering: forward pass, then a backward pass over the
    /// reversed output.
    ///
    /// The signal is extended at both ends by an odd reflection of
    /// [`SosFilter::padlen`] samples and each pass starts from steady state
    /// at its first sample, which keeps edge transients out of the result.
    /// Fails when the signal is not longer than the padding.
    pub fn filtfilt(&mut self, signal: &[f64]) -> Result<Vec<f64>, String> {
        let padlen = self.padlen();
        let n = signal.len();
        if n <= padlen {
            return Err(format!(
                "signal of {} samples is too short for zero-phase filtering (needs more than {})",
                n, padlen
            ));
        }

        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.set_steady_state(extended[0]);
        self.process_signal(&mut extended);

        extended.reverse();
        self.set_steady_state(extended[0]);
        self.process_signal(&mut extended);
        extended.reverse();

        self.reset();
        Ok(extended[padlen..padlen + n].to_vec())
    }

    /// Reset all section states
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    /// Design a Butterworth lowpass filter
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_lowpass(wn, order), 1.0)
    }

    /// Design a Butterworth highpass filter
    pub fn highpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_highpass(wn, order), 1.0)
    }

    /// Band-pass as a highpass at `low` cascaded with a lowpass at `high`
    pub fn bandpass(low: f64, high: f64, sample_rate: f64, order: usize) -> SosFilter {
        let mut sections = Self::design_highpass(Self::prewarp(low, sample_rate), order);
        sections.extend(Self::design_lowpass(Self::prewarp(high, sample_rate), order));
        SosFilter::new(sections, 1.0)
    }

    /// Prewarp frequency for bilinear transform
    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Analog prototype pole pair k contributes s^2 + alpha*s + 1
    fn pole_pair_alpha(k: usize, order: usize) -> f64 {
        let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
        2.0 * theta.sin()
    }

    fn design_lowpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);

        for k in 0..num_sections {
            // For odd order, last section is first-order
            if order % 2 == 1 && k == num_sections - 1 {
                // H(s) = wn / (s + wn)
                let k_coeff = wn / (1.0 + wn);
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1: k_coeff,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
            } else {
                let alpha = Self::pole_pair_alpha(k, order);
                let wn2 = wn * wn;
                let denom = 1.0 + alpha * wn + wn2;

                sections.push(BiquadCoeffs {
                    b0: wn2 / denom,
                    b1: 2.0 * wn2 / denom,
                    b2: wn2 / denom,
                    a1: 2.0 * (wn2 - 1.0) / denom,
                    a2: (1.0 - alpha * wn + wn2) / denom,
                });
            }
        }

        sections
    }

    fn design_highpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);

        for k in 0..num_sections {
            if order % 2 == 1 && k == num_sections - 1 {
                // H(s) = s / (s + wn)
                let k_coeff = 1.0 / (1.0 + wn);
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1: -k_coeff,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
            } else {
                let alpha = Self::pole_pair_alpha(k, order);
                let wn2 = wn * wn;
                let denom = 1.0 + alpha * wn + wn2;

                sections.push(BiquadCoeffs {
                    b0: 1.0 / denom,
                    b1: -2.0 / denom,
                    b2: 1.0 / denom,
                    a1: 2.0 * (wn2 - 1.0) / denom,
                    a2: (1.0 - alpha * wn + wn2) / denom,
                });
            }
        }

        sections
    }
}

fn check_cutoff(label: &str, frequency: f64, nyquist: f64) -> Result<(), String> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(format!(
            "{} ({} Hz) must be a positive frequency",
            label, frequency
        ));
    }
    if frequency >= nyquist {
        return Err(format!(
            "{} ({} Hz) must be less than Nyquist ({} Hz)",
            label, frequency, nyquist
        ));
    }
    Ok(())
}

/// Create a filter from configuration
pub fn create_filter(config: &FilterConfig) -> Result<SosFilter, String> {
    if !config.sample_rate.is_finite() || config.sample_rate <= 0.0 {
        return Err(format!("Invalid sample rate ({} Hz)", config.sample_rate));
    }
    if config.order == 0 {
        return Err("Filter order must be at least 1".to_string());
    }
    let nyquist = config.sample_rate / 2.0;

    match config.filter_type {
        FilterType::Lowpass => {
            check_cutoff("Cutoff frequency", config.frequency, nyquist)?;
            Ok(ButterworthFilter::lowpass(
                config.frequency,
                config.sample_rate,
                config.order,
            ))
        }
        FilterType::Highpass => {
            check_cutoff("Cutoff frequency", config.frequency, nyquist)?;
            Ok(ButterworthFilter::highpass(
                config.frequency,
                config.sample_rate,
                config.order,
            ))
        }
        FilterType::Bandpass => {
            let high = config
                .frequency_high
                .ok_or("Bandpass filter requires frequency_high")?;
            check_cutoff("Low cutoff", config.frequency, nyquist)?;
            check_cutoff("High cutoff", high, nyquist)?;
            if config.frequency >= high {
                return Err(format!(
                    "Low cutoff ({} Hz) must be less than high cutoff ({} Hz)",
                    config.frequency, high
                ));
            }
            Ok(ButterworthFilter::bandpass(
                config.frequency,
                high,
                config.sample_rate,
                config.order,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_filter() {
        let mut filter = ButterworthFilter::lowpass(10.0, 100.0, 2);

        // DC should pass through once settled
        let mut out = 0.0;
        for _ in 0..200 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sections_are_stable() {
        for order in 1..=8 {
            let filter = ButterworthFilter::bandpass(1.0, 40.0, 256.0, order);
            for section in &filter.sections {
                let c = section.coeffs();
                // Jury conditions for a second-order denominator
                assert!(c.a2.abs() < 1.0, "order {} unstable: a2 = {}", order, c.a2);
                assert!(c.a1.abs() < 1.0 + c.a2, "order {} unstable: a1 = {}", order, c.a1);
            }
        }
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let sample_rate = 256.0;
        let mut filter = ButterworthFilter::lowpass(10.0, sample_rate, 4);

        let passband = filter.filtfilt(&sine(2.0, sample_rate, 2048)).unwrap();
        let stopband = filter.filtfilt(&sine(60.0, sample_rate, 2048)).unwrap();

        // Interior only: the odd-extension padding leaves a transient at the
        // tail when the tone ends off a zero crossing
        assert!(rms(&passband[256..1792]) > 0.65);
        assert!(rms(&stopband[256..1792]) < 1e-3);
    }

    #[test]
    fn test_lowpass_edge_transient_stays_bounded() {
        let sample_rate = 256.0;
        let mut filter = ButterworthFilter::lowpass(10.0, sample_rate, 4);
        let stopband = filter.filtfilt(&sine(60.0, sample_rate, 2048)).unwrap();

        // The transient is confined to the tail and never exceeds the
        // padding step
        assert!(stopband.iter().all(|x| x.is_finite() && x.abs() < 2.0));
        assert!(rms(&stopband[..1536]) < 0.01);
    }

    #[test]
    fn test_highpass_removes_dc() {
        let mut filter = ButterworthFilter::highpass(1.0, 256.0, 4);
        let signal = vec![5.0; 1024];

        let filtered = filter.filtfilt(&signal).unwrap();
        assert!(filtered.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn test_filtfilt_has_no_phase_shift() {
        let sample_rate = 256.0;
        let signal = sine(3.0, sample_rate, 2048);
        let mut filter = ButterworthFilter::lowpass(30.0, sample_rate, 4);

        let filtered = filter.filtfilt(&signal).unwrap();
        let mid = 1024;
        for i in mid..mid + 100 {
            assert!((filtered[i] - signal[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_filtfilt_rejects_short_signal() {
        let mut filter = ButterworthFilter::lowpass(10.0, 100.0, 4);
        assert_eq!(filter.padlen(), 15);
        assert!(filter.filtfilt(&[0.0; 15]).is_err());
        assert!(filter.filtfilt(&[0.0; 16]).is_ok());
    }

    #[test]
    fn test_create_filter_validation() {
        let config = |filter_type, frequency, frequency_high| FilterConfig {
            filter_type,
            frequency,
            frequency_high,
            order: 4,
            sample_rate: 100.0,
        };

        assert!(create_filter(&config(FilterType::Lowpass, 10.0, None)).is_ok());
        assert!(create_filter(&config(FilterType::Lowpass, 50.0, None)).is_err());
        assert!(create_filter(&config(FilterType::Highpass, 0.0, None)).is_err());
        assert!(create_filter(&config(FilterType::Highpass, f64::NAN, None)).is_err());
        assert!(create_filter(&config(FilterType::Bandpass, 1.0, Some(30.0))).is_ok());
        assert!(create_filter(&config(FilterType::Bandpass, 30.0, Some(1.0))).is_err());
        assert!(create_filter(&config(FilterType::Bandpass, 1.0, Some(60.0))).is_err());
        assert!(create_filter(&config(FilterType::Bandpass, 1.0, None)).is_err());
    }
}
