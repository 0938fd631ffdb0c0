// EDF (European Data Format) recording reader
// Specification: https://www.edfplus.info/specs/edf.html
//
// Only what windowed display needs: the fixed-size header, the per-signal
// headers and 16-bit little-endian data records. EDF+ annotation signals are
// skipped.

use super::RecordingReader;
use crate::error::{EegError, Result};
use crate::types::{RecordingMetadata, SignalBlock};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const ANNOTATION_LABEL: &str = "EDF Annotations";

#[derive(Debug, Clone)]
pub struct EdfHeader {
    pub version: String,              // 8 bytes
    pub patient_id: String,           // 80 bytes
    pub recording_id: String,         // 80 bytes
    pub start_date: String,           // 8 bytes: dd.mm.yy
    pub start_time: String,           // 8 bytes: hh.mm.ss
    pub header_bytes: usize,          // 8 bytes
    pub reserved: String,             // 44 bytes
    pub num_data_records: i64,        // 8 bytes: -1 if unknown
    pub duration_of_data_record: f64, // 8 bytes: seconds
    pub num_signals: usize,           // 4 bytes
}

#[derive(Debug, Clone)]
pub struct EdfSignalHeader {
    pub label: String,                 // 16 bytes
    pub transducer_type: String,       // 80 bytes
    pub physical_dimension: String,    // 8 bytes
    pub physical_minimum: f64,         // 8 bytes
    pub physical_maximum: f64,         // 8 bytes
    pub digital_minimum: i64,          // 8 bytes
    pub digital_maximum: i64,          // 8 bytes
    pub prefiltering: String,          // 80 bytes
    pub num_samples_per_record: usize, // 8 bytes
    pub reserved: String,              // 32 bytes
}

impl EdfSignalHeader {
    pub fn sample_frequency(&self, record_duration: f64) -> f64 {
        self.num_samples_per_record as f64 / record_duration
    }

    pub fn gain(&self) -> f64 {
        (self.physical_maximum - self.physical_minimum)
            / (self.digital_maximum - self.digital_minimum) as f64
    }

    pub fn offset(&self) -> f64 {
        self.physical_maximum - self.gain() * self.digital_maximum as f64
    }

    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATION_LABEL
    }
}

/// Random-access EDF reader: header on open, data records on demand
pub struct EdfRecordingReader {
    file: BufReader<File>,
    pub header: EdfHeader,
    pub signal_headers: Vec<EdfSignalHeader>,
    /// Indices into `signal_headers` of the signals exposed as channels
    data_signals: Vec<usize>,
    /// Sample offset of each signal inside a data record
    signal_offsets: Vec<usize>,
    samples_per_record: usize,
    record_size_bytes: usize,
    num_records: usize,
    data_start_offset: u64,
    metadata: RecordingMetadata,
}

impl EdfRecordingReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EegError::NotFound(format!("Recording not found: {}", path.display()))
            } else {
                EegError::Io(e)
            }
        })?;
        let file_size = file.metadata()?.len();
        let mut file = BufReader::new(file);

        let header = Self::read_header(&mut file)?;
        let signal_headers = Self::read_signal_headers(&mut file, header.num_signals)?;

        let candidates: Vec<usize> = signal_headers
            .iter()
            .enumerate()
            .filter(|(_, sh)| !sh.is_annotation())
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return Err(EegError::Format(
                "EDF file contains no data signals".to_string(),
            ));
        }

        // The first data signal sets the recording rate; signals at any other
        // rate are left out of the channel list
        let samples_per_record = signal_headers[candidates[0]].num_samples_per_record;
        let (data_signals, off_rate): (Vec<usize>, Vec<usize>) = candidates
            .into_iter()
            .partition(|&i| signal_headers[i].num_samples_per_record == samples_per_record);
        for &idx in &off_rate {
            log::warn!(
                "Skipping signal '{}': {} samples per record, recording uses {}",
                signal_headers[idx].label,
                signal_headers[idx].num_samples_per_record,
                samples_per_record
            );
        }
        if samples_per_record == 0 {
            return Err(EegError::Format(
                "Data signals have zero samples per record".to_string(),
            ));
        }
        if let Some(sh) = data_signals
            .iter()
            .map(|&i| &signal_headers[i])
            .find(|sh| sh.digital_maximum == sh.digital_minimum)
        {
            return Err(EegError::Format(format!(
                "Signal '{}' has equal digital minimum and maximum",
                sh.label
            )));
        }

        let mut signal_offsets = Vec::with_capacity(signal_headers.len());
        let mut offset = 0;
        for sh in &signal_headers {
            signal_offsets.push(offset);
            offset += sh.num_samples_per_record;
        }
        let record_size_bytes = offset * 2;

        let data_start_offset = header.header_bytes as u64;
        let num_records = if header.num_data_records >= 0 {
            header.num_data_records as usize
        } else {
            let data_bytes = file_size.saturating_sub(data_start_offset);
            (data_bytes / record_size_bytes as u64) as usize
        };

        let record_duration = header.duration_of_data_record;
        let sample_rate = signal_headers[data_signals[0]].sample_frequency(record_duration);
        let labels: Vec<String> = data_signals
            .iter()
            .map(|&i| signal_headers[i].label.clone())
            .collect();

        let metadata = RecordingMetadata {
            file_path: path.to_string_lossy().to_string(),
            sample_rate,
            duration: num_records as f64 * record_duration,
            num_samples: num_records * samples_per_record,
            channel_names: unique_labels(labels),
        };

        log::debug!(
            "EDF opened: {} records x {}s, {} data signals @ {} Hz",
            num_records,
            record_duration,
            data_signals.len(),
            sample_rate
        );

        Ok(Self {
            file,
            header,
            signal_headers,
            data_signals,
            signal_offsets,
            samples_per_record,
            record_size_bytes,
            num_records,
            data_start_offset,
            metadata,
        })
    }

    fn read_fixed_string<R: Read>(reader: &mut R, size: usize) -> Result<String> {
        let mut buffer = vec![0u8; size];
        reader
            .read_exact(&mut buffer)
            .map_err(|e| EegError::Format(format!("Truncated EDF header: {}", e)))?;
        Ok(String::from_utf8_lossy(&buffer).trim().to_string())
    }

    fn read_number<R: Read, T: std::str::FromStr>(
        reader: &mut R,
        size: usize,
        field: &str,
    ) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let s = Self::read_fixed_string(reader, size)?;
        parse_field(&s, field)
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<EdfHeader> {
        let version = Self::read_fixed_string(reader, 8)?;
        let patient_id = Self::read_fixed_string(reader, 80)?;
        let recording_id = Self::read_fixed_string(reader, 80)?;
        let start_date = Self::read_fixed_string(reader, 8)?;
        let start_time = Self::read_fixed_string(reader, 8)?;
        let header_bytes: usize = Self::read_number(reader, 8, "header bytes")?;
        let reserved = Self::read_fixed_string(reader, 44)?;
        let num_data_records: i64 = Self::read_number(reader, 8, "number of data records")?;
        let duration_of_data_record: f64 = Self::read_number(reader, 8, "record duration")?;
        let num_signals: usize = Self::read_number(reader, 4, "number of signals")?;

        if !(duration_of_data_record > 0.0) {
            return Err(EegError::Format(format!(
                "Data record duration must be positive, got {}",
                duration_of_data_record
            )));
        }
        if header_bytes != 256 + num_signals * 256 {
            return Err(EegError::Format(format!(
                "Header size {} does not match {} signals",
                header_bytes, num_signals
            )));
        }

        Ok(EdfHeader {
            version,
            patient_id,
            recording_id,
            start_date,
            start_time,
            header_bytes,
            reserved,
            num_data_records,
            duration_of_data_record,
            num_signals,
        })
    }

    /// Signal header fields are stored column-wise: every label, then every
    /// transducer type, and so on.
    fn read_string_column<R: Read>(
        reader: &mut R,
        num_signals: usize,
        size: usize,
    ) -> Result<Vec<String>> {
        (0..num_signals)
            .map(|_| Self::read_fixed_string(reader, size))
            .collect()
    }

    fn read_number_column<R: Read, T: std::str::FromStr>(
        reader: &mut R,
        num_signals: usize,
        size: usize,
        field: &str,
    ) -> Result<Vec<T>>
    where
        T::Err: std::fmt::Display,
    {
        (0..num_signals)
            .map(|_| Self::read_number::<R, T>(reader, size, field))
            .collect()
    }

    fn read_signal_headers<R: Read>(
        reader: &mut R,
        num_signals: usize,
    ) -> Result<Vec<EdfSignalHeader>> {
        let labels = Self::read_string_column(reader, num_signals, 16)?;
        let transducer_types = Self::read_string_column(reader, num_signals, 80)?;
        let physical_dimensions = Self::read_string_column(reader, num_signals, 8)?;
        let physical_minimums: Vec<f64> =
            Self::read_number_column(reader, num_signals, 8, "physical minimum")?;
        let physical_maximums: Vec<f64> =
            Self::read_number_column(reader, num_signals, 8, "physical maximum")?;
        let digital_minimums: Vec<i64> =
            Self::read_number_column(reader, num_signals, 8, "digital minimum")?;
        let digital_maximums: Vec<i64> =
            Self::read_number_column(reader, num_signals, 8, "digital maximum")?;
        let prefilterings = Self::read_string_column(reader, num_signals, 80)?;
        let num_samples_per_records: Vec<usize> =
            Self::read_number_column(reader, num_signals, 8, "samples per record")?;
        let reserveds = Self::read_string_column(reader, num_signals, 32)?;

        Ok((0..num_signals)
            .map(|i| EdfSignalHeader {
                label: labels[i].clone(),
                transducer_type: transducer_types[i].clone(),
                physical_dimension: physical_dimensions[i].clone(),
                physical_minimum: physical_minimums[i],
                physical_maximum: physical_maximums[i],
                digital_minimum: digital_minimums[i],
                digital_maximum: digital_maximums[i],
                prefiltering: prefilterings[i].clone(),
                num_samples_per_record: num_samples_per_records[i],
                reserved: reserveds[i].clone(),
            })
            .collect())
    }

    fn read_record_bytes(&mut self, record_index: usize, buffer: &mut [u8]) -> Result<()> {
        let record_offset =
            self.data_start_offset + (record_index * self.record_size_bytes) as u64;
        self.file.seek(SeekFrom::Start(record_offset))?;
        self.file.read_exact(buffer)?;
        Ok(())
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }
}

impl RecordingReader for EdfRecordingReader {
    fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    fn read_range(&mut self, t0: f64, t1: f64) -> Result<SignalBlock> {
        let sample_rate = self.metadata.sample_rate;
        let total = self.metadata.num_samples;
        let start_sample = ((t0.max(0.0) * sample_rate).round() as usize).min(total);
        let end_sample = ((t1.max(0.0) * sample_rate).round() as usize).min(total);

        let mut digital: Vec<Vec<i16>> = self
            .data_signals
            .iter()
            .map(|_| Vec::with_capacity(end_sample.saturating_sub(start_sample)))
            .collect();

        if end_sample > start_sample {
            let spr = self.samples_per_record;
            let first_record = start_sample / spr;
            let last_record = (end_sample - 1) / spr;
            let mut buffer = vec![0u8; self.record_size_bytes];

            for record_idx in first_record..=last_record {
                self.read_record_bytes(record_idx, &mut buffer)?;

                let record_start = record_idx * spr;
                let from = start_sample.saturating_sub(record_start);
                let to = (end_sample - record_start).min(spr);

                for (out, &signal_idx) in digital.iter_mut().zip(&self.data_signals) {
                    let base = self.signal_offsets[signal_idx];
                    for s in from..to {
                        let byte = (base + s) * 2;
                        out.push(i16::from_le_bytes([buffer[byte], buffer[byte + 1]]));
                    }
                }
            }
        }

        // Parallel conversion of digital to physical values across channels
        let samples: Vec<Vec<f64>> = digital
            .par_iter()
            .zip(self.data_signals.par_iter())
            .map(|(values, &signal_idx)| {
                let sh = &self.signal_headers[signal_idx];
                let gain = sh.gain();
                let offset = sh.offset();
                values.iter().map(|&d| gain * d as f64 + offset).collect()
            })
            .collect();

        Ok(SignalBlock::new(self.metadata.channel_names.clone(), samples))
    }

    fn format_name(&self) -> &str {
        "EDF"
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| EegError::Format(format!("Invalid {} '{}': {}", field, value, e)))
}

/// Suffix repeated labels with `-1`, `-2`, ... so channel names stay unique.
/// A suffix never reuses a label that appears elsewhere in the file.
fn unique_labels(labels: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = labels.iter().cloned().collect();
    let mut kept: HashSet<String> = HashSet::new();
    labels
        .into_iter()
        .map(|label| {
            if kept.insert(label.clone()) {
                return label;
            }
            let mut suffix = 1;
            loop {
                let candidate = format!("{}-{}", label, suffix);
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
                suffix += 1;
            }
        })
        .collect()
}
