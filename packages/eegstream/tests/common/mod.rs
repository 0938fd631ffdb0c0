//! Synthetic EDF files for integration tests.
//!
//! Signals use a digital range equal to the physical range (-32768..32767),
//! so physical values equal the stored integers.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub struct SyntheticEdf {
    labels: Vec<String>,
    samples_per_record: usize,
    num_records: usize,
    record_duration: f64,
    unknown_record_count: bool,
    annotation_signal: bool,
    slow_signals: Vec<(String, usize)>,
}

impl SyntheticEdf {
    pub fn new(labels: &[&str], samples_per_record: usize, num_records: usize) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            samples_per_record,
            num_records,
            record_duration: 1.0,
            unknown_record_count: false,
            annotation_signal: false,
            slow_signals: Vec::new(),
        }
    }

    /// Write `-1` as the record count so readers must derive it from the size
    pub fn unknown_record_count(mut self) -> Self {
        self.unknown_record_count = true;
        self
    }

    /// Append an "EDF Annotations" signal after the data signals
    pub fn with_annotation_signal(mut self) -> Self {
        self.annotation_signal = true;
        self
    }

    /// Append a zero-valued data signal with its own samples per record
    pub fn with_slow_signal(mut self, label: &str, samples_per_record: usize) -> Self {
        self.slow_signals.push((label.to_string(), samples_per_record));
        self
    }

    /// Write the file; `value(channel, sample)` gives each stored sample
    pub fn write<F>(&self, path: &Path, value: F)
    where
        F: Fn(usize, usize) -> i16,
    {
        let mut signals: Vec<(String, usize)> = self
            .labels
            .iter()
            .map(|l| (l.clone(), self.samples_per_record))
            .collect();
        signals.extend(self.slow_signals.iter().cloned());
        if self.annotation_signal {
            signals.push(("EDF Annotations".to_string(), 6));
        }
        let ns = signals.len();

        let mut buf: Vec<u8> = Vec::new();
        field(&mut buf, "0", 8);
        field(&mut buf, "X X X X", 80);
        field(&mut buf, "Startdate X X X X", 80);
        field(&mut buf, "01.01.24", 8);
        field(&mut buf, "00.00.00", 8);
        field(&mut buf, &(256 + ns * 256).to_string(), 8);
        field(&mut buf, "", 44);
        let records = if self.unknown_record_count {
            "-1".to_string()
        } else {
            self.num_records.to_string()
        };
        field(&mut buf, &records, 8);
        field(&mut buf, &self.record_duration.to_string(), 8);
        field(&mut buf, &ns.to_string(), 4);

        let spr: Vec<String> = signals.iter().map(|s| s.1.to_string()).collect();
        let columns: [(usize, Vec<&str>); 10] = [
            (16, signals.iter().map(|s| s.0.as_str()).collect()),
            (80, vec!["AgAgCl electrode"; ns]),
            (8, vec!["uV"; ns]),
            (8, vec!["-32768"; ns]),
            (8, vec!["32767"; ns]),
            (8, vec!["-32768"; ns]),
            (8, vec!["32767"; ns]),
            (80, vec![""; ns]),
            (8, spr.iter().map(|s| s.as_str()).collect()),
            (32, vec![""; ns]),
        ];
        for (width, values) in &columns {
            for value in values {
                field(&mut buf, value, *width);
            }
        }

        assert_eq!(buf.len(), 256 + ns * 256);

        for record in 0..self.num_records {
            for (channel, (_, spr)) in signals.iter().enumerate() {
                for s in 0..*spr {
                    let v = if channel < self.labels.len() {
                        value(channel, record * spr + s)
                    } else {
                        0
                    };
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
        }

        fs::write(path, buf).unwrap();
    }
}

fn field(buf: &mut Vec<u8>, value: &str, width: usize) {
    let mut bytes: Vec<u8> = value.bytes().take(width).collect();
    bytes.resize(width, b' ');
    buf.extend_from_slice(&bytes);
}

/// Sample value encoding channel and index: `channel * 1000 + index % 1000`
pub fn ramp(channel: usize, sample: usize) -> i16 {
    (channel * 1000 + sample % 1000) as i16
}

pub const DOUBLE_BANANA_LEFT: &str = "FP1-F7: [FP1, F7]\nF7-T3: [F7, T3]\nT3-T5: [T3, T5]\n";
