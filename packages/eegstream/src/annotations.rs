//! Annotation storage.
//!
//! On disk an annotation set is a CSV table with one row per
//! (channel, start, stop, label). In memory rows that share start, stop and
//! label are merged into one multi-channel [`Annotation`]. Each recording keeps
//! one file per montage, next to the recording:
//! `<recording stem>_<MONTAGE NAME with spaces as underscores>.csv`.

use crate::error::{EegError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    #[serde(rename = "channels")]
    pub channel: String,
    pub start_time: f64,
    pub stop_time: f64,
    pub onset: String,
}

impl AnnotationRow {
    pub fn new(channel: &str, start_time: f64, stop_time: f64, onset: &str) -> Self {
        Self {
            channel: channel.to_string(),
            start_time,
            stop_time,
            onset: onset.to_string(),
        }
    }
}

/// A labelled time span over one or more channels.
///
/// `start_time <= stop_time` is not required and duplicate channels are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub channels: Vec<String>,
    pub start_time: f64,
    pub stop_time: f64,
    pub onset: String,
}

impl Annotation {
    pub fn new<S: Into<String>>(
        channels: Vec<S>,
        start_time: f64,
        stop_time: f64,
        onset: &str,
    ) -> Self {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            start_time,
            stop_time,
            onset: onset.to_string(),
        }
    }

    /// True when the span intersects `[t0, t1]`, whichever way round its ends are
    pub fn overlaps(&self, t0: f64, t1: f64) -> bool {
        let lo = self.start_time.min(self.stop_time);
        let hi = self.start_time.max(self.stop_time);
        lo <= t1 && hi >= t0
    }

    fn same_event(&self, row: &AnnotationRow) -> bool {
        self.start_time == row.start_time
            && self.stop_time == row.stop_time
            && self.onset == row.onset
    }
}

fn row_order(a: &AnnotationRow, b: &AnnotationRow) -> Ordering {
    a.start_time
        .total_cmp(&b.start_time)
        .then_with(|| a.stop_time.total_cmp(&b.stop_time))
        .then_with(|| a.onset.cmp(&b.onset))
}

/// Sort rows by (start, stop, label) and merge runs with equal keys into one
/// annotation each. Channel order within a run follows the stable sort.
pub fn consolidate(mut rows: Vec<AnnotationRow>) -> Vec<Annotation> {
    rows.sort_by(row_order);

    let mut merged: Vec<Annotation> = Vec::new();
    for row in rows {
        if let Some(current) = merged.last_mut() {
            if current.same_event(&row) {
                current.channels.push(row.channel);
                continue;
            }
        }
        merged.push(Annotation {
            channels: vec![row.channel],
            start_time: row.start_time,
            stop_time: row.stop_time,
            onset: row.onset,
        });
    }
    merged
}

/// One row per channel, in annotation order then channel order
pub fn expand(annotations: &[Annotation]) -> Vec<AnnotationRow> {
    annotations
        .iter()
        .flat_map(|a| {
            a.channels.iter().map(move |channel| AnnotationRow {
                channel: channel.clone(),
                start_time: a.start_time,
                stop_time: a.stop_time,
                onset: a.onset.clone(),
            })
        })
        .collect()
}

/// Annotation file for `recording` under `montage`
pub fn annotation_path(recording: &Path, montage: &str) -> PathBuf {
    let stem = recording
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}_{}.csv", stem, montage.replace(' ', "_"));
    match recording.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn csv_error(path: &Path, err: csv::Error) -> EegError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return EegError::Io(io);
        }
        return EegError::Format(format!("{}: unreadable annotation file", path.display()));
    }
    EegError::Format(format!("{}: {}", path.display(), err))
}

/// Read and consolidate an annotation file
pub fn read_annotation_file(path: &Path) -> Result<Vec<Annotation>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let rows = reader
        .deserialize::<AnnotationRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| csv_error(path, e))?;
    Ok(consolidate(rows))
}

/// Expand and write an annotation file, replacing any existing one
pub fn write_annotation_file(path: &Path, annotations: &[Annotation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for row in expand(annotations) {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Annotations of one recording under one montage
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    recording: PathBuf,
    montage: String,
    path: PathBuf,
    annotations: Vec<Annotation>,
    dirty: bool,
}

impl AnnotationStore {
    /// Load the montage's annotation file for `recording`, or start empty when
    /// there is none
    pub fn open<P: AsRef<Path>>(recording: P, montage: &str) -> Result<Self> {
        let recording = recording.as_ref().to_path_buf();
        let path = annotation_path(&recording, montage);

        let annotations = if path.exists() {
            let annotations = read_annotation_file(&path)?;
            log::info!(
                "Loaded {} annotations from {}",
                annotations.len(),
                path.display()
            );
            annotations
        } else {
            log::info!("No existing annotations at {}", path.display());
            Vec::new()
        };

        Ok(Self {
            recording,
            montage: montage.to_string(),
            path,
            annotations,
            dirty: false,
        })
    }

    /// Write the set to disk. An empty set is not written and yields `None`.
    pub fn save(&mut self) -> Result<Option<PathBuf>> {
        if self.annotations.is_empty() {
            log::info!("No annotations to save for montage {}", self.montage);
            return Ok(None);
        }

        write_annotation_file(&self.path, &self.annotations)?;
        self.dirty = false;
        log::info!(
            "Saved {} annotations to {}",
            self.annotations.len(),
            self.path.display()
        );
        Ok(Some(self.path.clone()))
    }

    /// Append an annotation and return its index
    pub fn add(&mut self, annotation: Annotation) -> Result<usize> {
        validate(&annotation)?;
        self.annotations.push(annotation);
        self.dirty = true;
        Ok(self.annotations.len() - 1)
    }

    /// Replace the annotation at `index` (moved, resized or relabelled)
    pub fn update(&mut self, index: usize, annotation: Annotation) -> Result<()> {
        validate(&annotation)?;
        let slot = self
            .annotations
            .get_mut(index)
            .ok_or_else(|| EegError::NotFound(format!("Annotation #{}", index)))?;
        *slot = annotation;
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Annotation> {
        if index >= self.annotations.len() {
            return Err(EegError::NotFound(format!("Annotation #{}", index)));
        }
        self.dirty = true;
        Ok(self.annotations.remove(index))
    }

    /// Drop the most recently added annotation
    pub fn undo(&mut self) -> Option<Annotation> {
        let removed = self.annotations.pop();
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Annotations intersecting `[t0, t1]`, with their indices
    pub fn overlapping(&self, t0: f64, t1: f64) -> Vec<(usize, &Annotation)> {
        self.annotations
            .iter()
            .enumerate()
            .filter(|(_, a)| a.overlaps(t0, t1))
            .collect()
    }

    /// Replace the whole set with the annotations stored for `montage`.
    /// Unsaved edits are discarded.
    pub fn switch_montage(&mut self, montage: &str) -> Result<()> {
        if self.dirty {
            log::warn!(
                "Discarding unsaved annotations for montage {}",
                self.montage
            );
        }
        *self = Self::open(&self.recording, montage)?;
        Ok(())
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn montage(&self) -> &str {
        &self.montage
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn validate(annotation: &Annotation) -> Result<()> {
    if annotation.channels.is_empty() {
        return Err(EegError::InvalidAnnotation(
            "an annotation must cover at least one channel".to_string(),
        ));
    }
    if !annotation.start_time.is_finite() || !annotation.stop_time.is_finite() {
        return Err(EegError::InvalidAnnotation(format!(
            "non-finite time span {}..{}",
            annotation.start_time, annotation.stop_time
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidate_example() {
        let rows = vec![
            AnnotationRow::new("Fp1", 10.0, 12.0, "SPSW"),
            AnnotationRow::new("Fp2", 10.0, 12.0, "SPSW"),
            AnnotationRow::new("T3", 20.0, 22.0, "BCKG"),
        ];

        let merged = consolidate(rows);
        assert_eq!(
            merged,
            vec![
                Annotation::new(vec!["Fp1", "Fp2"], 10.0, 12.0, "SPSW"),
                Annotation::new(vec!["T3"], 20.0, 22.0, "BCKG"),
            ]
        );
    }

    #[test]
    fn test_consolidate_sorts_and_keeps_duplicates() {
        let rows = vec![
            AnnotationRow::new("C3", 5.0, 6.0, "EYEM"),
            AnnotationRow::new("O1", 1.0, 2.0, "ARTF"),
            AnnotationRow::new("C3", 5.0, 6.0, "EYEM"),
            AnnotationRow::new("O2", 1.0, 2.0, "ARTF"),
        ];

        let merged = consolidate(rows);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].channels, vec!["O1", "O2"]);
        assert_eq!(merged[1].channels, vec!["C3", "C3"]);
    }

    #[test]
    fn test_merge_only_adjacent_equal_keys() {
        let rows = vec![
            AnnotationRow::new("A", 1.0, 2.0, "X"),
            AnnotationRow::new("B", 1.0, 3.0, "X"),
            AnnotationRow::new("C", 1.0, 2.0, "Y"),
        ];

        let merged = consolidate(rows);
        let labels: Vec<(&str, f64)> = merged
            .iter()
            .map(|a| (a.onset.as_str(), a.stop_time))
            .collect();
        assert_eq!(labels, vec![("X", 2.0), ("Y", 2.0), ("X", 3.0)]);
    }

    #[test]
    fn test_expand_then_consolidate_round_trip() {
        let annotations = vec![
            Annotation::new(vec!["Fp1", "Fp2"], 10.0, 12.0, "SPSW"),
            Annotation::new(vec!["T3"], 20.0, 22.0, "BCKG"),
        ];
        let rows = expand(&annotations);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], AnnotationRow::new("Fp2", 10.0, 12.0, "SPSW"));
        assert_eq!(consolidate(rows), annotations);
    }

    #[test]
    fn test_stop_before_start_is_kept() {
        let merged = consolidate(vec![AnnotationRow::new("Cz", 9.0, 4.0, "SEIZ")]);
        assert_eq!(merged[0].start_time, 9.0);
        assert!(merged[0].overlaps(5.0, 6.0));
    }

    #[test]
    fn test_annotation_path() {
        let path = annotation_path(Path::new("/data/night1.edf"), "BIPOLAR DOUBLE BANANA");
        assert_eq!(
            path,
            PathBuf::from("/data/night1_BIPOLAR_DOUBLE_BANANA.csv")
        );
    }

    #[test]
    fn test_store_edit_operations() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("rec.edf");
        let mut store = AnnotationStore::open(&recording, "AVERAGE").unwrap();
        assert!(store.is_empty());
        assert!(!store.is_dirty());

        store
            .add(Annotation::new(vec!["C3"], 1.0, 2.0, "SPSW"))
            .unwrap();
        let idx = store
            .add(Annotation::new(vec!["C4"], 8.0, 9.0, "GPED"))
            .unwrap();
        assert_eq!(idx, 1);
        assert!(store.is_dirty());

        store
            .update(0, Annotation::new(vec!["C3", "P3"], 1.5, 2.5, "SPSW"))
            .unwrap();
        assert_eq!(store.annotations()[0].channels, vec!["C3", "P3"]);

        let visible: Vec<usize> = store.overlapping(0.0, 5.0).iter().map(|(i, _)| *i).collect();
        assert_eq!(visible, vec![0]);

        let undone = store.undo().unwrap();
        assert_eq!(undone.onset, "GPED");
        assert!(matches!(store.remove(4), Err(EegError::NotFound(_))));
        assert!(matches!(
            store.add(Annotation::new(Vec::<String>::new(), 0.0, 1.0, "X")),
            Err(EegError::InvalidAnnotation(_))
        ));
    }

    #[test]
    fn test_empty_store_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AnnotationStore::open(dir.path().join("rec.edf"), "AVERAGE").unwrap();

        assert_eq!(store.save().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_malformed_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("rec.edf");
        std::fs::write(
            annotation_path(&recording, "AVERAGE"),
            "channels,start_time,stop_time,onset\nFp1,soon,12.0,SPSW\n",
        )
        .unwrap();

        let result = AnnotationStore::open(&recording, "AVERAGE");
        assert!(matches!(result, Err(EegError::Format(_))));
    }
}
