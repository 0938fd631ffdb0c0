//! Montage definitions and the catalog they are loaded into.
//!
//! One YAML file per montage. The file stem names the montage
//! (`bipolar_double_banana.yaml` → `BIPOLAR DOUBLE BANANA`). Bipolar files map
//! each output channel to an `[anode, cathode]` pair:
//!
//! ```yaml
//! FP1-F7: [FP1, F7]
//! F7-T3: [F7, T3]
//! ```
//!
//! Any other montage is an identity transform and its file content is ignored.

use crate::error::{EegError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const AVERAGE_MONTAGE: &str = "AVERAGE";
pub const BIPOLAR_PREFIX: &str = "BIPOLAR";

/// One derived channel: `output = anode - cathode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BipolarPair {
    pub output: String,
    pub anode: String,
    pub cathode: String,
}

impl BipolarPair {
    pub fn new(output: &str, anode: &str, cathode: &str) -> Self {
        Self {
            output: output.to_string(),
            anode: anode.to_string(),
            cathode: cathode.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MontageKind {
    /// Channels pass through unchanged
    Identity,
    /// Pairs in declaration order
    Bipolar { pairs: Vec<BipolarPair> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MontageDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: MontageKind,
}

impl MontageDefinition {
    pub fn identity(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MontageKind::Identity,
        }
    }

    pub fn bipolar(name: &str, pairs: Vec<BipolarPair>) -> Self {
        Self {
            name: name.to_string(),
            kind: MontageKind::Bipolar { pairs },
        }
    }

    pub fn is_bipolar(&self) -> bool {
        matches!(self.kind, MontageKind::Bipolar { .. })
    }

    pub fn pairs(&self) -> &[BipolarPair] {
        match &self.kind {
            MontageKind::Identity => &[],
            MontageKind::Bipolar { pairs } => pairs,
        }
    }

    /// Channel names this montage produces from a recording with `raw_channels`
    pub fn output_channels(&self, raw_channels: &[String]) -> Vec<String> {
        match &self.kind {
            MontageKind::Identity => raw_channels.to_vec(),
            MontageKind::Bipolar { pairs } => pairs.iter().map(|p| p.output.clone()).collect(),
        }
    }
}

/// Display name for a montage file stem: underscores become spaces, uppercased
pub fn montage_name_from_stem(stem: &str) -> String {
    stem.replace('_', " ").to_uppercase()
}

/// Named montages, loaded once and shared read-only
#[derive(Debug, Clone)]
pub struct MontageCatalog {
    montages: HashMap<String, MontageDefinition>,
    source_dir: Option<PathBuf>,
}

impl MontageCatalog {
    /// Load every `*.yaml` / `*.yml` file in `config_dir`
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let dir = config_dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            EegError::Config(format!(
                "Cannot read montage directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| EegError::Config(format!("Cannot list '{}': {}", dir.display(), e)))?
                .path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
                .unwrap_or(false);
            if is_yaml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut montages: HashMap<String, MontageDefinition> = HashMap::new();
        let mut origins: HashMap<String, PathBuf> = HashMap::new();

        for path in files {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    EegError::Config(format!("Invalid montage file name: {}", path.display()))
                })?;
            let name = montage_name_from_stem(stem);

            if let Some(previous) = origins.get(&name) {
                return Err(EegError::Config(format!(
                    "Montage name '{}' is defined by both '{}' and '{}'",
                    name,
                    previous.display(),
                    path.display()
                )));
            }

            let content = std::fs::read_to_string(&path).map_err(|e| {
                EegError::Config(format!("Cannot read '{}': {}", path.display(), e))
            })?;
            let definition = parse_montage(&name, &content).map_err(|e| match e {
                EegError::Config(msg) => {
                    EegError::Config(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;

            log::debug!(
                "Loaded montage '{}' ({} pairs) from {}",
                name,
                definition.pairs().len(),
                path.display()
            );
            origins.insert(name.clone(), path);
            montages.insert(name, definition);
        }

        montages
            .entry(AVERAGE_MONTAGE.to_string())
            .or_insert_with(|| MontageDefinition::identity(AVERAGE_MONTAGE));

        log::info!(
            "Montage catalog loaded from {} ({} montages)",
            dir.display(),
            montages.len()
        );

        Ok(Self {
            montages,
            source_dir: Some(dir.to_path_buf()),
        })
    }

    /// Build a catalog from definitions already in memory
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = MontageDefinition>,
    {
        let mut montages = HashMap::new();
        for definition in definitions {
            if montages.contains_key(&definition.name) {
                return Err(EegError::Config(format!(
                    "Montage name '{}' is defined more than once",
                    definition.name
                )));
            }
            montages.insert(definition.name.clone(), definition);
        }
        montages
            .entry(AVERAGE_MONTAGE.to_string())
            .or_insert_with(|| MontageDefinition::identity(AVERAGE_MONTAGE));

        Ok(Self {
            montages,
            source_dir: None,
        })
    }

    pub fn get(&self, name: &str) -> Result<&MontageDefinition> {
        self.montages
            .get(name)
            .ok_or_else(|| EegError::NotFound(format!("Non-existent montage type: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.montages.contains_key(name)
    }

    /// Montage names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.montages.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.montages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.montages.is_empty()
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }
}

impl Default for MontageCatalog {
    fn default() -> Self {
        let mut montages = HashMap::new();
        montages.insert(
            AVERAGE_MONTAGE.to_string(),
            MontageDefinition::identity(AVERAGE_MONTAGE),
        );
        Self {
            montages,
            source_dir: None,
        }
    }
}

/// Parse one montage file body for the montage called `name`
pub fn parse_montage(name: &str, content: &str) -> Result<MontageDefinition> {
    if !name.starts_with(BIPOLAR_PREFIX) {
        if !content.trim().is_empty() {
            log::debug!("Ignoring mapping content of non-bipolar montage '{}'", name);
        }
        return Ok(MontageDefinition::identity(name));
    }

    let value: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| EegError::Config(format!("Malformed YAML: {}", e)))?;

    let mapping = match value {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        _ => {
            return Err(EegError::Config(format!(
                "Bipolar montage '{}' must be a mapping of output channel to [anode, cathode]",
                name
            )))
        }
    };

    if mapping.is_empty() {
        return Err(EegError::Config(format!(
            "Bipolar montage '{}' declares no channel pairs",
            name
        )));
    }

    let mut pairs = Vec::with_capacity(mapping.len());
    for (key, value) in &mapping {
        let output = yaml_scalar(key).ok_or_else(|| {
            EegError::Config(format!("Montage '{}' has a non-string channel name", name))
        })?;

        let electrodes: Vec<String> = match value {
            serde_yaml::Value::Sequence(seq) => seq.iter().filter_map(yaml_scalar).collect(),
            _ => Vec::new(),
        };
        let seq_len = match value {
            serde_yaml::Value::Sequence(seq) => seq.len(),
            _ => 0,
        };
        if electrodes.len() != 2 || seq_len != 2 {
            return Err(EegError::Config(format!(
                "Channel '{}' in montage '{}' must map to exactly two electrode names",
                output, name
            )));
        }

        if pairs.iter().any(|p: &BipolarPair| p.output == output) {
            return Err(EegError::Config(format!(
                "Channel '{}' is declared twice in montage '{}'",
                output, name
            )));
        }

        pairs.push(BipolarPair {
            output,
            anode: electrodes[0].clone(),
            cathode: electrodes[1].clone(),
        });
    }

    Ok(MontageDefinition::bipolar(name, pairs))
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DOUBLE_BANANA: &str = "FP1-F7: [FP1, F7]\nF7-T3: [F7, T3]\nT3-T5: [T3, T5]\n";

    #[test]
    fn test_montage_name_from_stem() {
        assert_eq!(
            montage_name_from_stem("bipolar_double_banana"),
            "BIPOLAR DOUBLE BANANA"
        );
        assert_eq!(montage_name_from_stem("average"), "AVERAGE");
    }

    #[test]
    fn test_parse_bipolar_keeps_declaration_order() {
        let montage = parse_montage("BIPOLAR DOUBLE BANANA", DOUBLE_BANANA).unwrap();
        assert!(montage.is_bipolar());

        let outputs: Vec<&str> = montage.pairs().iter().map(|p| p.output.as_str()).collect();
        assert_eq!(outputs, vec!["FP1-F7", "F7-T3", "T3-T5"]);
        assert_eq!(montage.pairs()[1], BipolarPair::new("F7-T3", "F7", "T3"));
    }

    #[test]
    fn test_parse_non_bipolar_is_identity() {
        let montage = parse_montage("AVERAGE", "anything: [a, b]").unwrap();
        assert_eq!(montage.kind, MontageKind::Identity);
    }

    #[test]
    fn test_parse_rejects_bad_pairs() {
        let three = parse_montage("BIPOLAR X", "A-B: [A, B, C]");
        assert!(matches!(three, Err(EegError::Config(_))));

        let scalar = parse_montage("BIPOLAR X", "A-B: A");
        assert!(matches!(scalar, Err(EegError::Config(_))));

        let empty = parse_montage("BIPOLAR X", "");
        assert!(matches!(empty, Err(EegError::Config(_))));

        let list = parse_montage("BIPOLAR X", "- [A, B]");
        assert!(matches!(list, Err(EegError::Config(_))));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bipolar_double_banana.yaml"), DOUBLE_BANANA).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a montage").unwrap();

        let catalog = MontageCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.names(), vec!["AVERAGE", "BIPOLAR DOUBLE BANANA"]);
        assert_eq!(catalog.get("BIPOLAR DOUBLE BANANA").unwrap().pairs().len(), 3);
        assert!(!catalog.get(AVERAGE_MONTAGE).unwrap().is_bipolar());
    }

    #[test]
    fn test_load_rejects_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bipolar_tcp.yaml"), "A-B: [A, B]").unwrap();
        fs::write(dir.path().join("BIPOLAR_TCP.yml"), "A-B: [A, B]").unwrap();

        let result = MontageCatalog::load(dir.path());
        assert!(matches!(result, Err(EegError::Config(_))));
    }

    #[test]
    fn test_load_missing_directory() {
        let result = MontageCatalog::load("/nonexistent/montages");
        assert!(matches!(result, Err(EegError::Config(_))));
    }

    #[test]
    fn test_get_unknown_montage() {
        let catalog = MontageCatalog::default();
        let err = catalog.get("BIPOLAR TRANSVERSE").unwrap_err();
        assert!(matches!(err, EegError::NotFound(_)));
    }

    #[test]
    fn test_from_definitions_rejects_duplicates() {
        let result = MontageCatalog::from_definitions(vec![
            MontageDefinition::identity("REFERENTIAL"),
            MontageDefinition::identity("REFERENTIAL"),
        ]);
        assert!(matches!(result, Err(EegError::Config(_))));
    }
}
