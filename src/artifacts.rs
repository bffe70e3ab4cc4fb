//! Model artifacts on disk.
//!
//! Unlearned models are written as
//! `unlearn_<model>_<dataset>_<epochs>epochs_<lr>lr.json`; other components
//! find them by listing the artifact directory. One directory serves both
//! listing and download.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, UnlearnError};
use crate::network::Network;

pub const MODEL_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of an unlearned model. `learning_rate` is printed in its
    /// shortest round-trip form (`0.01`, `0.0002`).
    pub fn unlearned_filename(model_name: &str, dataset_name: &str, epochs: usize, learning_rate: f64) -> String {
        format!(
            "unlearn_{}_{}_{}epochs_{}lr.{}",
            model_name, dataset_name, epochs, learning_rate, MODEL_EXTENSION
        )
    }

    /// Writes `network` under `filename`, creating the directory if needed.
    pub fn save(&self, network: &Network, filename: &str) -> Result<PathBuf> {
        check_file_name(filename)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| UnlearnError::io(&self.dir, e))?;
        let path = self.dir.join(filename);
        network.save_json(&path)?;
        info!(path = %path.display(), "saved unlearned model");
        Ok(path)
    }

    /// Sorted names of every model artifact in the directory.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UnlearnError::NotFound(format!("model directory {}", self.dir.display())));
            }
            Err(e) => return Err(UnlearnError::io(&self.dir, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| UnlearnError::io(&self.dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == MODEL_EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_owned());
                }
            }
        }
        if names.is_empty() {
            return Err(UnlearnError::NotFound(format!("model files in {}", self.dir.display())));
        }
        names.sort();
        Ok(names)
    }

    /// Path of an existing artifact, for download by exact file name.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        check_file_name(filename)?;
        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(UnlearnError::NotFound(format!("model file {}", filename)));
        }
        Ok(path)
    }

    pub fn load(&self, filename: &str) -> Result<Network> {
        Network::load_json(&self.resolve(filename)?)
    }
}

/// Rejects empty names and anything that could escape the directory.
pub(crate) fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(UnlearnError::InvalidRequest(format!("invalid file name '{}'", name)));
    }
    Ok(())
}
